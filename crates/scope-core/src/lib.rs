//! AnomalyScope Core - cross-provider drift detection
//!
//! One scan cycle:
//! - Samples the same prompt from every configured provider, concurrently
//! - Scores within-provider cohesion and cross-provider similarity
//! - Decides whether the cycle is anomalous and how severe it is
//! - Records anomalies as immutable timestamped records
//!
//! Providers whose calls fail after retries, or that are still pending at
//! the cycle deadline, are reported as coverage gaps rather than failing
//! the cycle.
//!
//! # Example
//!
//! ```rust,ignore
//! use scope_core::prelude::*;
//!
//! # async fn example(registry: ProviderRegistry) -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ScopeSettings::load_or_default("anomalyscope.toml")?;
//! let scanner = Scanner::new(registry)
//!     .with_recorder(AnomalyRecorder::new(FileStore::new(&settings.output.dir)));
//!
//! let report = scanner.scan(&settings.scan_config()?).await?;
//! println!("cross = {:.3}, anomaly = {}", report.analysis.cross, report.is_anomaly());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod analyzer;
pub mod config;
pub mod error;
pub mod provider;
pub mod recorder;
pub mod sampler;
pub mod scanner;
pub mod stage;
pub mod types;

// Re-exports for convenience
pub use analyzer::{AnalysisPolicy, AnalysisResult, DriftAnalyzer, SeverityPolicy};
pub use config::{ScopeSettings, DEFAULT_CONFIG_FILE, DEFAULT_PROMPT};
pub use error::{ConfigError, ProviderError, ScanError, StorageError};
pub use provider::{Provider, ProviderRegistry};
pub use recorder::{
    AnomalyRecorder, AnomalyStore, FileStore, MemoryStore, RecordedAnomaly, StoredRecord,
};
pub use sampler::{sample_all, RetryPolicy, SamplingOutcome, SamplingPolicy, MAX_CYCLE_TIMEOUT};
pub use scanner::{ScanReport, Scanner};
pub use stage::{ScanStage, StageError, StageTracker};
pub use types::{
    parse_provider_list, AnomalyKind, AnomalyMeta, AnomalyRecord, CoverageGap, GapReason,
    ProviderId, RecordKey, SampleSet, ScanConfig, Severity,
};

pub use scope_similarity::{CrossMode, MetricKind, SimilarityScorer, WithinStats};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running scans
    pub use crate::{
        AnomalyRecorder, DriftAnalyzer, FileStore, Provider, ProviderId, ProviderRegistry,
        ScanConfig, ScanError, ScanReport, Scanner, ScopeSettings,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
