//! Error types for AnomalyScope Core
//!
//! Provides error handling for:
//! - Provider adapter failures (recovered as coverage gaps)
//! - Configuration errors (fatal before sampling)
//! - Record persistence failures (surfaced after detection)
//! - Scan cycle failures, tagged with the stage that failed

use crate::stage::{ScanStage, StageError};
use crate::types::CoverageGap;
use std::path::PathBuf;
use std::time::Duration;

/// Provider adapter errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Credentials rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// No credentials configured for the provider
    #[error("missing credentials: {0} is not set")]
    MissingCredentials(String),

    /// Provider throttled the request
    #[error("rate limited{}", retry_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// Request did not complete in time
    #[error("request timed out")]
    Timeout,

    /// Response could not be interpreted
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Non-success HTTP status
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Check if a retry may succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout | Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-suggested delay before retrying
    #[inline]
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

fn retry_suffix(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|d| format!(" (retry after {}s)", d.as_secs()))
        .unwrap_or_default()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Prompt missing or blank
    #[error("prompt is missing")]
    MissingPrompt,

    /// No providers selected
    #[error("provider list is empty")]
    NoProviders,

    /// Malformed provider identifier
    #[error("invalid provider identifier: '{0}'")]
    InvalidProvider(String),

    /// No adapter registered for the provider
    #[error("unsupported provider: {0}")]
    UnknownProvider(String),

    /// Run count below one
    #[error("runs must be at least 1 (got {0})")]
    InvalidRuns(usize),

    /// Temperature outside [0, 2]
    #[error("temperature must be within [0, 2] (got {0})")]
    InvalidTemperature(f64),

    /// Threshold outside [0, 1]
    #[error("threshold must be within [0, 1] (got {0})")]
    InvalidThreshold(f64),

    /// Any other out-of-range setting
    #[error("invalid setting {field}: {message}")]
    InvalidSetting { field: &'static str, message: String },

    /// IO error reading a configuration file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl ConfigError {
    /// Create error for an out-of-range setting
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field,
            message: message.into(),
        }
    }
}

/// Record persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error writing or reading a record
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded or decoded
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store-specific failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Scan cycle errors
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Configuration rejected before sampling
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Every provider was excluded; nothing to analyze
    #[error("no provider produced samples ({} gap(s))", .gaps.len())]
    NoCoverage { gaps: Vec<CoverageGap> },

    /// Anomaly detected but could not be persisted
    #[error("anomaly detected but not stored: {source}")]
    Storage {
        #[source]
        source: StorageError,
        /// The otherwise complete cycle
        report: Box<crate::scanner::ScanReport>,
    },

    /// Internal stage sequencing violation
    #[error("stage error: {0}")]
    Stage(#[from] StageError),
}

impl ScanError {
    /// Stage in which the cycle failed
    #[must_use]
    pub fn stage(&self) -> ScanStage {
        match self {
            Self::Config(_) => ScanStage::Idle,
            Self::NoCoverage { .. } => ScanStage::Sampling,
            Self::Storage { .. } => ScanStage::Recording,
            Self::Stage(e) => e.from_stage(),
        }
    }

    /// Providers skipped during the failed cycle
    #[must_use]
    pub fn coverage_gaps(&self) -> &[CoverageGap] {
        match self {
            Self::NoCoverage { gaps } => gaps,
            Self::Storage { report, .. } => &report.gaps,
            _ => &[],
        }
    }

    /// Check if the cycle failed on configuration
    #[inline]
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
