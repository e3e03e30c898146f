//! Scan cycle orchestration
//!
//! One cycle walks `Idle -> Sampling -> Analyzing -> Recording -> Done`.
//! Sampling fans out to every configured provider and joins once; analysis
//! and recording run only over the joined sample set.

use crate::analyzer::{AnalysisResult, DriftAnalyzer};
use crate::error::ScanError;
use crate::provider::ProviderRegistry;
use crate::recorder::{AnomalyRecorder, MemoryStore, RecordedAnomaly};
use crate::sampler::{sample_all, SamplingPolicy};
use crate::stage::{ScanStage, StageTracker};
use crate::types::{CoverageGap, GapReason, SampleSet, ScanConfig};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Everything one scan cycle produced
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub config: ScanConfig,
    pub samples: SampleSet,
    pub analysis: AnalysisResult,
    /// Providers excluded from analysis, with the reason
    pub gaps: Vec<CoverageGap>,
    /// Set when an anomaly was detected and stored
    pub record: Option<RecordedAnomaly>,
    /// Stages visited, starting at `Idle`
    pub stages: Vec<ScanStage>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl ScanReport {
    #[inline]
    #[must_use]
    pub fn is_anomaly(&self) -> bool {
        self.analysis.is_anomaly
    }
}

/// Scan orchestrator
///
/// Owns the provider registry, analyzer, recorder and sampling limits.
/// Cheap to clone; cycles share nothing but the registry and the store.
#[derive(Debug, Clone)]
pub struct Scanner {
    registry: ProviderRegistry,
    analyzer: DriftAnalyzer,
    recorder: AnomalyRecorder,
    sampling: SamplingPolicy,
}

impl Scanner {
    /// Create a scanner with default analysis and an in-memory store
    #[must_use]
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            analyzer: DriftAnalyzer::default(),
            recorder: AnomalyRecorder::new(MemoryStore::new()),
            sampling: SamplingPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_analyzer(mut self, analyzer: DriftAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: AnomalyRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    #[must_use]
    pub fn with_sampling(mut self, sampling: SamplingPolicy) -> Self {
        self.sampling = sampling;
        self
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn analyzer(&self) -> &DriftAnalyzer {
        &self.analyzer
    }

    /// Run one scan cycle
    ///
    /// # Errors
    /// - `ScanError::Config` if a configured provider is not registered
    /// - `ScanError::NoCoverage` if no provider produced samples
    /// - `ScanError::Storage` if an anomaly could not be persisted; the
    ///   error carries the full report
    pub async fn scan(&self, config: &ScanConfig) -> Result<ScanReport, ScanError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut stages = StageTracker::new();

        let providers = self.registry.resolve(config.providers())?;

        tracing::info!(
            providers = providers.len(),
            runs = config.runs(),
            temperature = config.temperature(),
            threshold = config.threshold(),
            "scan started"
        );

        stages.advance(ScanStage::Sampling)?;
        let outcome = sample_all(providers, config, &self.sampling).await;

        if outcome.samples.is_empty() {
            stages.advance(ScanStage::Done)?;
            tracing::error!(gaps = outcome.gaps.len(), "no provider produced samples");
            return Err(ScanError::NoCoverage { gaps: outcome.gaps });
        }

        stages.advance(ScanStage::Analyzing)?;
        let analysis = self.analyzer.analyze(&outcome.samples, config);
        let gaps = merge_gaps(&analysis, outcome.gaps);

        let mut report = ScanReport {
            config: config.clone(),
            samples: outcome.samples,
            analysis,
            gaps,
            record: None,
            stages: Vec::new(),
            started_at,
            elapsed: Duration::ZERO,
        };

        if report.analysis.is_anomaly {
            stages.advance(ScanStage::Recording)?;
            let recorded = self
                .recorder
                .record_at(&report.config, &report.samples, &report.analysis, Utc::now())
                .await;

            match recorded {
                Ok(record) => report.record = record,
                Err(source) => {
                    stages.advance(ScanStage::Done)?;
                    report.stages = stages.into_history();
                    report.elapsed = clock.elapsed();
                    tracing::error!(error = %source, "anomaly detected but not stored");
                    return Err(ScanError::Storage {
                        source,
                        report: Box::new(report),
                    });
                }
            }
        }

        stages.advance(ScanStage::Done)?;
        report.stages = stages.into_history();
        report.elapsed = clock.elapsed();

        tracing::info!(
            cross = report.analysis.cross,
            anomaly = report.analysis.is_anomaly,
            gaps = report.gaps.len(),
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "scan finished"
        );

        Ok(report)
    }
}

/// Every provider the analyzer skipped, with the sampler's reason when known
fn merge_gaps(analysis: &AnalysisResult, sampled: Vec<CoverageGap>) -> Vec<CoverageGap> {
    analysis
        .coverage_gaps
        .iter()
        .map(|provider| {
            sampled
                .iter()
                .find(|gap| &gap.provider == provider)
                .cloned()
                .unwrap_or_else(|| CoverageGap::new(provider.clone(), GapReason::NoSamples))
        })
        .collect()
}
