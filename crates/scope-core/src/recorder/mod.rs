//! Anomaly recorder
//!
//! Builds an [`AnomalyRecord`] from an anomalous analysis and hands it to a
//! pluggable [`AnomalyStore`]. Records are keyed by timestamp and slug;
//! storing the same key twice overwrites.

mod card;
mod file;
mod memory;

pub use card::{describe, render_markdown, slug};
pub use file::{FileStore, LATEST_CARD};
pub use memory::MemoryStore;

use crate::analyzer::AnalysisResult;
use crate::error::StorageError;
use crate::types::{AnomalyKind, AnomalyMeta, AnomalyRecord, RecordKey, SampleSet, ScanConfig, Severity};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use std::path::PathBuf;
use std::sync::Arc;

/// Where a record ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub key: RecordKey,
    /// Files written (empty for non-file stores)
    pub artifacts: Vec<PathBuf>,
}

/// Durable destination for anomaly records
#[async_trait]
pub trait AnomalyStore: Send + Sync + 'static {
    /// Persist a record, replacing any record with the same key
    ///
    /// # Errors
    /// Returns `StorageError` if the write fails
    async fn put(&self, record: &AnomalyRecord) -> Result<StoredRecord, StorageError>;
}

/// A record together with its storage location
#[derive(Debug, Clone)]
pub struct RecordedAnomaly {
    pub record: AnomalyRecord,
    pub stored: StoredRecord,
}

/// Anomaly recorder
#[derive(Clone)]
pub struct AnomalyRecorder {
    store: Arc<dyn AnomalyStore>,
}

impl std::fmt::Debug for AnomalyRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnomalyRecorder").finish_non_exhaustive()
    }
}

impl AnomalyRecorder {
    /// Create recorder over a store
    #[inline]
    #[must_use]
    pub fn new(store: impl AnomalyStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Create recorder over a shared store
    #[inline]
    #[must_use]
    pub fn from_shared(store: Arc<dyn AnomalyStore>) -> Self {
        Self { store }
    }

    /// Build the record for an anomalous result, without persisting it
    ///
    /// Returns `None` when the result is not anomalous.
    #[must_use]
    pub fn build(
        config: &ScanConfig,
        samples: &SampleSet,
        result: &AnalysisResult,
        timestamp: DateTime<Utc>,
    ) -> Option<AnomalyRecord> {
        if !result.is_anomaly {
            return None;
        }

        let severity = result.severity.unwrap_or(Severity::Low);
        let kind = result.kind.unwrap_or(AnomalyKind::Divergence);

        Some(AnomalyRecord {
            id: slug(result),
            timestamp: timestamp.trunc_subsecs(0),
            severity,
            kind,
            description: describe(config, result),
            meta: AnomalyMeta {
                prompt: config.prompt().to_string(),
                threshold: config.threshold(),
                providers: config.providers().to_vec(),
                runs: config.runs(),
                temperature: config.temperature(),
                samples: samples.clone(),
                cross_similarity: result.cross,
                within: result.within.clone(),
            },
        })
    }

    /// Record an anomalous result stamped with the current time
    ///
    /// # Errors
    /// Returns `StorageError` if the store rejects the write
    pub async fn record(
        &self,
        config: &ScanConfig,
        samples: &SampleSet,
        result: &AnalysisResult,
    ) -> Result<Option<RecordedAnomaly>, StorageError> {
        self.record_at(config, samples, result, Utc::now()).await
    }

    /// Record an anomalous result with an explicit timestamp
    ///
    /// Re-recording with the same timestamp and providers overwrites.
    ///
    /// # Errors
    /// Returns `StorageError` if the store rejects the write
    pub async fn record_at(
        &self,
        config: &ScanConfig,
        samples: &SampleSet,
        result: &AnalysisResult,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<RecordedAnomaly>, StorageError> {
        let Some(record) = Self::build(config, samples, result, timestamp) else {
            return Ok(None);
        };

        let stored = self.store.put(&record).await?;
        tracing::info!(
            key = %stored.key,
            severity = %record.severity,
            kind = %record.kind,
            "anomaly recorded"
        );

        Ok(Some(RecordedAnomaly { record, stored }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::DriftAnalyzer;
    use crate::types::ProviderId;
    use chrono::TimeZone;

    fn id(s: &str) -> ProviderId {
        ProviderId::new(s).unwrap()
    }

    fn divergent_inputs() -> (ScanConfig, SampleSet, AnalysisResult) {
        let config = ScanConfig::new("X", vec![id("openai"), id("anthropic")], 2, 0.9, 0.85).unwrap();
        let samples: SampleSet = vec![
            (id("openai"), vec!["the sky is blue".to_string(), "the sky is blue!".to_string()]),
            (id("anthropic"), vec!["zzzz qqqq".to_string(), "zzzz qqqq.".to_string()]),
        ]
        .into_iter()
        .collect();
        let result = DriftAnalyzer::default().analyze(&samples, &config);
        (config, samples, result)
    }

    #[tokio::test]
    async fn records_only_anomalies() {
        let store = MemoryStore::new();
        let recorder = AnomalyRecorder::new(store.clone());

        let config = ScanConfig::new("X", vec![id("openai")], 2, 0.9, 0.85).unwrap();
        let samples: SampleSet = vec![(id("openai"), vec!["same".to_string(), "same".to_string()])]
            .into_iter()
            .collect();
        let calm = DriftAnalyzer::default().analyze(&samples, &config);
        assert!(!calm.is_anomaly);

        let out = recorder.record(&config, &samples, &calm).await.unwrap();
        assert!(out.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn same_timestamp_overwrites() {
        let store = MemoryStore::new();
        let recorder = AnomalyRecorder::new(store.clone());
        let (config, samples, result) = divergent_inputs();
        assert!(result.is_anomaly);

        let ts = Utc.with_ymd_and_hms(2025, 8, 10, 9, 0, 0).unwrap();
        let first = recorder.record_at(&config, &samples, &result, ts).await.unwrap().unwrap();
        let second = recorder.record_at(&config, &samples, &result, ts).await.unwrap().unwrap();

        assert_eq!(first.stored.key, second.stored.key);
        assert_eq!(store.len().await, 1);
        assert_eq!(first.record.id, "OPENAI-vs-ANTHROPIC-DIVERGENCE");
    }

    #[test]
    fn build_copies_config_into_meta() {
        let (config, samples, result) = divergent_inputs();
        let ts = Utc.with_ymd_and_hms(2025, 8, 10, 9, 0, 0).unwrap();
        let record = AnomalyRecorder::build(&config, &samples, &result, ts).unwrap();

        assert_eq!(record.meta.prompt, "X");
        assert_eq!(record.meta.runs, 2);
        assert_eq!(record.meta.providers, vec![id("openai"), id("anthropic")]);
        assert_eq!(record.meta.samples, samples);
        assert_eq!(record.meta.cross_similarity, result.cross);
        assert_eq!(record.timestamp_str(), "2025-08-10T09:00:00Z");
    }
}
