//! Similarity metric trait and the built-in metric selector

use crate::cosine::TermCosine;
use crate::sequence::SequenceRatio;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pairwise text similarity
///
/// Implementations must return a value in `[0, 1]`, be symmetric in their
/// arguments, and score any non-empty text as `1.0` against itself.
pub trait SimilarityMetric: Send + Sync + 'static {
    /// Score two texts
    fn score(&self, a: &str, b: &str) -> f64;

    /// Stable metric name (used in logs and configuration)
    fn name(&self) -> &'static str;
}

impl std::fmt::Debug for dyn SimilarityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityMetric")
            .field("name", &self.name())
            .finish()
    }
}

/// Built-in metrics, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Matching-blocks ratio over characters
    #[default]
    SequenceRatio,
    /// Cosine over lowercase term frequencies
    TermCosine,
}

impl MetricKind {
    /// Instantiate the metric
    #[must_use]
    pub fn build(self) -> Arc<dyn SimilarityMetric> {
        match self {
            Self::SequenceRatio => Arc::new(SequenceRatio::default()),
            Self::TermCosine => Arc::new(TermCosine),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "sequence_ratio" | "sequence" => Ok(Self::SequenceRatio),
            "term_cosine" | "cosine" => Ok(Self::TermCosine),
            other => Err(format!("unknown similarity metric: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn metric_kind_from_str() {
        assert_eq!(MetricKind::from_str("sequence-ratio").unwrap(), MetricKind::SequenceRatio);
        assert_eq!(MetricKind::from_str("COSINE").unwrap(), MetricKind::TermCosine);
        assert!(MetricKind::from_str("levenshtein").is_err());
    }

    #[test]
    fn metric_kind_builds_named_metric() {
        assert_eq!(MetricKind::SequenceRatio.build().name(), "sequence_ratio");
        assert_eq!(MetricKind::TermCosine.build().name(), "term_cosine");
    }
}
