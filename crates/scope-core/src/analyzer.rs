//! Drift analyzer
//!
//! Turns per-provider samples into within-provider cohesion, cross-provider
//! similarity and an anomaly decision.
//!
//! # Decision policy
//!
//! A result is anomalous when either axis fires:
//! - cross: `cross < threshold - cross_margin`
//! - within: any provider has `min < threshold * within_factor`
//!
//! Severity follows the cross value only: `high` below
//! `threshold - high_margin`, `medium` below `threshold - medium_margin`,
//! otherwise `low`.

use crate::error::ConfigError;
use crate::types::{AnomalyKind, ProviderId, SampleSet, ScanConfig, Severity};
use indexmap::IndexMap;
use scope_similarity::{CrossMode, MetricKind, SimilarityScorer, WithinStats};
use serde::{Deserialize, Serialize};

/// Severity margins below the threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityPolicy {
    pub high_margin: f64,
    pub medium_margin: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            high_margin: 0.3,
            medium_margin: 0.1,
        }
    }
}

impl SeverityPolicy {
    /// Classify an anomalous cross value
    #[must_use]
    pub fn classify(&self, cross: f64, threshold: f64) -> Severity {
        if cross < threshold - self.high_margin {
            Severity::High
        } else if cross < threshold - self.medium_margin {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Tunable parts of the decision policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPolicy {
    /// Cross axis fires below `threshold - cross_margin`
    pub cross_margin: f64,
    /// Within axis fires below `threshold * within_factor`
    pub within_factor: f64,
    pub severity: SeverityPolicy,
    pub cross_mode: CrossMode,
}

impl Default for AnalysisPolicy {
    fn default() -> Self {
        Self {
            cross_margin: 0.0,
            within_factor: 0.5,
            severity: SeverityPolicy::default(),
            cross_mode: CrossMode::PairMean,
        }
    }
}

impl AnalysisPolicy {
    /// Check margins and factors are in range
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidSetting` naming the offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.cross_margin) {
            return Err(ConfigError::invalid("cross_margin", "must be within [0, 1]"));
        }
        if !unit.contains(&self.within_factor) {
            return Err(ConfigError::invalid("within_factor", "must be within [0, 1]"));
        }
        if !unit.contains(&self.severity.high_margin) || !unit.contains(&self.severity.medium_margin) {
            return Err(ConfigError::invalid("severity margins", "must be within [0, 1]"));
        }
        if self.severity.medium_margin > self.severity.high_margin {
            return Err(ConfigError::invalid(
                "medium_margin",
                "must not exceed high_margin",
            ));
        }
        Ok(())
    }
}

/// Outcome of analyzing one sample set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Cohesion per provider that produced samples
    pub within: IndexMap<ProviderId, WithinStats>,
    /// Cross-provider similarity (`1.0` with fewer than two providers)
    pub cross: f64,
    pub is_anomaly: bool,
    /// Set only when anomalous
    pub severity: Option<Severity>,
    /// Set only when anomalous
    pub kind: Option<AnomalyKind>,
    /// Configured providers with no samples
    pub coverage_gaps: Vec<ProviderId>,
    /// Providers whose within-min fell under the instability floor
    pub unstable: Vec<ProviderId>,
    /// Whether the cross axis fired
    pub cross_divergent: bool,
}

impl AnalysisResult {
    /// Providers that took part in the analysis
    pub fn analyzed_providers(&self) -> impl Iterator<Item = &ProviderId> {
        self.within.keys()
    }
}

/// Drift analyzer
#[derive(Debug, Clone, Default)]
pub struct DriftAnalyzer {
    scorer: SimilarityScorer,
    policy: AnalysisPolicy,
}

impl DriftAnalyzer {
    /// Create analyzer with a scorer and policy
    #[inline]
    #[must_use]
    pub fn new(scorer: SimilarityScorer, policy: AnalysisPolicy) -> Self {
        Self { scorer, policy }
    }

    /// Create analyzer over a built-in metric
    #[inline]
    #[must_use]
    pub fn with_metric(metric: MetricKind, policy: AnalysisPolicy) -> Self {
        Self::new(SimilarityScorer::from_shared(metric.build()), policy)
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> &AnalysisPolicy {
        &self.policy
    }

    #[inline]
    #[must_use]
    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Analyze the samples of every configured provider
    ///
    /// Providers missing from `samples` or with zero samples are excluded
    /// from both axes and listed in `coverage_gaps`.
    #[must_use]
    pub fn analyze(&self, samples: &SampleSet, config: &ScanConfig) -> AnalysisResult {
        let threshold = config.threshold();

        let mut within = IndexMap::new();
        let mut groups: Vec<&[String]> = Vec::new();
        let mut coverage_gaps = Vec::new();

        for provider in config.providers() {
            match samples.get(provider.as_str()) {
                Some(group) if !group.is_empty() => {
                    let stats = self.scorer.aggregate(group);
                    tracing::debug!(
                        provider = %provider,
                        mean = stats.mean,
                        min = stats.min,
                        "within-provider cohesion"
                    );
                    within.insert(provider.clone(), stats);
                    groups.push(group);
                }
                _ => {
                    tracing::warn!(provider = %provider, "coverage gap: no samples to analyze");
                    coverage_gaps.push(provider.clone());
                }
            }
        }

        let cross = if groups.len() < 2 {
            1.0
        } else {
            self.scorer.cross(&groups, self.policy.cross_mode)
        };
        tracing::debug!(cross, providers = groups.len(), "cross-provider similarity");

        let cross_divergent = groups.len() >= 2 && cross < threshold - self.policy.cross_margin;

        let floor = threshold * self.policy.within_factor;
        let unstable: Vec<ProviderId> = within
            .iter()
            .filter(|(_, stats)| stats.min < floor)
            .map(|(p, _)| p.clone())
            .collect();

        let is_anomaly = cross_divergent || !unstable.is_empty();
        let severity = is_anomaly.then(|| self.policy.severity.classify(cross, threshold));
        let kind = is_anomaly.then_some(if cross_divergent {
            AnomalyKind::Divergence
        } else {
            AnomalyKind::Instability
        });

        AnalysisResult {
            within,
            cross,
            is_anomaly,
            severity,
            kind,
            coverage_gaps,
            unstable,
            cross_divergent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scope_similarity::SimilarityMetric;

    /// Scores by looking up fixed values; identical strings score 1.0
    struct TableMetric(Vec<((&'static str, &'static str), f64)>);

    impl SimilarityMetric for TableMetric {
        fn score(&self, a: &str, b: &str) -> f64 {
            if a == b {
                return 1.0;
            }
            self.0
                .iter()
                .find(|((x, y), _)| (*x == a && *y == b) || (*x == b && *y == a))
                .map_or(0.0, |(_, s)| *s)
        }

        fn name(&self) -> &'static str {
            "table"
        }
    }

    fn id(s: &str) -> ProviderId {
        ProviderId::new(s).unwrap()
    }

    fn config(providers: &[&str], threshold: f64) -> ScanConfig {
        ScanConfig::new("X", providers.iter().map(|p| id(p)), 2, 0.9, threshold).unwrap()
    }

    fn samples(entries: &[(&str, &[&str])]) -> SampleSet {
        entries
            .iter()
            .map(|(p, s)| (id(p), s.iter().map(|x| (*x).to_string()).collect()))
            .collect()
    }

    /// Two cohesive providers whose cross pairs all score `cross`
    fn analyzer_with_cross(cross: f64) -> DriftAnalyzer {
        let metric = TableMetric(vec![
            (("a1", "a2"), 0.9),
            (("b1", "b2"), 0.9),
            (("a1", "b1"), cross),
            (("a1", "b2"), cross),
            (("a2", "b1"), cross),
            (("a2", "b2"), cross),
        ]);
        DriftAnalyzer::new(SimilarityScorer::new(metric), AnalysisPolicy::default())
    }

    fn two_providers() -> SampleSet {
        samples(&[("openai", &["a1", "a2"]), ("anthropic", &["b1", "b2"])])
    }

    #[test]
    fn severity_bands() {
        let cfg = config(&["openai", "anthropic"], 0.85);
        let cases = [
            (0.513, Some(Severity::High)),
            (0.54, Some(Severity::High)),
            (0.70, Some(Severity::Medium)),
            (0.80, Some(Severity::Low)),
            (0.90, None),
        ];
        for (cross, expected) in cases {
            let result = analyzer_with_cross(cross).analyze(&two_providers(), &cfg);
            assert!((result.cross - cross).abs() < 1e-9);
            assert_eq!(result.severity, expected, "cross = {cross}");
            assert_eq!(result.is_anomaly, expected.is_some());
        }
    }

    #[test]
    fn divergence_kind_when_cross_fires() {
        let cfg = config(&["openai", "anthropic"], 0.85);
        let result = analyzer_with_cross(0.5).analyze(&two_providers(), &cfg);
        assert_eq!(result.kind, Some(AnomalyKind::Divergence));
        assert!(result.cross_divergent);
        assert!(result.unstable.is_empty());
    }

    #[test]
    fn within_instability_alone_is_anomalous() {
        let metric = TableMetric(vec![
            (("a1", "a2"), 0.2),
            (("b1", "b2"), 0.95),
            (("a1", "b1"), 0.95),
            (("a1", "b2"), 0.95),
            (("a2", "b1"), 0.95),
            (("a2", "b2"), 0.95),
        ]);
        let analyzer = DriftAnalyzer::new(SimilarityScorer::new(metric), AnalysisPolicy::default());
        let cfg = config(&["openai", "anthropic"], 0.85);

        let result = analyzer.analyze(&two_providers(), &cfg);
        assert!(result.is_anomaly);
        assert!(!result.cross_divergent);
        assert_eq!(result.kind, Some(AnomalyKind::Instability));
        assert_eq!(result.severity, Some(Severity::Low));
        assert_eq!(result.unstable, vec![id("openai")]);
    }

    #[test]
    fn single_provider_never_fires_cross() {
        let cfg = config(&["openai"], 0.85);
        let set = samples(&[("openai", &["a1", "a2"])]);
        let result = analyzer_with_cross(0.0).analyze(&set, &cfg);
        assert_eq!(result.cross, 1.0);
        assert!(!result.cross_divergent);
        assert!(!result.is_anomaly);
    }

    #[test]
    fn empty_provider_is_coverage_gap() {
        let cfg = config(&["openai", "anthropic", "gemini"], 0.85);
        let set = samples(&[("openai", &["a1", "a2"]), ("anthropic", &[])]);
        let result = analyzer_with_cross(0.1).analyze(&set, &cfg);

        assert_eq!(result.coverage_gaps, vec![id("anthropic"), id("gemini")]);
        assert_eq!(result.within.len(), 1);
        // Only one provider left, so the cross axis is skipped
        assert_eq!(result.cross, 1.0);
        assert!(!result.is_anomaly);
    }

    #[test]
    fn cross_margin_shifts_trigger() {
        let policy = AnalysisPolicy {
            cross_margin: 0.1,
            ..AnalysisPolicy::default()
        };
        let metric = TableMetric(vec![
            (("a1", "a2"), 0.9),
            (("b1", "b2"), 0.9),
            (("a1", "b1"), 0.8),
            (("a1", "b2"), 0.8),
            (("a2", "b1"), 0.8),
            (("a2", "b2"), 0.8),
        ]);
        let analyzer = DriftAnalyzer::new(SimilarityScorer::new(metric), policy);
        let result = analyzer.analyze(&two_providers(), &config(&["openai", "anthropic"], 0.85));
        assert!(!result.is_anomaly);
    }

    #[test]
    fn policy_validation() {
        assert!(AnalysisPolicy::default().validate().is_ok());

        let bad = AnalysisPolicy {
            within_factor: 1.5,
            ..AnalysisPolicy::default()
        };
        assert!(bad.validate().is_err());

        let inverted = AnalysisPolicy {
            severity: SeverityPolicy {
                high_margin: 0.1,
                medium_margin: 0.3,
            },
            ..AnalysisPolicy::default()
        };
        assert!(inverted.validate().is_err());
    }
}
