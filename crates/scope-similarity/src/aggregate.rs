//! Within-group and cross-group aggregation
//!
//! Provides the statistics the drift analyzer consumes:
//! - Cohesion of one provider's repeated samples ([`WithinStats`])
//! - Agreement between providers ([`SimilarityScorer::cross_aggregate`],
//!   [`SimilarityScorer::cross_best_match`])

use crate::metric::SimilarityMetric;
use crate::sequence::SequenceRatio;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Mean and minimum pairwise similarity within one sample group
///
/// Invariant: `0 <= min <= mean <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WithinStats {
    pub mean: f64,
    pub min: f64,
}

impl WithinStats {
    /// Stats of a group with no observable variance
    pub const COHESIVE: Self = Self { mean: 1.0, min: 1.0 };

    /// Build from pairwise scores; an empty slice is fully cohesive
    #[must_use]
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::COHESIVE;
        }
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        // Summation error must not push the mean under the minimum
        Self {
            mean: mean.clamp(min, 1.0),
            min,
        }
    }
}

/// How cross-provider similarity is reduced to one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossMode {
    /// Mean over every pair drawn from two different groups
    #[default]
    PairMean,
    /// Mean of each sample's best match in any other group
    BestMatch,
}

impl std::str::FromStr for CrossMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pair_mean" | "mean" => Ok(Self::PairMean),
            "best_match" | "best" => Ok(Self::BestMatch),
            other => Err(format!("unknown cross mode: {other}")),
        }
    }
}

/// Pairwise scorer with group aggregation
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    metric: Arc<dyn SimilarityMetric>,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(SequenceRatio::default())
    }
}

impl SimilarityScorer {
    /// Create scorer over a metric
    #[inline]
    #[must_use]
    pub fn new(metric: impl SimilarityMetric) -> Self {
        Self {
            metric: Arc::new(metric),
        }
    }

    /// Create scorer over a shared metric
    #[inline]
    #[must_use]
    pub fn from_shared(metric: Arc<dyn SimilarityMetric>) -> Self {
        Self { metric }
    }

    /// Name of the underlying metric
    #[inline]
    #[must_use]
    pub fn metric_name(&self) -> &'static str {
        self.metric.name()
    }

    /// Similarity of two texts, clamped to `[0, 1]`
    #[inline]
    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        self.metric.score(a, b).clamp(0.0, 1.0)
    }

    /// Mean/min over all unordered pairs of `samples`
    ///
    /// Fewer than two samples yields [`WithinStats::COHESIVE`].
    #[must_use]
    pub fn aggregate(&self, samples: &[String]) -> WithinStats {
        let mut scores = Vec::with_capacity(samples.len() * samples.len().saturating_sub(1) / 2);
        for (i, a) in samples.iter().enumerate() {
            for b in &samples[i + 1..] {
                scores.push(self.similarity(a, b));
            }
        }
        WithinStats::from_scores(&scores)
    }

    /// Mean similarity over all pairs taken from two different groups
    ///
    /// Same-group pairs are never scored. Fewer than two non-empty groups
    /// yields `1.0`.
    #[must_use]
    pub fn cross_aggregate(&self, groups: &[&[String]]) -> f64 {
        let groups = non_empty(groups);
        if groups.len() < 2 {
            return 1.0;
        }

        let mut total = 0.0;
        let mut count = 0usize;
        for (g, left) in groups.iter().enumerate() {
            for right in &groups[g + 1..] {
                for a in left.iter() {
                    for b in right.iter() {
                        total += self.similarity(a, b);
                        count += 1;
                    }
                }
            }
        }
        total / count as f64
    }

    /// Mean of every sample's best similarity against other groups
    ///
    /// With two groups this scores each side against the other and averages
    /// all `|a| + |b|` best matches. Fewer than two non-empty groups yields
    /// `1.0`.
    #[must_use]
    pub fn cross_best_match(&self, groups: &[&[String]]) -> f64 {
        let groups = non_empty(groups);
        if groups.len() < 2 {
            return 1.0;
        }

        let mut best_scores = Vec::new();
        for (g, own) in groups.iter().enumerate() {
            for sample in own.iter() {
                let best = groups
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != g)
                    .flat_map(|(_, others)| others.iter())
                    .map(|candidate| self.similarity(sample, candidate))
                    .fold(0.0, f64::max);
                best_scores.push(best);
            }
        }
        best_scores.iter().sum::<f64>() / best_scores.len() as f64
    }

    /// Cross-group similarity using the given reduction
    #[inline]
    #[must_use]
    pub fn cross(&self, groups: &[&[String]], mode: CrossMode) -> f64 {
        match mode {
            CrossMode::PairMean => self.cross_aggregate(groups),
            CrossMode::BestMatch => self.cross_best_match(groups),
        }
    }
}

fn non_empty<'a>(groups: &[&'a [String]]) -> Vec<&'a [String]> {
    groups.iter().copied().filter(|g| !g.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn aggregate_small_groups_are_cohesive() {
        let scorer = SimilarityScorer::default();
        assert_eq!(scorer.aggregate(&[]), WithinStats::COHESIVE);
        assert_eq!(scorer.aggregate(&strings(&["only one"])), WithinStats::COHESIVE);
    }

    #[test]
    fn aggregate_mean_and_min() {
        let scorer = SimilarityScorer::default();
        // abcd/bcde = 0.75, abcd/abcd = 1.0, bcde/abcd = 0.75
        let stats = scorer.aggregate(&strings(&["abcd", "bcde", "abcd"]));
        assert!(approx(stats.min, 0.75));
        assert!(approx(stats.mean, 2.5 / 3.0));
    }

    #[test]
    fn cross_aggregate_ignores_same_group_pairs() {
        let scorer = SimilarityScorer::default();
        let a = strings(&["abcd", "xyz"]);
        let b = strings(&["abcd"]);
        // abcd/abcd = 1.0, xyz/abcd = 0.0
        assert!(approx(scorer.cross_aggregate(&[&a, &b]), 0.5));
    }

    #[test]
    fn cross_with_single_group_is_one() {
        let scorer = SimilarityScorer::default();
        let a = strings(&["abcd", "wxyz"]);
        let empty: Vec<String> = Vec::new();
        assert!(approx(scorer.cross_aggregate(&[&a]), 1.0));
        assert!(approx(scorer.cross_aggregate(&[&a, &empty]), 1.0));
        assert!(approx(scorer.cross_best_match(&[&a, &empty]), 1.0));
    }

    #[test]
    fn best_match_scores_both_directions() {
        let scorer = SimilarityScorer::default();
        let a = strings(&["abcd", "xyz"]);
        let b = strings(&["abcd"]);
        // a-side: 1.0, 0.0; b-side: 1.0
        assert!(approx(scorer.cross_best_match(&[&a, &b]), 2.0 / 3.0));
        assert!(approx(scorer.cross(&[&a, &b], CrossMode::BestMatch), 2.0 / 3.0));
    }

    #[test]
    fn within_stats_from_scores() {
        let stats = WithinStats::from_scores(&[0.2, 0.6]);
        assert!(approx(stats.min, 0.2));
        assert!(approx(stats.mean, 0.4));
    }

    #[test]
    fn cross_mode_from_str() {
        assert_eq!("best-match".parse::<CrossMode>().unwrap(), CrossMode::BestMatch);
        assert_eq!("pair_mean".parse::<CrossMode>().unwrap(), CrossMode::PairMean);
        assert!("median".parse::<CrossMode>().is_err());
    }
}
