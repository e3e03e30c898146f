//! Term-frequency cosine similarity

use crate::metric::SimilarityMetric;
use std::collections::BTreeMap;

/// Cosine similarity over lowercase alphanumeric term counts
///
/// Word order is ignored, so reorderings of the same sentence score `1.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermCosine;

impl TermCosine {
    fn terms(text: &str) -> BTreeMap<String, f64> {
        let mut counts = BTreeMap::new();
        for term in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            *counts.entry(term.to_lowercase()).or_insert(0.0) += 1.0;
        }
        counts
    }

    fn cosine(a: &str, b: &str) -> f64 {
        let ta = Self::terms(a);
        let tb = Self::terms(b);
        if ta.is_empty() || tb.is_empty() {
            return 0.0;
        }

        let dot: f64 = ta
            .iter()
            .filter_map(|(term, x)| tb.get(term).map(|y| x * y))
            .sum();
        let norm_a = ta.values().map(|x| x * x).sum::<f64>().sqrt();
        let norm_b = tb.values().map(|y| y * y).sum::<f64>().sqrt();

        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }
}

impl SimilarityMetric for TermCosine {
    fn score(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        if a <= b {
            Self::cosine(a, b)
        } else {
            Self::cosine(b, a)
        }
    }

    fn name(&self) -> &'static str {
        "term_cosine"
    }
}
