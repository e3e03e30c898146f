//! AnomalyScope Similarity
//!
//! Textual similarity between model completions, and the statistics the
//! drift analyzer builds on top of it.
//!
//! # Core Concepts
//!
//! - [`SimilarityMetric`]: Pluggable pairwise score in `[0, 1]`
//! - [`SequenceRatio`]: Matching-blocks ratio (the default metric)
//! - [`TermCosine`]: Cosine over term-frequency vectors
//! - [`SimilarityScorer`]: Pairwise score plus within/cross aggregation
//! - [`WithinStats`]: Mean/min cohesion of one provider's samples
//!
//! # Example
//!
//! ```rust
//! use scope_similarity::{SimilarityScorer, SequenceRatio};
//!
//! let scorer = SimilarityScorer::new(SequenceRatio::default());
//! let samples = vec!["abcd".to_string(), "bcde".to_string()];
//!
//! let stats = scorer.aggregate(&samples);
//! assert!((stats.mean - 0.75).abs() < 1e-9);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod aggregate;
mod cosine;
mod metric;
mod sequence;

pub use aggregate::{CrossMode, SimilarityScorer, WithinStats};
pub use cosine::TermCosine;
pub use metric::{MetricKind, SimilarityMetric};
pub use sequence::SequenceRatio;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
