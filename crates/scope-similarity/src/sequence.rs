//! Matching-blocks sequence ratio
//!
//! Ratcliff/Obershelp style similarity: find the longest common block,
//! recurse on both sides of it, and score `2 * matched / (len_a + len_b)`.
//! Sequences are compared as Unicode scalar values.
//!
//! For long right-hand sequences (200 elements or more), elements that occur
//! in more than `len / 100 + 1` positions are not used as match anchors.
//! They can still be absorbed when a match is extended.

use crate::metric::SimilarityMetric;
use std::collections::HashMap;

/// Minimum right-hand length at which popular elements stop anchoring matches
const POPULAR_MIN_LEN: usize = 200;

/// Matching-blocks ratio metric
#[derive(Debug, Clone, Copy)]
pub struct SequenceRatio {
    /// Drop popular elements from the anchor index on long inputs
    pub autojunk: bool,
}

impl Default for SequenceRatio {
    fn default() -> Self {
        Self { autojunk: true }
    }
}

impl SequenceRatio {
    /// Metric with the popular-element heuristic disabled
    #[inline]
    #[must_use]
    pub fn exact() -> Self {
        Self { autojunk: false }
    }

    /// Directional ratio with `a` on the left and `b` indexed
    ///
    /// Not guaranteed symmetric; [`SimilarityMetric::score`] orders the
    /// operands before calling this.
    #[must_use]
    pub fn ratio(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }

        let matched = Matcher::new(&a, &b, self.autojunk).matched_len();
        2.0 * matched as f64 / total as f64
    }
}

impl SimilarityMetric for SequenceRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        if a == b && !a.is_empty() {
            return 1.0;
        }
        if a <= b {
            self.ratio(a, b)
        } else {
            self.ratio(b, a)
        }
    }

    fn name(&self) -> &'static str {
        "sequence_ratio"
    }
}

struct Matcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each element of `b`
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(a: &'a [char], b: &'a [char], autojunk: bool) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }

        if autojunk && b.len() >= POPULAR_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` x `b[blo..bhi]`
    ///
    /// Ties resolve to the block starting earliest in `a`, then in `b`.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0usize);

        // j -> length of the match ending at (i - 1, j)
        let mut run_len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_run: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| run_len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_run.insert(j, k);
                    if k > best_len {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_len = k;
                    }
                }
            }
            run_len = next_run;
        }

        // Absorb equal neighbours that were excluded from the anchor index
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_len += 1;
        }
        while best_i + best_len < ahi
            && best_j + best_len < bhi
            && self.a[best_i + best_len] == self.b[best_j + best_len]
        {
            best_len += 1;
        }

        (best_i, best_j, best_len)
    }

    /// Total length of all matching blocks
    fn matched_len(&self) -> usize {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut matched = 0;

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        matched
    }
}
