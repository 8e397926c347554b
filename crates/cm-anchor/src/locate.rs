//! Snippet search inside one indexed paragraph.
//!
//! An exact substring hit in the normalized text wins. Otherwise the longest
//! common substring between paragraph and query is accepted when it is both
//! long enough and covers enough of the query.

use serde::{Deserialize, Serialize};
use tracing::debug;

use cm_core::normalize_text;

use crate::index::ParagraphIndex;

/// Acceptance thresholds for approximate matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Minimum accepted match length in chars.
    pub min_match_floor: usize,
    /// The minimum length also grows to `query_len / min_match_divisor`.
    pub min_match_divisor: usize,
    /// Minimum fraction of the query the match must cover.
    pub min_coverage: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            min_match_floor: 3,
            min_match_divisor: 5,
            min_coverage: 0.6,
        }
    }
}

impl LocatorConfig {
    fn min_match_len(&self, query_len: usize) -> usize {
        let scaled = query_len.checked_div(self.min_match_divisor).unwrap_or(0);
        self.min_match_floor.max(scaled)
    }
}

/// Half-open range of normalized char offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRange {
    pub start: usize,
    pub end: usize,
    /// `false` when the range came from the approximate search.
    pub exact: bool,
}

impl MatchRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Longest common substring of `a` and `b` as `(a_start, b_start, len)`.
///
/// Among equally long blocks the one starting earliest in `a` wins, then the
/// one starting earliest in `b`.
pub fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    if a.is_empty() || b.is_empty() {
        return best;
    }
    // prev[j + 1]: length of the common suffix of a[..i] and b[..=j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let k = curr[j + 1];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}

/// Find `query` in `index`.
pub fn locate(index: &ParagraphIndex, query: &str, config: &LocatorConfig) -> Option<MatchRange> {
    let needle = normalize_text(query);
    if needle.is_empty() || index.is_empty() {
        return None;
    }
    let needle_len = needle.chars().count();
    let text_len = index.len();

    if let Some(byte_idx) = index.normalized_text.find(&needle) {
        let start = index.normalized_text[..byte_idx].chars().count();
        return Some(MatchRange {
            start,
            end: (start + needle_len).min(text_len),
            exact: true,
        });
    }

    let text: Vec<char> = index.normalized_text.chars().collect();
    let query: Vec<char> = needle.chars().collect();
    let (start, _, size) = longest_common_substring(&text, &query);

    let min_len = config.min_match_len(needle_len);
    let coverage = size as f64 / needle_len as f64;
    if size < min_len || coverage < config.min_coverage {
        debug!(
            paragraph = %index.paragraph,
            size,
            min_len,
            coverage,
            "approximate match rejected"
        );
        return None;
    }
    Some(MatchRange {
        start,
        end: (start + size).min(text_len),
        exact: false,
    })
}
