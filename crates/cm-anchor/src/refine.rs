//! Snippet refinement for blank-field findings.
//!
//! A finding about an unfilled placeholder often quotes a whole sentence as
//! its snippet while the comment names the placeholder itself
//! (`"campo 'XXXXX' não preenchido"`). Anchoring on the placeholder is more
//! precise, so it is preferred whenever it actually occurs in the clause.

use once_cell::sync::Lazy;
use regex::Regex;

use cm_core::normalize_text;

static QUOTED_FRAGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'([^']+)'").expect("valid quoted fragment regex"));

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(X{3,}|x{3,}|R\$x+[\d,\.]*|XX/XX/XXXX|INSERT [A-Z ]+|INDICAR [A-ZÀ-Ú ]+|\[[^\]]+\])")
        .expect("valid placeholder regex")
});

/// Pick the snippet to anchor for a placeholder finding.
///
/// Candidate: the first single-quoted fragment of `comment`, else the first
/// placeholder-looking token of `snippet`. The candidate wins when its
/// normalized form occurs in `clause_text`; otherwise the snippet is kept,
/// and the candidate only fills in for a missing one.
pub fn refine_placeholder_snippet(comment: &str, snippet: Option<&str>, clause_text: &str) -> Option<String> {
    let clause = normalize_text(clause_text);
    let current = snippet.unwrap_or("");

    let candidate = QUOTED_FRAGMENT
        .captures(comment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|c| !c.is_empty())
        .or_else(|| {
            PLACEHOLDER_PATTERN
                .find(current)
                .map(|m| m.as_str().trim().to_string())
                .filter(|c| !c.is_empty())
        });

    if let Some(candidate) = &candidate {
        let normalized = normalize_text(candidate);
        if !normalized.is_empty() && clause.contains(&normalized) {
            return Some(candidate.clone());
        }
    }

    if !current.is_empty() {
        return Some(current.to_string());
    }
    candidate
}
