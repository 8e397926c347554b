//! Paragraph role heuristics.
//!
//! Roles are decided in a fixed priority order; later rules would misfire on
//! text that also matches an earlier one, so the order is part of the
//! contract:
//!
//! 1. document title (skipped entirely)
//! 2. numbered sub-clause (`1.1 `, `15.11 `)
//! 3. clause heading: heading style, then all-caps line, then
//!    `CLÁUSULA`/`CAPÍTULO`/`Art.` markers or manual numbering, then a short
//!    bold-led line
//! 4. body text

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use cm_core::{Document, ParagraphId};

static SUBCLAUSE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+(\.\d+)+\s+").expect("valid sub-clause regex"));

static MANUAL_NUMBERING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+(\.\d+)+\s+").expect("valid numbering regex"));

static CLAUSE_TITLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:CLÁUSULA \w+|CAPÍTULO \w+|Art\.)").expect("valid clause title regex")
});

const DOCUMENT_TITLE_KEYWORDS: [&str; 3] = ["CONTRATO", "ACORDO", "TERMO"];

/// Structural role of a body paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphRole {
    DocumentTitle,
    SubClause,
    ClauseHeading,
    Body,
}

impl ParagraphRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParagraphRole::DocumentTitle => "document_title",
            ParagraphRole::SubClause => "sub_clause",
            ParagraphRole::ClauseHeading => "clause_heading",
            ParagraphRole::Body => "body",
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Classify paragraph `id` of `doc`.
pub fn classify(doc: &Document, id: ParagraphId) -> ParagraphRole {
    let visible = doc.paragraph_text(id);
    let text = visible.trim();
    let style = doc.paragraph_style(id);

    if is_document_title(text, style) {
        ParagraphRole::DocumentTitle
    } else if is_subclause(text) {
        ParagraphRole::SubClause
    } else if is_new_clause(text, style, doc.first_run_bold(id)) {
        ParagraphRole::ClauseHeading
    } else {
        ParagraphRole::Body
    }
}

/// Text starts with multi-level numbering followed by whitespace.
pub fn is_subclause(text: &str) -> bool {
    SUBCLAUSE_PATTERN.is_match(text.trim())
}

/// Leading numeral token of a numbered paragraph (`"1.2"` for `"1.2 O valor"`).
pub fn leading_token(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// At least one cased character and no lower-case one.
pub fn is_upper(text: &str) -> bool {
    let mut has_cased = false;
    for ch in text.chars() {
        if ch.is_lowercase() {
            return false;
        }
        if ch.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

/// Main document title (e.g. `"CONTRATO DE PRESTAÇÃO DE SERVIÇOS"`), or a
/// paragraph carrying a title style.
pub fn is_document_title(text: &str, style: Option<&str>) -> bool {
    let len = text.chars().count();
    if len > 10
        && len < 100
        && is_upper(text)
        && DOCUMENT_TITLE_KEYWORDS.iter().any(|kw| text.contains(kw))
        && word_count(text) <= 10
    {
        return true;
    }
    style
        .map(|name| {
            let name = name.to_lowercase();
            name.contains("title") || name.contains("título")
        })
        .unwrap_or(false)
}

/// Clause heading heuristics, evaluated in priority order.
pub fn is_new_clause(text: &str, style: Option<&str>, first_run_bold: bool) -> bool {
    if text.is_empty() {
        return false;
    }

    if let Some(name) = style {
        let name = name.to_lowercase();
        if name.starts_with("heading") || name.starts_with("título") {
            return true;
        }
    }

    let words = word_count(text);
    if is_upper(text)
        && text.chars().count() > 3
        && (1..=12).contains(&words)
        && !text.starts_with(|c| c == '.' || c == ',')
    {
        // Placeholder lines such as "XXXXXXXX" are not headings.
        return !is_repeated_symbol(text);
    }

    if CLAUSE_TITLE_PATTERN.is_match(text) || MANUAL_NUMBERING_PATTERN.is_match(text) {
        return true;
    }

    first_run_bold && text.chars().count() < 50 && words <= 5
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// ASCII alphanumeric skeleton of at least 3 chars made of one repeated char.
fn is_repeated_symbol(text: &str) -> bool {
    let skeleton: Vec<char> = text
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect();
    skeleton.len() >= 3 && skeleton.iter().all(|c| *c == skeleton[0])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
