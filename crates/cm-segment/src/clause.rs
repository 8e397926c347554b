use serde::{Deserialize, Serialize};

use cm_core::{clause_fingerprint, Document, ParagraphId};

/// How a clause came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    /// Content before the first heading.
    Preamble,
    /// A heading-delimited clause that was not subdivided.
    Clause,
    /// A piece of a subdivided clause.
    SubClause,
    /// Every body paragraph, when segmentation is skipped.
    WholeDocument,
}

/// A titled group of paragraphs. The heading paragraph that introduced the
/// title is never part of `paragraphs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub title: String,
    pub kind: ClauseKind,
    /// Title of the clause this piece was cut from, for sub-clauses.
    pub parent_title: Option<String>,
    pub paragraphs: Vec<ParagraphId>,
}

impl Clause {
    pub fn new(title: impl Into<String>, kind: ClauseKind) -> Self {
        Self {
            title: title.into(),
            kind,
            parent_title: None,
            paragraphs: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Paragraph analysis texts joined with `\n`; what a classifier reads.
    pub fn analysis_text(&self, doc: &Document) -> String {
        self.paragraphs
            .iter()
            .map(|id| doc.paragraph_analysis_text(*id))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// SHA-256 fingerprint of [`Clause::analysis_text`].
    pub fn fingerprint(&self, doc: &Document) -> String {
        clause_fingerprint(&self.analysis_text(doc))
    }

    /// Whether `title` names this clause or the clause it was cut from.
    pub fn answers_to(&self, title: &str) -> bool {
        self.title == title || self.parent_title.as_deref() == Some(title)
    }
}
