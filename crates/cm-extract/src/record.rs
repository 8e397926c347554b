use serde::{Deserialize, Serialize};

use cm_core::SectionKind;

// ---------------------------------------------------------------------------
// ChangeKind
// ---------------------------------------------------------------------------

/// Row type of an extraction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Text,
    Insertion,
    Deletion,
    Comment,
    /// Parent row of a hierarchical group.
    Paragraph,
}

impl ChangeKind {
    /// Label used in tabular output.
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Text => "Texto",
            ChangeKind::Insertion => "Inserção",
            ChangeKind::Deletion => "Exclusão",
            ChangeKind::Comment => "Comentário",
            ChangeKind::Paragraph => "Parágrafo",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Record shapes
// ---------------------------------------------------------------------------

/// One buffer flush of the linear log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearRecord {
    pub file: String,
    pub paragraph_index: usize,
    pub section: SectionKind,
    pub original_text: String,
    pub final_text: String,
    /// Text flushed while at least one comment range was open.
    pub commented_text: String,
    /// Bodies of the open comments joined with `" | "`.
    pub comment: String,
    pub kind: ChangeKind,
    pub author: String,
    pub timestamp: String,
}

/// One non-empty paragraph with its intervention log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedRecord {
    pub file: String,
    pub paragraph_index: usize,
    pub section: SectionKind,
    pub original_text: String,
    pub final_text: String,
    /// One line per intervention: `[author [date]] VERB: 'text'`.
    pub intervention_log: String,
}

/// Paragraph row or one of its intervention rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchicalRecord {
    pub file: String,
    pub paragraph_index: usize,
    pub section: SectionKind,
    pub text: String,
    pub kind: ChangeKind,
    /// Char range in the reconstructed original text; `None` on the
    /// paragraph row.
    pub position: Option<(usize, usize)>,
    pub comment: String,
    pub author: String,
    pub timestamp: String,
}

impl HierarchicalRecord {
    /// `start-end`, or empty for the paragraph row.
    pub fn position_label(&self) -> String {
        self.position
            .map(|(start, end)| format!("{start}-{end}"))
            .unwrap_or_default()
    }
}

/// Any extraction record. Serialized without a tag; the report names the
/// strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeRecord {
    Linear(LinearRecord),
    Consolidated(ConsolidatedRecord),
    Hierarchical(HierarchicalRecord),
}

impl ChangeRecord {
    /// Row cells in the order of the strategy's columns.
    pub fn cells(&self) -> Vec<String> {
        match self {
            ChangeRecord::Linear(r) => vec![
                r.file.clone(),
                r.paragraph_index.to_string(),
                r.section.to_string(),
                r.original_text.clone(),
                r.final_text.clone(),
                r.commented_text.clone(),
                r.comment.clone(),
                r.kind.label().to_string(),
                r.author.clone(),
                r.timestamp.clone(),
            ],
            ChangeRecord::Consolidated(r) => vec![
                r.file.clone(),
                r.paragraph_index.to_string(),
                r.section.to_string(),
                r.original_text.clone(),
                r.final_text.clone(),
                r.intervention_log.clone(),
            ],
            ChangeRecord::Hierarchical(r) => vec![
                r.file.clone(),
                r.paragraph_index.to_string(),
                r.section.to_string(),
                r.text.clone(),
                r.kind.label().to_string(),
                r.position_label(),
                r.comment.clone(),
                r.author.clone(),
                r.timestamp.clone(),
            ],
        }
    }
}

pub const LINEAR_COLUMNS: [&str; 10] = [
    "file",
    "paragraph_index",
    "section",
    "original_text",
    "final_text",
    "commented_text",
    "comment",
    "kind",
    "author",
    "timestamp",
];

pub const CONSOLIDATED_COLUMNS: [&str; 6] = [
    "file",
    "paragraph_index",
    "section",
    "original_text",
    "final_text",
    "intervention_log",
];

pub const HIERARCHICAL_COLUMNS: [&str; 9] = [
    "file",
    "paragraph_index",
    "section",
    "text",
    "kind",
    "position",
    "comment",
    "author",
    "timestamp",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn child(kind: ChangeKind, position: Option<(usize, usize)>) -> HierarchicalRecord {
        HierarchicalRecord {
            file: "a.docx".into(),
            paragraph_index: 2,
            section: SectionKind::Body,
            text: "x".into(),
            kind,
            position,
            comment: String::new(),
            author: "Ana".into(),
            timestamp: String::new(),
        }
    }

    #[test]
    fn cells_follow_column_order() {
        let record = ChangeRecord::Hierarchical(child(ChangeKind::Insertion, Some((5, 5))));
        let cells = record.cells();
        assert_eq!(cells.len(), HIERARCHICAL_COLUMNS.len());
        assert_eq!(cells[1], "2");
        assert_eq!(cells[2], "body");
        assert_eq!(cells[4], "Inserção");
        assert_eq!(cells[5], "5-5");
    }

    #[test]
    fn paragraph_row_has_empty_position() {
        assert_eq!(child(ChangeKind::Paragraph, None).position_label(), "");
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_value(child(ChangeKind::Deletion, Some((0, 3)))).unwrap();
        assert_eq!(json["kind"], "deletion");
        assert_eq!(json["position"], serde_json::json!([0, 3]));
    }
}
