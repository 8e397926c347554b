//! JSON codec for the in-memory [`Document`] model.
//!
//! The binary container format is decoded elsewhere; this codec round-trips
//! the decoded run tree. Decoding is strict about structure (dangling arena
//! ids are rejected) but lenient about the comment table: a malformed table
//! is treated as absent.

use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::document::{Block, Comment, Document, Inline, SectionKind};
use crate::error::{CmError, Result};

/// Decode a document from JSON bytes.
///
/// Fails on malformed JSON, on arena ids that point nowhere, and on a
/// document without any paragraph.
pub fn decode(bytes: &[u8]) -> Result<Document> {
    let doc: Document = serde_json::from_slice(bytes)?;
    validate(&doc)?;
    if doc.is_empty() {
        return Err(CmError::EmptyDocument);
    }
    Ok(doc)
}

/// Decode from a JSON string.
pub fn decode_str(json: &str) -> Result<Document> {
    decode(json.as_bytes())
}

/// Encode a document as JSON bytes.
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(doc)?)
}

/// Check that every paragraph and run reference resolves.
pub fn validate(doc: &Document) -> Result<()> {
    for kind in SectionKind::ORDERED {
        for block in doc.section(kind) {
            match block {
                Block::Paragraph(id) => {
                    if doc.paragraph(*id).is_none() {
                        return Err(CmError::InvalidInput(format!(
                            "{kind} references missing paragraph {id}"
                        )));
                    }
                }
                Block::Table(table) => {
                    for row in &table.rows {
                        if let Some(bad) = row.iter().find(|&&c| c >= table.cells.len()) {
                            return Err(CmError::InvalidInput(format!(
                                "table row references missing cell {bad}"
                            )));
                        }
                    }
                    for cell in &table.cells {
                        if let Some(id) = cell.paragraphs.iter().find(|id| doc.paragraph(**id).is_none()) {
                            return Err(CmError::InvalidInput(format!(
                                "table cell references missing paragraph {id}"
                            )));
                        }
                    }
                }
            }
        }
    }
    for (idx, paragraph) in doc.paragraphs.iter().enumerate() {
        for item in &paragraph.content {
            if let Inline::Run(run) = item {
                if doc.run(*run).is_none() {
                    return Err(CmError::InvalidInput(format!(
                        "paragraph p{idx} references missing run {run}"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Deserialize the comment table, degrading to an empty table when it does
/// not have the expected shape.
pub(crate) fn lenient_comments<'de, D>(deserializer: D) -> std::result::Result<Vec<Comment>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    match serde_json::from_value::<Vec<Comment>>(value) {
        Ok(comments) => Ok(comments),
        Err(e) => {
            warn!(error = %e, "malformed comment table, treating as absent");
            Ok(Vec::new())
        }
    }
}
