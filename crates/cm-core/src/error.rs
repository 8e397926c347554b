use thiserror::Error;

use crate::document::RunId;

/// Top-level error type for the cm-core crate and dependents.
#[derive(Debug, Error)]
pub enum CmError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("document has no paragraphs")]
    EmptyDocument,

    /// A structural edit on the run arena was rejected.
    #[error("cannot mutate run {run}: {reason}")]
    Mutation { run: RunId, reason: String },

    /// Anchoring a single finding failed; other findings are unaffected.
    #[error("failed to anchor comment for '{snippet}'")]
    AnnotationFailed {
        snippet: String,
        #[source]
        source: Box<CmError>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, CmError>;
