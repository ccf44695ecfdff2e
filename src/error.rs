//! Error taxonomy for graph construction and retrieval.
//!
//! Input errors are caller-correctable and surface immediately. Not-found
//! conditions are reported separately from build failures so callers can
//! match on them. Degraded conditions (community or centrality fallback,
//! unreadable files, failed visualizations) never reach this type; they are
//! logged and the build continues with documented defaults.

use std::path::PathBuf;

/// Errors returned by the knowledge graph service and its store.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The request cannot be served as given (e.g. an empty document list).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A document points at a file the core cannot read as text.
    #[error("Unsupported file type {mime} for {}", path.display())]
    UnsupportedFileType { path: PathBuf, mime: String },

    /// No graph is stored under this id.
    #[error("Graph not found: {0}")]
    NotFound(String),

    /// The graph has no rendered visualization.
    #[error("Visualization not found for graph: {0}")]
    VisualizationNotFound(String),

    /// The entity tagger failed for one of the inputs.
    #[error("Entity tagging failed for {document_id}: {message}")]
    Tagging { document_id: String, message: String },

    /// The store could not write or read a graph record.
    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    /// A graph record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// Whether the caller can correct the request and retry.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::UnsupportedFileType { .. }
        )
    }

    /// Whether this is one of the two not-found conditions.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::VisualizationNotFound(_))
    }
}

/// Result alias used across the crate's public API.
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(GraphError::InvalidInput("empty".into()).is_input_error());
        assert!(
            GraphError::UnsupportedFileType {
                path: PathBuf::from("a.pdf"),
                mime: "application/pdf".into(),
            }
            .is_input_error()
        );
        assert!(GraphError::NotFound("x".into()).is_not_found());
        assert!(GraphError::VisualizationNotFound("x".into()).is_not_found());
        assert!(!GraphError::NotFound("x".into()).is_input_error());
        assert!(
            !GraphError::Tagging {
                document_id: "d".into(),
                message: "down".into()
            }
            .is_not_found()
        );
    }
}
