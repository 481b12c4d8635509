//! Pipeline error types

use kgraph_llm::BackendError;

/// Errors surfacing from the extraction and expansion pipelines
///
/// Malformed responses and invalid entities are absorbed (logged and
/// skipped), so the only failures that reach the caller are transport
/// failures and I/O around analysis documents.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Backend transport failure, propagated uncaught
    #[error("backend call failed: {0}")]
    Backend(#[from] BackendError),

    /// Analysis document I/O failed
    #[error("analysis io error: {0}")]
    Io(#[from] std::io::Error),

    /// Analysis document did not decode
    #[error("analysis parse error: {0}")]
    Serialization(#[from] serde_json::Error),
}
