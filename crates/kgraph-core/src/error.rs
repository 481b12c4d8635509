//! Error types for the graph store

/// Graph store errors
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Edge references a node id not present in the graph
    #[error("edge endpoint not in graph: {source_id} -> {target}")]
    MissingEndpoint {
        /// Source concept id of the rejected edge
        source_id: String,
        /// Target concept id of the rejected edge
        target: String,
    },

    /// Snapshot I/O failed
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failed
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
