//! Graph loading error types.

use std::path::PathBuf;

use crate::domain::StopId;

/// Errors from building or loading a transit graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Two stops share an id
    #[error("duplicate stop id {0}")]
    DuplicateStop(StopId),

    /// A connection references a stop that was never added
    #[error("connection references unknown stop {0}")]
    UnknownStop(StopId),

    /// The configured hub is not one of the stops
    #[error("hub stop {0} is not in the graph")]
    UnknownHub(StopId),

    /// Snapshot file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot file is not valid JSON for the expected schema
    #[error("failed to parse graph snapshot: {0}")]
    Json(#[from] serde_json::Error),
}
