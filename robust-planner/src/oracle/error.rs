//! Delay model error types.

use std::path::PathBuf;

/// Errors that can occur when loading a delay model.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Model file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Model file is not valid JSON for the expected schema
    #[error("failed to parse delay model: {0}")]
    Json(#[from] serde_json::Error),

    /// Distribution parameters are out of range
    #[error("invalid gamma parameters for {key}: {reason}")]
    InvalidParams { key: String, reason: &'static str },
}
