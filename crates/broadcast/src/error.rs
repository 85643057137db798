//! Error types for the broadcast subsystem.

use thiserror::Error;

/// Errors that can occur while composing or sending a broadcast.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] database::DatabaseError),

    /// Draft serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BroadcastError>;
