//! Error types raised by the stats engine and its stores.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    /// An id has no catalog entry. Callers drop the affected row.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatsError>;
