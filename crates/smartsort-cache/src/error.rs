use std::path::PathBuf;

use thiserror::Error;

/// Errors from the result cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache unavailable: {message}")]
    Unavailable { message: String },
}

pub type Result<T> = std::result::Result<T, CacheError>;
