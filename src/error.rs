//! Muninn error types

use std::path::PathBuf;

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    // Storage errors
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MuninnError {
    /// Wrap an I/O error with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for MuninnError {
    fn from(err: reqwest::Error) -> Self {
        MuninnError::Http(err.to_string())
    }
}

/// Result type alias for muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
