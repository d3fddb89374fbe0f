//! Error types shared across Boxshelf crates

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shared Boxshelf operations
pub type Result<T> = std::result::Result<T, BoxshelfError>;

/// Shared error type
#[derive(Error, Debug)]
pub enum BoxshelfError {
    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BoxshelfError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
