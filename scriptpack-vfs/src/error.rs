//! Loader error types

use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Error type for loader operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// File or directory not found
    #[error("Path not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A directory operation was given something else
    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// Content is not valid UTF-8
    #[error("Invalid UTF-8 in '{}'", path.display())]
    Utf8 { path: PathBuf },

    /// IO error
    #[error("IO error on '{}': {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl LoadError {
    /// Build from an `std::io::Error`, mapping `NotFound` and invalid data
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound { path },
            std::io::ErrorKind::InvalidData => LoadError::Utf8 { path },
            _ => LoadError::Io {
                path,
                message: err.to_string(),
            },
        }
    }

    /// The path the failed operation was about
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::NotFound { path }
            | LoadError::NotADirectory { path }
            | LoadError::Utf8 { path }
            | LoadError::Io { path, .. } => path,
        }
    }
}
