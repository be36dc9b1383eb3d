//! SourceLoader trait definition

use crate::error::LoadResult;
use async_trait::async_trait;
use std::path::Path;

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name, without the parent directory
    pub name: String,
    pub is_dir: bool,
}

/// Asynchronous access to real storage
///
/// Decouples the compiler from the file system so that ingestion and
/// manifest lookup can be exercised against in-memory fixtures.
///
/// # Implementations
/// - `NativeLoader`: tokio backed OS file system
/// - `MemoryLoader`: in-memory fixture tree
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Read a whole file as UTF-8 text
    async fn read_to_string(&self, path: &Path) -> LoadResult<String>;

    /// List a directory, sorted by name
    async fn read_dir(&self, path: &Path) -> LoadResult<Vec<DirEntry>>;

    /// Check if path is a file
    async fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory
    async fn is_dir(&self, path: &Path) -> bool;

    /// Check if path exists
    async fn exists(&self, path: &Path) -> bool {
        self.is_file(path).await || self.is_dir(path).await
    }
}
