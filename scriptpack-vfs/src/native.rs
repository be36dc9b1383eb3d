//! Native file system loader

use crate::error::{LoadError, LoadResult};
use crate::loader::{DirEntry, SourceLoader};
use async_trait::async_trait;
use std::path::Path;

/// A loader reading from the OS file system through `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct NativeLoader;

impl NativeLoader {
    /// Create a new native loader.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceLoader for NativeLoader {
    async fn read_to_string(&self, path: &Path) -> LoadResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LoadError::from_io(path, e))
    }

    async fn read_dir(&self, path: &Path) -> LoadResult<Vec<DirEntry>> {
        if !self.is_dir(path).await {
            if self.is_file(path).await {
                return Err(LoadError::NotADirectory {
                    path: path.to_path_buf(),
                });
            }
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut reader = tokio::fs::read_dir(path)
            .await
            .map_err(|e| LoadError::from_io(path, e))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| LoadError::from_io(path, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| LoadError::from_io(entry.path(), e))?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}
