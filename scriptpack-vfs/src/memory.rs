//! In-memory loader

use crate::error::{LoadError, LoadResult};
use crate::loader::{DirEntry, SourceLoader};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// An in-memory fixture tree.
///
/// Files are stored by normalized path in a `BTreeMap`; directories are
/// implied by the paths of the files below them.
///
/// # Example
/// ```
/// use scriptpack_vfs::MemoryLoader;
///
/// let loader = MemoryLoader::with_files([("/pkg/package.json", "{}")]);
/// loader.write_file("/pkg/index.d.ts", "export {};");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryLoader {
    /// Create a new empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader pre-populated with files.
    ///
    /// # Arguments
    /// * `files` - Iterator of (path, content) tuples
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<Path>,
        C: Into<String>,
    {
        let loader = Self::new();
        for (path, content) in files {
            loader.write_file(path, content);
        }
        loader
    }

    /// Add or replace a file.
    pub fn write_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let normalized = normalize_path(path.as_ref());
        if let Ok(mut files) = self.files.write() {
            files.insert(normalized, content.into());
        }
    }
}

/// Forward slashes, no trailing separator
fn normalize_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.len() > 1 {
        text.trim_end_matches('/').to_string()
    } else {
        text
    }
}

fn dir_prefix(normalized: &str) -> String {
    if normalized.ends_with('/') {
        normalized.to_string()
    } else {
        format!("{}/", normalized)
    }
}

#[async_trait]
impl SourceLoader for MemoryLoader {
    async fn read_to_string(&self, path: &Path) -> LoadResult<String> {
        let normalized = normalize_path(path);
        let files = self.files.read().map_err(|_| LoadError::Io {
            path: path.to_path_buf(),
            message: String::from("Lock poisoned"),
        })?;
        files
            .get(&normalized)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: path.to_path_buf(),
            })
    }

    async fn read_dir(&self, path: &Path) -> LoadResult<Vec<DirEntry>> {
        if self.is_file(path).await {
            return Err(LoadError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        let prefix = dir_prefix(&normalize_path(path));
        let files = self.files.read().map_err(|_| LoadError::Io {
            path: path.to_path_buf(),
            message: String::from("Lock poisoned"),
        })?;

        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for key in files.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(dir.to_string());
                }
                None => entries.push(DirEntry {
                    name: rest.to_string(),
                    is_dir: false,
                }),
            }
        }
        if entries.is_empty() && dirs.is_empty() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        entries.extend(dirs.into_iter().map(|name| DirEntry { name, is_dir: true }));
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn is_file(&self, path: &Path) -> bool {
        let normalized = normalize_path(path);
        match self.files.read() {
            Ok(files) => files.contains_key(&normalized),
            Err(_) => false,
        }
    }

    async fn is_dir(&self, path: &Path) -> bool {
        let prefix = dir_prefix(&normalize_path(path));
        match self.files.read() {
            Ok(files) => files.keys().any(|k| k.starts_with(&prefix)),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MemoryLoader {
        MemoryLoader::with_files([
            ("/app/index.ts", "import './util';"),
            ("/app/util.ts", "export {};"),
            ("/app/lib/deep.ts", "export {};"),
        ])
    }

    #[tokio::test]
    async fn test_read_existing() {
        let loader = fixture();
        let text = loader.read_to_string(Path::new("/app/util.ts")).await.unwrap();
        assert_eq!(text, "export {};");
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let loader = fixture();
        let result = loader.read_to_string(Path::new("/app/missing.ts")).await;
        assert!(matches!(result, Err(LoadError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_implied_directories() {
        let loader = fixture();
        assert!(loader.is_dir(Path::new("/app")).await);
        assert!(loader.is_dir(Path::new("/app/lib/")).await);
        assert!(!loader.is_dir(Path::new("/app/index.ts")).await);
        assert!(loader.exists(Path::new("/app/lib")).await);
    }

    #[tokio::test]
    async fn test_read_dir_lists_children_once() {
        let loader = fixture();
        let entries = loader.read_dir(Path::new("/app")).await.unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry { name: "index.ts".into(), is_dir: false },
                DirEntry { name: "lib".into(), is_dir: true },
                DirEntry { name: "util.ts".into(), is_dir: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_read_dir_on_file() {
        let loader = fixture();
        let result = loader.read_dir(Path::new("/app/index.ts")).await;
        assert!(matches!(result, Err(LoadError::NotADirectory { .. })));
    }

    #[tokio::test]
    async fn test_clone_shares_data() {
        let loader = MemoryLoader::new();
        let other = loader.clone();
        other.write_file("/shared.ts", "x");
        assert!(loader.is_file(Path::new("/shared.ts")).await);
    }
}
