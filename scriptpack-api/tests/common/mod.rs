//! Shared fixtures for plugin resolver tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use scriptpack_api::RunConfig;
use scriptpack_vfs::MemoryLoader;

/// Run configuration rooted at `/app` over in-memory files
pub fn memory_config<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> RunConfig {
    RunConfig::with_root("/app").with_loader(Arc::new(MemoryLoader::with_files(files)))
}

/// Unique scratch directory removed on drop
pub struct TempDir {
    pub path: PathBuf,
}

impl TempDir {
    pub fn new(test_name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("scriptpack-{}-{}", test_name, std::process::id()));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn write(&self, relative: &str, text: &str) {
        let file = self.path.join(relative);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, text).unwrap();
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

pub fn empty_config() -> RunConfig {
    RunConfig::with_root("/app").with_loader(Arc::new(MemoryLoader::new()))
}
