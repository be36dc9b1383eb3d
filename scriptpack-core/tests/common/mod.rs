//! Shared fixtures for session tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scriptpack_config::CompilerConfig;
use scriptpack_core::{AmdLinker, Compiler, DependencyResolver, ResolvedDependency};
use scriptpack_vfs::MemoryLoader;

/// Map-backed resolver that records every request
#[derive(Default)]
pub struct FixtureResolver {
    files: HashMap<String, String>,
    packages: HashMap<String, (String, String)>,
    pub calls: Mutex<Vec<(String, bool)>>,
}

impl FixtureResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `path` (with or without `.ts`) with `text`
    pub fn file(mut self, path: &str, text: &str) -> Self {
        self.files.insert(path.to_string(), text.to_string());
        self
    }

    pub fn package(mut self, name: &str, script: &str, dts: &str) -> Self {
        self.packages
            .insert(name.to_string(), (script.to_string(), dts.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DependencyResolver for FixtureResolver {
    async fn resolve(&self, name: &str, is_package: bool) -> Option<ResolvedDependency> {
        self.calls.lock().unwrap().push((name.to_string(), is_package));
        if is_package {
            let (script, dts) = self.packages.get(name)?;
            return Some(ResolvedDependency::package(name, script.as_str(), dts.as_str()));
        }
        let path = format!("{}.ts", name);
        let text = self.files.get(&path)?;
        Some(ResolvedDependency::file(path, text.as_str()))
    }
}

/// Session over an in-memory package tree rooted at `/app`
pub fn session(loader: MemoryLoader) -> Compiler {
    let config = CompilerConfig {
        package_root: "/app".into(),
        ..Default::default()
    };
    Compiler::with_parts(config, Arc::new(loader), Arc::new(AmdLinker::new()))
}

pub fn empty_session() -> Compiler {
    session(MemoryLoader::new())
}
