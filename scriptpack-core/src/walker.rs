//! Dependency Walker
//!
//! Follows the top-level imports of a file. Relative specifiers become
//! logical file paths; everything else names a package. Anything the session
//! does not know yet is asked from a [`DependencyResolver`], one request at a
//! time, depth-first.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, trace, warn};

use crate::registry::PackageRegistry;
use crate::scan::scan_imports;
use crate::store::{Package, SessionState};

/// What a resolver hands back for a file or a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// Logical path of a file; the package name for packages
    pub name: String,
    /// Source text of a file, implementation text of a package
    pub script: String,
    /// Declaration text of a package
    pub dts: Option<String>,
}

impl ResolvedDependency {
    pub fn file(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            dts: None,
        }
    }

    pub fn package(name: impl Into<String>, script: impl Into<String>, dts: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            dts: Some(dts.into()),
        }
    }
}

/// Supplies files and packages the session does not have yet
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Resolve a logical file path, or a package name when `is_package`
    async fn resolve(&self, name: &str, is_package: bool) -> Option<ResolvedDependency>;
}

/// Resolve `relative` against the directory of `base_file`.
///
/// `.` segments are dropped and `..` pops the previous segment. Popping past
/// the first segment is tolerated, so the result can name a path outside
/// the directory tree of the importer.
pub fn resolve_absolute_path(base_file: &str, relative: &str) -> String {
    let mut base: Vec<&str> = base_file.split('/').collect();
    base.pop();
    let base = base.join("/");
    let full = if base.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", base, relative)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in full.split('/') {
        match segment {
            "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// True when the `..` segments of `relative` climb above the directory of
/// `base_file`
pub fn escapes_root(base_file: &str, relative: &str) -> bool {
    let mut depth = base_file.split('/').count() as isize - 1;
    for segment in relative.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => depth += 1,
        }
    }
    false
}

/// Frame for a file the store already has: `Some(None)` once it has been
/// walked, `None` when the store does not know `path`
fn known_frame(state: &mut SessionState, path: &str) -> Option<Option<Frame>> {
    let known = state.store.module_path(path)?;
    if !state.mark_walked(&known) {
        trace!(target: "scriptpack::walker", path = %known, "already walked");
        return Some(None);
    }
    trace!(target: "scriptpack::walker", path = %known, "walking known file");
    let text = state.store.read(&known)?;
    Some(Some(Frame::new(known, &text)))
}

/// Follow the imports of every root that has not been walked yet, through
/// files the store already has. Registered packages join the closure and
/// nothing is resolved. Returns the newly recorded package names.
pub fn record_references(state: &mut SessionState) -> Vec<String> {
    let pending: Vec<String> = state
        .file_names
        .iter()
        .filter(|name| !state.walked.contains(*name))
        .cloned()
        .collect();
    let mut recorded = Vec::new();
    for root in pending {
        let Some(frame) = known_frame(state, &root).flatten() else {
            continue;
        };
        let mut stack = vec![frame];
        while let Some(frame) = stack.last_mut() {
            let Some(import) = frame.refs.next() else {
                stack.pop();
                continue;
            };
            if import.is_relative() {
                let path = resolve_absolute_path(&frame.file, &import.specifier);
                stack.extend(known_frame(state, &path).flatten());
            } else if !state.closure.contains_key(&import.specifier) && state.record_dependency(&import.specifier) {
                recorded.push(import.specifier);
            }
        }
    }
    if !recorded.is_empty() {
        debug!(target: "scriptpack::walker", packages = ?recorded, "recorded references of unwalked files");
    }
    recorded
}

/// Walks imports of one file through a resolver
pub struct DependencyWalker<'a> {
    registry: &'a PackageRegistry,
    resolver: &'a dyn DependencyResolver,
    timeout: Option<Duration>,
}

struct Frame {
    file: String,
    refs: std::vec::IntoIter<crate::scan::ImportRef>,
}

impl Frame {
    fn new(file: String, text: &str) -> Self {
        Self {
            file,
            refs: scan_imports(text).into_iter(),
        }
    }
}

impl<'a> DependencyWalker<'a> {
    pub fn new(registry: &'a PackageRegistry, resolver: &'a dyn DependencyResolver) -> Self {
        Self {
            registry,
            resolver,
            timeout: None,
        }
    }

    /// Give up on resolver calls that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn ask(&self, name: &str, is_package: bool) -> Option<ResolvedDependency> {
        let request = self.resolver.resolve(name, is_package);
        match self.timeout {
            None => request.await,
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        target: "scriptpack::walker",
                        name,
                        timeout_ms = limit.as_millis() as u64,
                        "resolver timed out"
                    );
                    None
                }
            },
        }
    }

    /// Walk `file` and everything it pulls in.
    ///
    /// Returns the names of newly registered files and packages, in discovery
    /// order. A miss is not an error; the import stays unresolved.
    #[instrument(target = "scriptpack::walker", skip(self, state, text))]
    pub async fn walk(&self, state: &mut SessionState, file: &str, text: &str) -> Vec<String> {
        let mut discovered = Vec::new();
        state.mark_walked(file);
        let mut stack = vec![Frame::new(file.to_string(), text)];

        while let Some(frame) = stack.last_mut() {
            let Some(import) = frame.refs.next() else {
                stack.pop();
                continue;
            };
            let importer = frame.file.clone();

            if import.is_relative() {
                if escapes_root(&importer, &import.specifier) {
                    warn!(
                        target: "scriptpack::walker",
                        importer = %importer,
                        specifier = %import.specifier,
                        "relative import climbs above the root"
                    );
                }
                let path = resolve_absolute_path(&importer, &import.specifier);
                if let Some(frame) = known_frame(state, &path) {
                    stack.extend(frame);
                    continue;
                }
                let Some(resolved) = self.ask(&path, false).await else {
                    debug!(target: "scriptpack::walker", path = %path, importer = %importer, "unresolved file");
                    continue;
                };
                debug!(target: "scriptpack::walker", path = %resolved.name, "resolved file");
                // The resolver may answer with a name that is already known
                if let Some(frame) = known_frame(state, &resolved.name) {
                    stack.extend(frame);
                    continue;
                }
                state.add_file(&resolved.name, resolved.script.as_str(), None);
                state.mark_walked(&resolved.name);
                discovered.push(resolved.name.clone());
                stack.push(Frame::new(resolved.name, &resolved.script));
            } else {
                let name = import.specifier;
                if !state.store.has_package(&name) {
                    match self.ask(&name, true).await {
                        Some(resolved) => {
                            debug!(target: "scriptpack::walker", package = %name, "resolved package");
                            let package = Package::inline(
                                name.as_str(),
                                "",
                                Some(resolved.script),
                                resolved.dts.unwrap_or_default(),
                            );
                            self.registry.register(state, &name, package).await;
                            discovered.push(name.clone());
                        }
                        None => {
                            debug!(target: "scriptpack::walker", package = %name, importer = %importer, "unresolved package");
                        }
                    }
                }
                state.record_dependency(&name);
            }
        }

        discovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestLocator;
    use scriptpack_vfs::MemoryLoader;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MapResolver {
        files: HashMap<String, String>,
        packages: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DependencyResolver for MapResolver {
        async fn resolve(&self, name: &str, is_package: bool) -> Option<ResolvedDependency> {
            self.calls.lock().unwrap().push(name.to_string());
            if is_package {
                let dts = self.packages.get(name)?;
                Some(ResolvedDependency::package(name, "", dts.as_str()))
            } else {
                let key = format!("{}.ts", name);
                let text = self.files.get(&key)?;
                Some(ResolvedDependency::file(key, text.as_str()))
            }
        }
    }

    fn registry() -> PackageRegistry {
        PackageRegistry::new(
            ManifestLocator::new("/nowhere", Arc::new(MemoryLoader::new())),
            Vec::new(),
        )
    }

    #[test]
    fn test_resolve_absolute_path() {
        assert_eq!(resolve_absolute_path("a/index.ts", "./b"), "a/b");
        assert_eq!(resolve_absolute_path("a/b/index.ts", "../c"), "a/c");
        assert_eq!(resolve_absolute_path("index.ts", "./x"), "x");
        assert_eq!(resolve_absolute_path("a/b/c.ts", "./../../d/./e"), "d/e");
    }

    #[test]
    fn test_resolve_above_root_is_tolerated() {
        assert_eq!(resolve_absolute_path("index.ts", "../../etc/passwd"), "etc/passwd");
        assert!(escapes_root("index.ts", "../x"));
        assert!(escapes_root("a/index.ts", "../../x"));
        assert!(!escapes_root("a/index.ts", "../x"));
        assert!(!escapes_root("a/index.ts", "./b/../../x"));
    }

    #[tokio::test]
    async fn test_walk_registers_files_and_packages() {
        let resolver = MapResolver {
            files: HashMap::from([
                ("lib/util.ts".to_string(), "import { x } from './deep';\nexport const f = x;".to_string()),
                ("lib/deep.ts".to_string(), "import Big from 'big';\nexport const x = 1;".to_string()),
            ]),
            packages: HashMap::from([("big".to_string(), "export default class Big {}".to_string())]),
            ..Default::default()
        };
        let registry = registry();
        let mut state = SessionState::new();
        state.add_file("index.ts", "import { f } from './lib/util';", None);

        let walker = DependencyWalker::new(&registry, &resolver);
        let found = walker
            .walk(&mut state, "index.ts", "import { f } from './lib/util';")
            .await;

        assert_eq!(found, vec!["lib/util.ts", "lib/deep.ts", "big"]);
        assert_eq!(state.file_names, vec!["index.ts", "lib/util.ts", "lib/deep.ts"]);
        assert_eq!(state.closure.keys().collect::<Vec<_>>(), vec!["big"]);
        assert_eq!(state.closure["big"].version, "");
    }

    #[tokio::test]
    async fn test_cycles_are_walked_once() {
        let resolver = MapResolver {
            files: HashMap::from([
                ("a.ts".to_string(), "import './b';".to_string()),
                ("b.ts".to_string(), "import './a';\nimport './index';".to_string()),
            ]),
            ..Default::default()
        };
        let registry = registry();
        let mut state = SessionState::new();
        state.add_file("index.ts", "import './a';", None);

        let found = DependencyWalker::new(&registry, &resolver)
            .walk(&mut state, "index.ts", "import './a';")
            .await;

        assert_eq!(found, vec!["a.ts", "b.ts"]);
        assert_eq!(*resolver.calls.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_misses_are_silent() {
        let resolver = MapResolver::default();
        let registry = registry();
        let mut state = SessionState::new();

        let found = DependencyWalker::new(&registry, &resolver)
            .walk(&mut state, "index.ts", "import pad from 'left-pad-fake';\nimport './gone';")
            .await;

        assert!(found.is_empty());
        assert!(state.closure.is_empty());
        assert!(!state.store.has_package("left-pad-fake"));
    }

    #[tokio::test]
    async fn test_known_packages_join_closure_without_resolving() {
        let resolver = MapResolver::default();
        let registry = registry();
        let mut state = SessionState::new();
        state.store.insert_package("known", Package::opaque("known"));

        DependencyWalker::new(&registry, &resolver)
            .walk(&mut state, "index.ts", "export * from 'known';")
            .await;

        assert!(resolver.calls.lock().unwrap().is_empty());
        assert_eq!(state.closure["known"].version, "*");
    }

    #[tokio::test]
    async fn test_known_unwalked_file_is_followed() {
        let resolver = MapResolver::default();
        let registry = registry();
        let mut state = SessionState::new();
        state.store.insert_package("pkg", Package::opaque("pkg"));
        state.add_file("util.ts", "import { v } from 'pkg';\nexport const u = v;", None);

        DependencyWalker::new(&registry, &resolver)
            .walk(&mut state, "index.ts", "import { u } from './util';")
            .await;

        assert_eq!(state.closure.keys().collect::<Vec<_>>(), vec!["pkg"]);
        assert!(resolver.calls.lock().unwrap().is_empty());
        assert!(state.walked.contains("util.ts"));
    }

    #[test]
    fn test_record_references_of_unwalked_roots() {
        let mut state = SessionState::new();
        state.store.insert_package("pkg", Package::opaque("pkg"));
        state.store.insert_package("unused", Package::opaque("unused"));
        state.add_file("index.ts", "import { u } from './lib/util';\nimport 'missing';", None);
        state.add_file("lib/util.ts", "export * from 'pkg';\nimport '../index';", None);

        assert_eq!(record_references(&mut state), vec!["pkg"]);
        assert_eq!(state.closure.keys().collect::<Vec<_>>(), vec!["pkg"]);
        // everything is walked now
        assert!(record_references(&mut state).is_empty());
    }

    struct StalledResolver;

    #[async_trait]
    impl DependencyResolver for StalledResolver {
        async fn resolve(&self, _name: &str, _is_package: bool) -> Option<ResolvedDependency> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            None
        }
    }

    #[tokio::test]
    async fn test_timeout_treats_stall_as_miss() {
        let registry = registry();
        let mut state = SessionState::new();
        let found = DependencyWalker::new(&registry, &StalledResolver)
            .with_timeout(Some(Duration::from_millis(10)))
            .walk(&mut state, "index.ts", "import './slow';")
            .await;
        assert!(found.is_empty());
    }
}
