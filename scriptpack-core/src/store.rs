//! Virtual File Store
//!
//! In-memory source files keyed by logical path, plus the packages of the
//! session. Nothing here touches real storage; data enters through the
//! ingestion entry points of the compiler and the package registry.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Suffixes of ingested source files
pub const SOURCE_SUFFIXES: [&str; 2] = [".ts", ".tsx"];

/// Suffix of the synthesized declaration path of a package
pub const DECLARATION_SUFFIX: &str = "/index.d.ts";

/// Declaration text of a package whose types could not be found
pub const OPAQUE_DECLARATION: &str = "declare const m: any; export default m;";

/// True for `.ts`/`.tsx` paths that are not declaration files
pub fn is_source_file(path: &str) -> bool {
    SOURCE_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) && !path.ends_with(".d.ts")
}

/// Logical path with its source suffix removed
pub fn strip_source_suffix(path: &str) -> &str {
    SOURCE_SUFFIXES
        .iter()
        .find_map(|suffix| path.strip_suffix(suffix))
        .unwrap_or(path)
}

/// Synthesized declaration path of a package
pub fn declaration_path(package: &str) -> String {
    format!("{}{}", package, DECLARATION_SUFFIX)
}

/// A registered source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub text: Arc<str>,
    /// Package the file belongs to, if it was ingested under one
    pub package: Option<String>,
}

/// Package metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Package {
    pub name: String,
    /// May be `*` or empty when unknown
    pub version: String,
    /// Implementation text, absent for type-only packages
    pub script: Option<String>,
    /// Declaration text handed to the type checker
    pub dts: String,
    /// Directory holding the package's own source files
    pub path: Option<PathBuf>,
    /// Declared requirements from the manifest, name to version range
    pub dependencies: BTreeMap<String, String>,
}

impl Package {
    /// Package with caller supplied texts and no on-disk presence
    pub fn inline(
        name: impl Into<String>,
        version: impl Into<String>,
        script: Option<String>,
        dts: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            script,
            dts: dts.into(),
            ..Self::default()
        }
    }

    /// Fallback for a package whose metadata cannot be found: an opaque
    /// default export that never fails a type check
    pub fn opaque(name: impl Into<String>) -> Self {
        Self::inline(name, "*", None, OPAQUE_DECLARATION)
    }

    pub fn summary(&self) -> PackageSummary {
        PackageSummary {
            name: self.name.clone(),
            version: self.version.clone(),
            path: self.path.as_ref().map(|p| p.to_string_lossy().into_owned()),
        }
    }
}

/// Package entry of a compiled bundle's dependency closure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<String>,
}

/// Source files and packages of one session
#[derive(Debug, Default)]
pub struct FileStore {
    files: HashMap<String, SourceFile>,
    packages: HashMap<String, Arc<Package>>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file; an existing entry at the same path is replaced
    pub fn put(&mut self, path: impl Into<String>, text: impl Into<Arc<str>>, package: Option<String>) {
        let path = path.into();
        let file = SourceFile {
            path: path.clone(),
            text: text.into(),
            package,
        };
        self.files.insert(path, file);
    }

    /// Text of a file or of a package declaration path
    pub fn read(&self, path: &str) -> Option<Arc<str>> {
        if let Some(package) = path
            .strip_suffix(DECLARATION_SUFFIX)
            .and_then(|name| self.packages.get(name))
        {
            return Some(Arc::from(package.dts.as_str()));
        }
        self.files.get(path).map(|file| file.text.clone())
    }

    pub fn file(&self, path: &str) -> Option<&SourceFile> {
        self.files.get(path)
    }

    /// A known file, a package declaration path, or a package name spelled
    /// as a source file
    pub fn exists(&self, path: &str) -> bool {
        if self.files.contains_key(path) {
            return true;
        }
        if let Some(name) = path.strip_suffix(DECLARATION_SUFFIX) {
            if self.packages.contains_key(name) {
                return true;
            }
        }
        SOURCE_SUFFIXES
            .iter()
            .filter_map(|suffix| path.strip_suffix(suffix))
            .any(|name| self.packages.contains_key(name))
    }

    /// File known at `path` or at `path` plus a source suffix
    pub fn contains_module(&self, path: &str) -> bool {
        self.module_path(path).is_some()
    }

    /// Stored path of the file `contains_module` finds for `path`
    pub fn module_path(&self, path: &str) -> Option<String> {
        if self.files.contains_key(path) {
            return Some(path.to_string());
        }
        SOURCE_SUFFIXES
            .iter()
            .map(|suffix| format!("{}{}", path, suffix))
            .find(|candidate| self.files.contains_key(candidate))
    }

    pub fn package(&self, name: &str) -> Option<&Arc<Package>> {
        self.packages.get(name)
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Register a package under `name`. The first registration wins; the
    /// stored value is returned either way.
    pub fn insert_package(&mut self, name: &str, package: Package) -> Arc<Package> {
        self.packages
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(package))
            .clone()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.packages.clear();
    }
}

/// Everything a session accumulates between construction and reset
#[derive(Debug, Default)]
pub struct SessionState {
    pub store: FileStore,
    /// Root names of the compilation, in ingestion order
    pub file_names: Vec<String>,
    /// Packages referenced by walked files
    pub closure: BTreeMap<String, PackageSummary>,
    /// Files whose imports have been followed
    pub walked: HashSet<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a root name unless it is already listed
    pub fn add_root(&mut self, path: &str) {
        if !self.file_names.iter().any(|name| name == path) {
            self.file_names.push(path.to_string());
        }
    }

    /// Store a file and list it as a compilation root. New text has not
    /// been walked yet.
    pub fn add_file(&mut self, path: &str, text: impl Into<Arc<str>>, package: Option<String>) {
        self.store.put(path, text, package);
        self.walked.remove(path);
        self.add_root(path);
    }

    /// Mark `path` as walked; false when it already was
    pub fn mark_walked(&mut self, path: &str) -> bool {
        self.walked.insert(path.to_string())
    }

    /// Record a package in the dependency closure if it is registered
    pub fn record_dependency(&mut self, name: &str) -> bool {
        let Some(package) = self.store.package(name) else {
            return false;
        };
        let summary = package.summary();
        self.closure.entry(name.to_string()).or_insert(summary);
        true
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.file_names.clear();
        self.closure.clear();
        self.walked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_is_last_write_wins() {
        let mut store = FileStore::new();
        store.put("a.ts", "one", None);
        store.put("a.ts", "two", None);
        assert_eq!(store.read("a.ts").as_deref(), Some("two"));
        assert_eq!(store.file_count(), 1);
    }

    #[test]
    fn test_insert_package_is_first_write_wins() {
        let mut store = FileStore::new();
        let first = store.insert_package("pkg", Package::inline("pkg", "1.0.0", None, "export {};"));
        let second = store.insert_package("pkg", Package::opaque("pkg"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.version, "1.0.0");
    }

    #[test]
    fn test_exists_rules() {
        let mut store = FileStore::new();
        store.put("src/a.ts", "", None);
        store.insert_package("lib", Package::opaque("lib"));

        assert!(store.exists("src/a.ts"));
        assert!(store.exists("lib/index.d.ts"));
        assert!(store.exists("lib.ts"));
        assert!(!store.exists("lib"));
        assert!(!store.exists("other/index.d.ts"));
    }

    #[test]
    fn test_read_serves_package_declarations() {
        let mut store = FileStore::new();
        store.insert_package("lib", Package::opaque("lib"));
        assert_eq!(store.read("lib/index.d.ts").as_deref(), Some(OPAQUE_DECLARATION));
        assert!(store.read("lib.ts").is_none());
    }

    #[test]
    fn test_contains_module_with_suffix() {
        let mut store = FileStore::new();
        store.put("a/b.ts", "", None);
        store.put("a/view.tsx", "", None);
        assert!(store.contains_module("a/b"));
        assert!(store.contains_module("a/b.ts"));
        assert!(store.contains_module("a/view"));
        assert!(!store.contains_module("a/c"));
        assert_eq!(store.module_path("a/view").as_deref(), Some("a/view.tsx"));
        assert_eq!(store.module_path("a/c"), None);
    }

    #[test]
    fn test_session_roots_are_unique() {
        let mut state = SessionState::new();
        state.add_file("index.ts", "x", None);
        state.add_file("index.ts", "y", None);
        assert_eq!(state.file_names, vec!["index.ts".to_string()]);
    }

    #[test]
    fn test_new_text_is_not_walked() {
        let mut state = SessionState::new();
        state.add_file("index.ts", "x", None);
        assert!(state.mark_walked("index.ts"));
        assert!(!state.mark_walked("index.ts"));
        state.add_file("index.ts", "y", None);
        assert!(state.mark_walked("index.ts"));
    }

    #[test]
    fn test_record_dependency_requires_package() {
        let mut state = SessionState::new();
        assert!(!state.record_dependency("missing"));
        state.store.insert_package("pkg", Package::opaque("pkg"));
        assert!(state.record_dependency("pkg"));
        assert!(state.record_dependency("pkg"));
        assert_eq!(state.closure.len(), 1);
        assert_eq!(state.closure["pkg"].version, "*");
    }

    #[test]
    fn test_source_suffix_helpers() {
        assert!(is_source_file("a/b.ts"));
        assert!(is_source_file("a/b.tsx"));
        assert!(!is_source_file("a/b.d.ts"));
        assert!(!is_source_file("a/b.js"));
        assert_eq!(strip_source_suffix("a/b.tsx"), "a/b");
        assert_eq!(strip_source_suffix("a/b"), "a/b");
    }
}
