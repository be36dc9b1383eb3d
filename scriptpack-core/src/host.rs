//! Compilation Host
//!
//! The only view of the session the compiler service gets. Sources come from
//! the [`FileStore`], bare module names resolve to the synthesized
//! declaration path of their package, and emitted files are captured in
//! memory.

use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use tracing::trace;

use crate::scan::ModuleSyntax;
use crate::store::{declaration_path, FileStore};
use crate::walker::resolve_absolute_path;

/// Name the standard library declarations are served under
pub const LIB_FILE_NAME: &str = "lib.d.ts";

/// Standard library declarations, parsed once per process and shared by
/// every session
pub static STANDARD_LIBRARY: Lazy<Arc<HostSourceFile>> =
    Lazy::new(|| Arc::new(HostSourceFile::new(LIB_FILE_NAME, include_str!("../lib/lib.d.ts"))));

/// A source file as handed to the compiler service
#[derive(Debug)]
pub struct HostSourceFile {
    pub file_name: String,
    pub text: Arc<str>,
    syntax: OnceCell<ModuleSyntax>,
}

impl HostSourceFile {
    pub fn new(file_name: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
            syntax: OnceCell::new(),
        }
    }

    /// Module declarations of the file, scanned on first use
    pub fn syntax(&self) -> &ModuleSyntax {
        self.syntax.get_or_init(|| ModuleSyntax::parse(&self.text))
    }

    pub fn is_declaration(&self) -> bool {
        self.file_name.ends_with(".d.ts")
    }
}

/// Kind of file a module name resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Ts,
    Tsx,
    Dts,
    Js,
    Json,
}

impl Extension {
    pub fn of(file_name: &str) -> Self {
        if file_name.ends_with(".d.ts") {
            Extension::Dts
        } else if file_name.ends_with(".tsx") {
            Extension::Tsx
        } else if file_name.ends_with(".json") {
            Extension::Json
        } else if file_name.ends_with(".js") {
            Extension::Js
        } else {
            Extension::Ts
        }
    }
}

/// Suffixes a module name may carry to name its file exactly
pub const EXACT_SUFFIXES: [&str; 4] = [".ts", ".tsx", ".js", ".json"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub resolved_file_name: String,
    pub extension: Extension,
    /// Set for package declarations
    pub is_external_library_import: bool,
}

/// Suffixes tried, in order, for a relative module name
pub const RELATIVE_CANDIDATES: [&str; 7] = [
    "",
    ".ts",
    ".tsx",
    ".d.ts",
    "/index.ts",
    "/index.tsx",
    "/index.d.ts",
];

/// Services a compiler needs from its environment
pub trait CompilerHost {
    fn file_exists(&self, file_name: &str) -> bool;

    /// Always `None`: sources are only available through
    /// [`CompilerHost::get_source_file`]
    fn read_file(&self, _file_name: &str) -> Option<String> {
        None
    }

    fn get_source_file(&self, file_name: &str) -> Option<Arc<HostSourceFile>>;

    fn default_lib_file_name(&self) -> &str {
        LIB_FILE_NAME
    }

    /// Resolve each module name imported by `containing_file`; `None` marks
    /// an unresolved name
    fn resolve_module_names(&self, module_names: &[String], containing_file: &str) -> Vec<Option<ResolvedModule>>;

    fn write_file(&mut self, file_name: &str, text: &str);
}

/// Output files captured by a [`CompilationHost`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitOutput {
    pub script: Option<String>,
    pub declarations: Option<String>,
}

/// [`CompilerHost`] over a session's file store
pub struct CompilationHost<'a> {
    store: &'a FileStore,
    output: EmitOutput,
}

impl<'a> CompilationHost<'a> {
    pub fn new(store: &'a FileStore) -> Self {
        Self {
            store,
            output: EmitOutput::default(),
        }
    }

    pub fn output(&self) -> &EmitOutput {
        &self.output
    }

    pub fn into_output(self) -> EmitOutput {
        self.output
    }

    fn resolve_relative(&self, module_name: &str, containing_file: &str) -> Option<ResolvedModule> {
        let base = resolve_absolute_path(containing_file, module_name);
        RELATIVE_CANDIDATES.iter().find_map(|suffix| {
            let candidate = format!("{}{}", base, suffix);
            // A bare directory or extensionless name is not a module file
            if suffix.is_empty() && !EXACT_SUFFIXES.iter().any(|s| candidate.ends_with(s)) {
                return None;
            }
            self.store.exists(&candidate).then(|| ResolvedModule {
                extension: Extension::of(&candidate),
                resolved_file_name: candidate,
                is_external_library_import: false,
            })
        })
    }
}

impl CompilerHost for CompilationHost<'_> {
    fn file_exists(&self, file_name: &str) -> bool {
        file_name == LIB_FILE_NAME || self.store.exists(file_name)
    }

    fn get_source_file(&self, file_name: &str) -> Option<Arc<HostSourceFile>> {
        if file_name == LIB_FILE_NAME {
            return Some(STANDARD_LIBRARY.clone());
        }
        let text = self.store.read(file_name)?;
        Some(Arc::new(HostSourceFile::new(file_name, text)))
    }

    fn resolve_module_names(&self, module_names: &[String], containing_file: &str) -> Vec<Option<ResolvedModule>> {
        module_names
            .iter()
            .map(|name| {
                let resolved = if name.starts_with('.') {
                    self.resolve_relative(name, containing_file)
                } else {
                    self.store.has_package(name).then(|| ResolvedModule {
                        resolved_file_name: declaration_path(name),
                        extension: Extension::Dts,
                        is_external_library_import: true,
                    })
                };
                trace!(
                    target: "scriptpack::host",
                    module = %name,
                    from = containing_file,
                    resolved = ?resolved.as_ref().map(|r| r.resolved_file_name.as_str()),
                    "resolve module"
                );
                resolved
            })
            .collect()
    }

    fn write_file(&mut self, file_name: &str, text: &str) {
        trace!(target: "scriptpack::host", file = file_name, bytes = text.len(), "write output");
        if file_name.ends_with("d.ts") {
            self.output.declarations = Some(text.to_string());
        } else {
            self.output.script = Some(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Package;

    fn store() -> FileStore {
        let mut store = FileStore::new();
        store.put("index.ts", "import { f } from './lib';", None);
        store.put("lib/index.ts", "export const f = 1;", None);
        store.put("util.tsx", "export const g = 2;", None);
        store.put("data/config.json", "{ \"port\": 1 }", None);
        store.insert_package("bignumber.js", Package::opaque("bignumber.js"));
        store
    }

    #[test]
    fn test_standard_library_is_shared() {
        let store = FileStore::new();
        let host = CompilationHost::new(&store);
        let first = host.get_source_file(LIB_FILE_NAME).unwrap();
        let second = host.get_source_file(LIB_FILE_NAME).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.text.contains("interface Array<T>"));
        assert!(host.file_exists(host.default_lib_file_name()));
    }

    #[test]
    fn test_read_file_returns_nothing() {
        let store = store();
        let host = CompilationHost::new(&store);
        assert!(host.read_file("index.ts").is_none());
        assert!(host.get_source_file("index.ts").is_some());
    }

    #[test]
    fn test_resolve_relative_candidates() {
        let store = store();
        let host = CompilationHost::new(&store);
        let names = vec![
            String::from("./lib"),
            String::from("./util"),
            String::from("./missing"),
        ];
        let resolved = host.resolve_module_names(&names, "index.ts");
        assert_eq!(resolved[0].as_ref().unwrap().resolved_file_name, "lib/index.ts");
        assert_eq!(resolved[1].as_ref().unwrap().extension, Extension::Tsx);
        assert!(resolved[2].is_none());
    }

    #[test]
    fn test_resolve_exact_json_name() {
        let store = store();
        let host = CompilationHost::new(&store);
        let names = vec![String::from("./data/config.json"), String::from("./data/config")];
        let resolved = host.resolve_module_names(&names, "index.ts");
        let json = resolved[0].as_ref().unwrap();
        assert_eq!(json.resolved_file_name, "data/config.json");
        assert_eq!(json.extension, Extension::Json);
        assert!(resolved[1].is_none());
    }

    #[test]
    fn test_resolve_parent_relative() {
        let store = store();
        let host = CompilationHost::new(&store);
        let resolved = host.resolve_module_names(&[String::from("../util")], "lib/index.ts");
        assert_eq!(resolved[0].as_ref().unwrap().resolved_file_name, "util.tsx");
    }

    #[test]
    fn test_resolve_package_to_declaration_path() {
        let store = store();
        let host = CompilationHost::new(&store);
        let names = vec![String::from("bignumber.js"), String::from("left-pad-fake")];
        let resolved = host.resolve_module_names(&names, "index.ts");
        assert_eq!(
            resolved[0],
            Some(ResolvedModule {
                resolved_file_name: String::from("bignumber.js/index.d.ts"),
                extension: Extension::Dts,
                is_external_library_import: true,
            })
        );
        assert!(resolved[1].is_none());
        let source = host.get_source_file("bignumber.js/index.d.ts").unwrap();
        assert!(source.syntax().surface().has_default);
    }

    #[test]
    fn test_write_file_routes_by_suffix() {
        let store = FileStore::new();
        let mut host = CompilationHost::new(&store);
        host.write_file("index.js", "define();");
        host.write_file("index.d.ts", "declare module \"x\" {}");
        let output = host.into_output();
        assert_eq!(output.script.as_deref(), Some("define();"));
        assert_eq!(output.declarations.as_deref(), Some("declare module \"x\" {}"));
    }
}
