//! Built-in compiler service
//!
//! Resolves every module reference of the root files through the host,
//! reports unresolved modules and missing named imports, then writes one
//! AMD bundle and, when asked, one ambient declaration bundle.

use std::collections::HashMap;
use std::sync::Arc;

use scriptpack_config::{EmitOptions, ModuleKind, ScriptTarget};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::diagnostic::Diagnostic;
use crate::host::{CompilerHost, Extension, HostSourceFile};
use crate::scan::{tokenize, ExportDecl, ExportSurface, ImportClause, ImportDecl, Span, TokenKind, TokenTree};

use super::bindings::Scope;
use super::decorate::{scan_decorators, Helpers};
use super::emit::{emit_declarations, emit_json_module, emit_module, module_name, Link};
use super::CompilerService;

pub const FILE_NOT_FOUND: u32 = 6053;
pub const CANNOT_FIND_MODULE: u32 = 2307;
pub const NO_EXPORTED_MEMBER: u32 = 2305;
pub const NO_DEFAULT_EXPORT: u32 = 1192;
pub const DECORATORS_NOT_VALID: u32 = 1206;
pub const EXPERIMENTAL_DECORATORS: u32 = 1219;
pub const JSX_NOT_ENABLED: u32 = 17004;
pub const JSON_MODULE_NOT_ENABLED: u32 = 2732;
pub const UNSUPPORTED_EXTENSION: u32 = 6054;
pub const JAVASCRIPT_NOT_ENABLED: u32 = 6504;
pub const UNSUPPORTED_TARGET: u32 = 6046;
pub const INVALID_JSON: u32 = 1005;

/// Root file suffixes the linker accepts
const ROOT_SUFFIXES: [&str; 5] = [".ts", ".tsx", ".d.ts", ".js", ".json"];

/// Links AMD modules by syntax alone; no type checking beyond module
/// references and imported names
#[derive(Debug, Default, Clone, Copy)]
pub struct AmdLinker;

impl AmdLinker {
    pub fn new() -> Self {
        Self
    }
}

enum Body {
    Script,
    Json(Value),
}

struct Unit {
    file: Arc<HostSourceFile>,
    module: String,
    links: HashMap<String, Link>,
    body: Body,
}

/// Export surface of a JSON module: its object keys plus the default
fn json_surface(text: &str) -> ExportSurface {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => ExportSurface {
            values: value
                .as_object()
                .map(|o| o.keys().cloned().collect())
                .unwrap_or_default(),
            has_default: true,
            ..Default::default()
        },
        Err(_) => ExportSurface {
            open: true,
            ..Default::default()
        },
    }
}

/// Byte offset of a 1-based line and column
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}

/// First `<` in expression position that opens an element
fn jsx_element(tree: &TokenTree) -> Option<usize> {
    (0..tree.len()).find(|&i| {
        if !tree.is(i, "<") || tree.kind(i) != Some(TokenKind::Punct) {
            return false;
        }
        // `<T,>`, `<T extends U>` and `<T>(` open generic signatures
        let opens = tree.is(i + 1, ">")
            || (tree.is_ident(i + 1)
                && !tree.is(i + 2, ",")
                && !tree.is(i + 2, "extends")
                && !(tree.is(i + 2, ">") && tree.is(i + 3, "(")));
        let in_expression = i == 0
            || match tree.kind(i - 1) {
                Some(TokenKind::Punct) => {
                    matches!(tree.text(i - 1), "(" | "," | "=" | "?" | "[" | "{" | "&" | "|" | "!")
                        || (i >= 2 && tree.is_arrow(i - 2))
                }
                Some(TokenKind::Ident) => {
                    matches!(tree.text(i - 1), "return" | "yield" | "await" | "default" | "case")
                }
                _ => false,
            };
        opens && in_expression
    })
}

/// Global error for a root the options leave out
fn unsupported_root(name: &str, options: &EmitOptions) -> Option<Diagnostic> {
    if !ROOT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        return Some(unsupported_extension(name));
    }
    match Extension::of(name) {
        Extension::Js if !options.allow_js => Some(Diagnostic::global(
            JAVASCRIPT_NOT_ENABLED,
            format!("File '{}' is a JavaScript file. Did you mean to enable the 'allowJs' option?", name),
        )),
        Extension::Json if !options.resolve_json_module => Some(unsupported_extension(name)),
        _ => None,
    }
}

fn unsupported_extension(name: &str) -> Diagnostic {
    Diagnostic::global(
        UNSUPPORTED_EXTENSION,
        format!(
            "File '{}' has an unsupported extension. The only supported extensions are '.ts', '.tsx', '.d.ts'.",
            name
        ),
    )
}

/// Byte span of `name` as a whole word inside `span`, if present
fn word_span(text: &str, span: Span, name: &str) -> Option<Span> {
    let region = &text[span.start..span.end];
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    region.match_indices(name).find_map(|(at, _)| {
        let before = region[..at].chars().next_back();
        let after = region[at + name.len()..].chars().next();
        let whole = !before.is_some_and(is_word) && !after.is_some_and(is_word);
        whole.then(|| Span::new(span.start + at, span.start + at + name.len()))
    })
}

struct Checker<'a> {
    file: &'a HostSourceFile,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl Checker<'_> {
    fn missing_member(&mut self, statement: Span, fallback: Span, specifier: &str, name: &str) {
        let at = word_span(&self.file.text, statement, name).unwrap_or(fallback);
        self.diagnostics.push(Diagnostic::at(
            &self.file.file_name,
            &self.file.text,
            at.start,
            at.end,
            NO_EXPORTED_MEMBER,
            format!("Module '\"{}\"' has no exported member '{}'.", specifier, name),
        ));
    }

    fn missing_default(&mut self, statement: Span, fallback: Span, specifier: &str, local: &str) {
        let at = word_span(&self.file.text, statement, local).unwrap_or(fallback);
        self.diagnostics.push(Diagnostic::at(
            &self.file.file_name,
            &self.file.text,
            at.start,
            at.end,
            NO_DEFAULT_EXPORT,
            format!("Module '\"{}\"' has no default export.", specifier),
        ));
    }

    fn import(&mut self, decl: &ImportDecl, surface: &ExportSurface) {
        let ImportClause::Bindings { default, named, .. } = &decl.clause else {
            return;
        };
        if let Some(local) = default {
            if !surface.open && !surface.has_default {
                self.missing_default(decl.span, decl.source.span, &decl.source.text, local);
            }
        }
        for binding in named {
            let present = if binding.imported == "default" {
                surface.open || surface.has_default
            } else {
                surface.contains(&binding.imported)
            };
            if !present {
                self.missing_member(decl.span, decl.source.span, &decl.source.text, &binding.imported);
            }
        }
    }

    fn error_at(&mut self, span: Span, code: u32, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::at(
            &self.file.file_name,
            &self.file.text,
            span.start,
            span.end,
            code,
            message.into(),
        ));
    }

    /// Decorators are lowered only on class declarations, and only with
    /// `experimental_decorators`
    fn decorators(&mut self, experimental: bool) {
        if !self.file.text.contains('@') {
            return;
        }
        let tokens = tokenize(&self.file.text);
        let scan = scan_decorators(&Scope::new(&self.file.text, &tokens));
        if scan.is_empty() {
            return;
        }
        for decorator in &scan.misplaced {
            self.error_at(decorator.span, DECORATORS_NOT_VALID, "Decorators are not valid here.");
        }
        if !experimental {
            for decorator in scan.all() {
                self.error_at(
                    decorator.span,
                    EXPERIMENTAL_DECORATORS,
                    "Experimental support for decorators is a feature that is subject to change in a future release. Set the 'experimentalDecorators' option in your 'tsconfig' or 'jsconfig' to remove this warning.",
                );
            }
        }
    }

    fn jsx(&mut self) {
        if Extension::of(&self.file.file_name) != Extension::Tsx {
            return;
        }
        let tokens = tokenize(&self.file.text);
        let tree = TokenTree::new(&self.file.text, &tokens);
        if let Some(at) = jsx_element(&tree) {
            let span = Span::new(tokens[at].start, tokens[at].end);
            self.error_at(span, JSX_NOT_ENABLED, "Cannot use JSX unless the '--jsx' flag is provided.");
        }
    }

    fn re_export(&mut self, export: &ExportDecl, surface: &ExportSurface) {
        let ExportDecl::Named {
            span,
            bindings,
            source: Some(source),
            ..
        } = export
        else {
            return;
        };
        for binding in bindings {
            let present = if binding.imported == "default" {
                surface.open || surface.has_default
            } else {
                surface.contains(&binding.imported)
            };
            if !present {
                self.missing_member(*span, source.span, &source.text, &binding.imported);
            }
        }
    }
}

impl AmdLinker {
    fn link(
        &self,
        file: &Arc<HostSourceFile>,
        options: &EmitOptions,
        host: &dyn CompilerHost,
        cache: &mut HashMap<String, Arc<HostSourceFile>>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Unit {
        let syntax = file.syntax();
        let refs = syntax.module_refs();
        let names: Vec<String> = refs.iter().map(|r| r.specifier.clone()).collect();
        let resolved = host.resolve_module_names(&names, &file.file_name);

        let mut links = HashMap::new();
        for (reference, resolution) in refs.iter().zip(resolved) {
            let Some(resolution) = resolution else {
                diagnostics.push(Diagnostic::at(
                    &file.file_name,
                    &file.text,
                    reference.span.start,
                    reference.span.end,
                    CANNOT_FIND_MODULE,
                    format!(
                        "Cannot find module '{}' or its corresponding type declarations.",
                        reference.specifier
                    ),
                ));
                continue;
            };
            if resolution.extension == Extension::Json && !options.resolve_json_module {
                diagnostics.push(Diagnostic::at(
                    &file.file_name,
                    &file.text,
                    reference.span.start,
                    reference.span.end,
                    JSON_MODULE_NOT_ENABLED,
                    format!(
                        "Cannot find module '{}'. Consider using '--resolveJsonModule' to import module with '.json' extension.",
                        reference.specifier
                    ),
                ));
                continue;
            }
            let target = match cache.get(&resolution.resolved_file_name) {
                Some(target) => Some(target.clone()),
                None => host.get_source_file(&resolution.resolved_file_name).inspect(|target| {
                    cache.insert(resolution.resolved_file_name.clone(), target.clone());
                }),
            };
            let surface = match (&target, resolution.extension) {
                (Some(target), Extension::Json) => json_surface(&target.text),
                (Some(target), _) => target.syntax().surface(),
                (None, _) => ExportSurface {
                    open: true,
                    ..Default::default()
                },
            };
            let module = match (&target, resolution.is_external_library_import) {
                (Some(target), false) => module_name(target),
                _ => reference.specifier.clone(),
            };
            links.insert(reference.specifier.clone(), Link { module, surface });
        }

        let mut checker = Checker {
            file: file.as_ref(),
            diagnostics,
        };
        for decl in &syntax.imports {
            if let Some(link) = links.get(&decl.source.text) {
                checker.import(decl, &link.surface);
            }
        }
        for export in &syntax.exports {
            if let Some(link) = export.source().and_then(|s| links.get(&s.text)) {
                checker.re_export(export, &link.surface);
            }
        }
        checker.decorators(options.experimental_decorators);
        checker.jsx();

        Unit {
            file: file.clone(),
            module: module_name(file),
            links,
            body: Body::Script,
        }
    }

    /// A JSON root becomes a module exporting its value
    fn json_unit(&self, file: &Arc<HostSourceFile>, diagnostics: &mut Vec<Diagnostic>) -> Option<Unit> {
        match serde_json::from_str::<Value>(&file.text) {
            Ok(value) => Some(Unit {
                file: file.clone(),
                module: module_name(file),
                links: HashMap::new(),
                body: Body::Json(value),
            }),
            Err(e) => {
                let at = byte_offset(&file.text, e.line(), e.column());
                let end = file.text[at..].chars().next().map_or(at, |c| at + c.len_utf8());
                diagnostics.push(Diagnostic::at(
                    &file.file_name,
                    &file.text,
                    at,
                    end,
                    INVALID_JSON,
                    format!("Invalid JSON: {}.", e),
                ));
                None
            }
        }
    }
}

/// Helper definitions followed by one `define` per unit
fn bundle(units: &[Unit], strict: bool) -> String {
    let mut helpers = Helpers::default();
    let mut modules = String::new();
    for unit in units {
        match &unit.body {
            Body::Script => {
                let emitted = emit_module(&unit.file, &unit.module, &unit.links, strict);
                helpers.merge(emitted.helpers);
                modules.push_str(&emitted.text);
            }
            Body::Json(value) => modules.push_str(&emit_json_module(&unit.module, value, strict)),
        }
    }
    helpers.text() + &modules
}

fn json_declarations(module: &str, value: &Value) -> String {
    let mut out = format!("declare module {} {{\n", serde_json::to_string(module).unwrap_or_default());
    if let Some(object) = value.as_object() {
        for key in object.keys().filter(|k| is_plain_name(k)) {
            out.push_str(&format!("    export const {}: any;\n", key));
        }
    }
    out.push_str("    const _default: any;\n    export default _default;\n}\n");
    out
}

fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

impl CompilerService for AmdLinker {
    #[instrument(target = "scriptpack::compiler", skip_all, fields(roots = root_names.len()))]
    fn emit(&self, root_names: &[String], options: &EmitOptions, host: &mut dyn CompilerHost) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let lib = host.default_lib_file_name().to_string();
        if host.get_source_file(&lib).is_none() {
            diagnostics.push(Diagnostic::global(FILE_NOT_FOUND, format!("File '{}' not found.", lib)));
        }

        if options.target == ScriptTarget::Es5 && !options.emit_declaration_only {
            diagnostics.push(Diagnostic::global(
                UNSUPPORTED_TARGET,
                "Argument for '--target' option must be: 'es2017'.",
            ));
        }

        let mut cache: HashMap<String, Arc<HostSourceFile>> = HashMap::new();
        let mut program = Vec::new();
        for name in root_names {
            match host.get_source_file(name) {
                Some(file) => {
                    cache.insert(name.clone(), file.clone());
                    match unsupported_root(name, options) {
                        Some(diagnostic) => diagnostics.push(diagnostic),
                        None => program.push(file),
                    }
                }
                None => diagnostics.push(Diagnostic::global(
                    FILE_NOT_FOUND,
                    format!("File '{}' not found.", name),
                )),
            }
        }

        let mut units: Vec<Unit> = Vec::new();
        for file in program.iter().filter(|file| !file.is_declaration()) {
            if Extension::of(&file.file_name) == Extension::Json {
                units.extend(self.json_unit(file, &mut diagnostics));
            } else {
                units.push(self.link(file, options, host, &mut cache, &mut diagnostics));
            }
        }

        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        debug!(
            target: "scriptpack::compiler",
            modules = units.len(),
            errors,
            "linked program"
        );
        if errors > 0 && options.no_emit_on_error {
            return diagnostics;
        }

        if !options.emit_declaration_only {
            let script = match options.module {
                ModuleKind::Amd => bundle(&units, options.always_strict),
            };
            host.write_file(&options.out_file, &script);
        }
        if options.declaration || options.emit_declaration_only {
            let declarations: String = units
                .iter()
                .map(|u| match &u.body {
                    Body::Script => emit_declarations(&u.file, &u.module, &u.links),
                    Body::Json(value) => json_declarations(&u.module, value),
                })
                .collect();
            host.write_file(&options.declaration_file(), &declarations);
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CompilationHost;
    use crate::store::{FileStore, Package};

    fn roots(store: &FileStore) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in ["index.ts", "util.ts", "types.d.ts"] {
            if store.file(name).is_some() {
                names.push(name.to_string());
            }
        }
        names
    }

    fn run(store: &FileStore, options: &EmitOptions) -> (Vec<Diagnostic>, Option<String>, Option<String>) {
        let mut host = CompilationHost::new(store);
        let diagnostics = AmdLinker::new().emit(&roots(store), options, &mut host);
        let output = host.into_output();
        (diagnostics, output.script, output.declarations)
    }

    #[test]
    fn test_bundle_of_two_modules() {
        let mut store = FileStore::new();
        store.put("index.ts", "import { f } from './util';\nexport const v = f();\n", None);
        store.put("util.ts", "export function f(): number { return 1; }\n", None);
        let (diagnostics, script, _) = run(&store, &EmitOptions::implementation());
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let script = script.unwrap();
        let index = script.find("define(\"index\"").unwrap();
        let util = script.find("define(\"util\"").unwrap();
        assert!(index < util);
        assert!(script.contains("[\"require\", \"exports\", \"util\"]"));
    }

    #[test]
    fn test_unresolved_module_is_reported_at_specifier() {
        let mut store = FileStore::new();
        let text = "import pad from 'left-pad-fake';\n";
        store.put("index.ts", text, None);
        let (diagnostics, script, _) = run(&store, &EmitOptions::implementation());
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = &diagnostics[0];
        assert_eq!(diagnostic.code, CANNOT_FIND_MODULE);
        assert_eq!(diagnostic.file.as_deref(), Some("index.ts"));
        assert_eq!(diagnostic.start, text.find("'left-pad-fake'"));
        assert_eq!(diagnostic.length, Some("'left-pad-fake'".len()));
        assert!(diagnostic.message.text().contains("left-pad-fake"));
        // no emit on error
        assert!(script.is_none());
    }

    #[test]
    fn test_missing_member_and_default() {
        let mut store = FileStore::new();
        let text = "import d, { f, g } from './util';\nconsole.log(d, f, g);\n";
        store.put("index.ts", text, None);
        store.put("util.ts", "export const f = 1;\n", None);
        let (diagnostics, _, _) = run(&store, &EmitOptions::implementation());
        let codes: Vec<u32> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![NO_DEFAULT_EXPORT, NO_EXPORTED_MEMBER]);
        assert_eq!(diagnostics[1].start, text.find('g'));
        assert_eq!(
            diagnostics[1].message.text(),
            "Module '\"./util\"' has no exported member 'g'."
        );
    }

    #[test]
    fn test_opaque_package_default_import_is_clean() {
        let mut store = FileStore::new();
        store.put(
            "index.ts",
            "import BigNumber from 'bignumber.js';\nexport const n = new BigNumber(1);\n",
            None,
        );
        store.insert_package("bignumber.js", Package::opaque("bignumber.js"));
        let (diagnostics, script, _) = run(&store, &EmitOptions::implementation());
        assert!(diagnostics.is_empty());
        assert!(script.unwrap().contains("\"bignumber.js\"], function (require, exports, bignumber_js_1)"));
    }

    #[test]
    fn test_missing_root_is_global_error() {
        let store = FileStore::new();
        let mut host = CompilationHost::new(&store);
        let diagnostics = AmdLinker::new().emit(&[String::from("ghost.ts")], &EmitOptions::implementation(), &mut host);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, FILE_NOT_FOUND);
        assert!(diagnostics[0].file.is_none());
    }

    fn run_roots(
        store: &FileStore,
        names: &[&str],
        options: &EmitOptions,
    ) -> (Vec<Diagnostic>, Option<String>, Option<String>) {
        let mut host = CompilationHost::new(store);
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let diagnostics = AmdLinker::new().emit(&names, options, &mut host);
        let output = host.into_output();
        (diagnostics, output.script, output.declarations)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<u32> {
        diagnostics.iter().map(|d| d.code).collect()
    }

    const DECORATED: &str = "function sealed(c: any) {}\n@sealed\nexport class A {\n    @sealed run() {}\n}\n";

    #[test]
    fn test_decorators_are_lowered_with_helpers_first() {
        let mut store = FileStore::new();
        store.put("index.ts", DECORATED, None);
        store.put("util.ts", "export const u = 1;\n", None);
        let (diagnostics, script, _) = run(&store, &EmitOptions::implementation());
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let script = script.unwrap();
        assert!(script.starts_with("var __decorate = "), "{}", script);
        assert!(!script.contains("__param"));
        assert!(!script.contains('@'));
        assert!(script.contains("A = __decorate([sealed], A);"));
        assert_eq!(script.matches("var __decorate").count(), 1);
    }

    #[test]
    fn test_decorators_need_experimental_flag() {
        let mut store = FileStore::new();
        store.put("index.ts", DECORATED, None);
        let options = EmitOptions {
            experimental_decorators: false,
            ..EmitOptions::implementation()
        };
        let (diagnostics, script, _) = run(&store, &options);
        assert_eq!(codes(&diagnostics), vec![EXPERIMENTAL_DECORATORS, EXPERIMENTAL_DECORATORS]);
        assert_eq!(diagnostics[0].start, DECORATED.find("@sealed"));
        assert!(script.is_none());
    }

    #[test]
    fn test_misplaced_decorator() {
        let mut store = FileStore::new();
        let text = "function log(...a: any[]) {}\n@log\nfunction run() {}\n";
        store.put("index.ts", text, None);
        let (diagnostics, _, _) = run(&store, &EmitOptions::implementation());
        assert_eq!(codes(&diagnostics), vec![DECORATORS_NOT_VALID]);
        assert_eq!(diagnostics[0].start, text.find("@log"));
    }

    #[test]
    fn test_jsx_needs_flag() {
        let mut store = FileStore::new();
        let text = "export function view<T,>(x: T) {\n    return <div>{x}</div>;\n}\n";
        store.put("view.tsx", text, None);
        let (diagnostics, script, _) = run_roots(&store, &["view.tsx"], &EmitOptions::implementation());
        assert_eq!(codes(&diagnostics), vec![JSX_NOT_ENABLED]);
        assert_eq!(diagnostics[0].start, text.find("<div>"));
        assert!(script.is_none());
    }

    #[test]
    fn test_generic_tsx_without_elements_is_clean() {
        let mut store = FileStore::new();
        store.put(
            "view.tsx",
            "export const id = <T,>(x: T) => x;\nexport const lt = 1 < 2;\ntype Map = <T>(x: T) => T;\n",
            None,
        );
        let (diagnostics, script, _) = run_roots(&store, &["view.tsx"], &EmitOptions::implementation());
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert!(script.is_some());
    }

    #[test]
    fn test_es5_script_target_is_rejected() {
        let mut store = FileStore::new();
        store.put("index.ts", "export const v = 1;\n", None);
        let options = EmitOptions {
            target: ScriptTarget::Es5,
            ..EmitOptions::implementation()
        };
        let (diagnostics, script, _) = run(&store, &options);
        assert_eq!(codes(&diagnostics), vec![UNSUPPORTED_TARGET]);
        assert!(diagnostics[0].file.is_none());
        assert!(script.is_none());
        // declaration-only output has no target to honour
        let (diagnostics, _, declarations) = run(&store, &EmitOptions::declarations());
        assert!(diagnostics.is_empty());
        assert!(declarations.is_some());
    }

    #[test]
    fn test_javascript_root_follows_allow_js() {
        let mut store = FileStore::new();
        store.put("lib.js", "export const one = 1;\n", None);
        let (diagnostics, _, _) = run_roots(&store, &["lib.js"], &EmitOptions::implementation());
        assert_eq!(codes(&diagnostics), vec![JAVASCRIPT_NOT_ENABLED]);
        assert!(diagnostics[0].message.text().contains("'lib.js'"));

        let options = EmitOptions {
            allow_js: true,
            ..EmitOptions::implementation()
        };
        let (diagnostics, script, _) = run_roots(&store, &["lib.js"], &options);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let script = script.unwrap();
        assert!(script.contains("define(\"lib\""));
        assert!(script.contains("exports.one = 1;"));
    }

    #[test]
    fn test_json_import_follows_resolve_json_module() {
        let mut store = FileStore::new();
        let text = "import config from './data/config.json';\nexport const port = config.port;\n";
        store.put("index.ts", text, None);
        store.put("data/config.json", "{ \"port\": 8080 }", None);
        let roots = ["index.ts", "data/config.json"];

        let (diagnostics, script, _) = run_roots(&store, &roots[..1], &EmitOptions::implementation());
        assert_eq!(codes(&diagnostics), vec![JSON_MODULE_NOT_ENABLED]);
        assert_eq!(diagnostics[0].start, text.find("'./data/config.json'"));
        assert!(script.is_none());

        let options = EmitOptions {
            resolve_json_module: true,
            ..EmitOptions::implementation()
        };
        let (diagnostics, script, _) = run_roots(&store, &roots, &options);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let script = script.unwrap();
        assert!(script.contains("[\"require\", \"exports\", \"data/config\"]"), "{}", script);
        assert!(script.contains("define(\"data/config\", [\"require\", \"exports\"]"));
        assert!(script.contains("exports.default = json;"));
    }

    #[test]
    fn test_json_named_import_checks_keys() {
        let mut store = FileStore::new();
        store.put("index.ts", "import { host } from './config.json';\nexport const h = host;\n", None);
        store.put("config.json", "{ \"port\": 8080 }", None);
        let options = EmitOptions {
            resolve_json_module: true,
            ..EmitOptions::implementation()
        };
        let (diagnostics, _, _) = run_roots(&store, &["index.ts", "config.json"], &options);
        assert_eq!(codes(&diagnostics), vec![NO_EXPORTED_MEMBER]);
    }

    #[test]
    fn test_invalid_json_root() {
        let mut store = FileStore::new();
        let text = "{\n  \"port\": ,\n}";
        store.put("config.json", text, None);
        let options = EmitOptions {
            resolve_json_module: true,
            ..EmitOptions::implementation()
        };
        let (diagnostics, _, _) = run_roots(&store, &["config.json"], &options);
        assert_eq!(codes(&diagnostics), vec![INVALID_JSON]);
        assert_eq!(diagnostics[0].start, text.find(','));
    }

    #[test]
    fn test_unsupported_root_extensions() {
        let mut store = FileStore::new();
        store.put("style.css", "a {}", None);
        store.put("config.json", "{}", None);
        let (diagnostics, _, _) = run_roots(&store, &["style.css", "config.json"], &EmitOptions::implementation());
        assert_eq!(codes(&diagnostics), vec![UNSUPPORTED_EXTENSION, UNSUPPORTED_EXTENSION]);
        assert!(diagnostics.iter().all(|d| d.file.is_none()));
    }

    #[test]
    fn test_declaration_pass_writes_only_declarations() {
        let mut store = FileStore::new();
        store.put("index.ts", "export interface Options { a: number }\nexport const run = () => 1;\n", None);
        store.put("types.d.ts", "declare const x: number;", None);
        let (diagnostics, script, declarations) = run(&store, &EmitOptions::declarations());
        assert!(diagnostics.is_empty());
        assert!(script.is_none());
        let declarations = declarations.unwrap();
        assert!(declarations.starts_with("declare module \"index\" {"));
        assert!(declarations.contains("export interface Options { a: number }"));
        assert!(!declarations.contains("types"));
    }
}
