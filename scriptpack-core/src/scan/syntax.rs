//! Top-level module syntax
//!
//! Extracts the import and export declarations of a source file without
//! evaluating expressions. Statement boundaries are found from bracket depth,
//! semicolons, and line breaks that cannot continue the previous expression.

use std::collections::BTreeSet;
use std::ops::Deref;

use super::lexer::{string_value, tokenize, Token};
use super::tree::TokenTree;

/// Byte range in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A module specifier string literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    /// Unquoted value
    pub text: String,
    /// Span of the literal, quotes included
    pub span: Span,
}

/// `imported as local` inside an import or export brace list
///
/// For export lists the pair reads `local as exported`: `imported` holds the
/// name inside this file and `local` the name importers see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBinding {
    pub imported: String,
    pub local: String,
    pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportClause {
    /// `import "x"`
    SideEffect,
    /// `import d, * as ns, { a as b } from "x"`
    Bindings {
        default: Option<String>,
        namespace: Option<String>,
        named: Vec<NamedBinding>,
    },
    /// `import x = require("x")`
    Equals(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Whole statement
    pub span: Span,
    pub source: Specifier,
    pub clause: ImportClause,
    /// `import type ...`
    pub type_only: bool,
}

impl ImportDecl {
    /// Local names bound by this import that may carry values
    pub fn value_bindings(&self) -> Vec<&str> {
        if self.type_only {
            return Vec::new();
        }
        match &self.clause {
            ImportClause::SideEffect => Vec::new(),
            ImportClause::Equals(local) => vec![local.as_str()],
            ImportClause::Bindings {
                default,
                namespace,
                named,
            } => default
                .iter()
                .chain(namespace.iter())
                .map(String::as_str)
                .chain(
                    named
                        .iter()
                        .filter(|b| !b.type_only)
                        .map(|b| b.local.as_str()),
                )
                .collect(),
        }
    }
}

/// What an `export default` statement exports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultTarget {
    Expression,
    Function(Option<String>),
    Class(Option<String>),
}

/// Kind of an exported value declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Function,
    Class,
    Variable,
    Enum,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportDecl {
    /// `export { a, b as c } [from "x"]`
    Named {
        span: Span,
        bindings: Vec<NamedBinding>,
        source: Option<Specifier>,
        type_only: bool,
    },
    /// `export * [as ns] from "x"`
    Star {
        span: Span,
        source: Specifier,
        alias: Option<String>,
        type_only: bool,
    },
    /// `export default ...`; `prefix` covers the keywords
    Default { prefix: Span, target: DefaultTarget },
    /// `export function|class|const|let|var|enum|namespace ...`
    Declaration {
        prefix: Span,
        kind: DeclKind,
        names: Vec<String>,
    },
    /// `export = value`
    Assignment { prefix: Span },
}

impl ExportDecl {
    pub fn source(&self) -> Option<&Specifier> {
        match self {
            ExportDecl::Named { source, .. } => source.as_ref(),
            ExportDecl::Star { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A statement that only exists for the type checker: `interface`, `type`
/// aliases and `declare` forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErasedDecl {
    pub span: Span,
    pub names: Vec<String>,
    pub exported: bool,
    /// `declare const|function|class|...` describes a runtime value
    pub declares_value: bool,
}

/// Direction of a module reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Import,
    SideEffect,
    ExportFrom,
}

/// A module reference found in a top-level declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub specifier: String,
    pub span: Span,
    pub kind: ImportKind,
    pub type_only: bool,
}

impl ImportRef {
    /// Relative references start with a dot
    pub fn is_relative(&self) -> bool {
        self.specifier.starts_with('.')
    }
}

/// Names a module makes visible to importers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSurface {
    pub values: BTreeSet<String>,
    pub types: BTreeSet<String>,
    pub has_default: bool,
    /// Re-exports or `export =` make the full list unknowable
    pub open: bool,
}

impl ExportSurface {
    pub fn contains(&self, name: &str) -> bool {
        self.open || self.values.contains(name) || self.types.contains(name)
    }

    /// Only known as a type
    pub fn is_type_only(&self, name: &str) -> bool {
        !self.open && self.types.contains(name) && !self.values.contains(name)
    }
}

/// Top-level module structure of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSyntax {
    pub imports: Vec<ImportDecl>,
    pub exports: Vec<ExportDecl>,
    pub erased: Vec<ErasedDecl>,
    /// Lone TypeScript modifiers (`abstract`) to strip
    pub modifiers: Vec<Span>,
    /// `declare module "x" { ... }` blocks
    pub ambient_modules: Vec<String>,
    /// Name from a `///<amd-module name='...'/>` header
    pub amd_name: Option<String>,
}

const DECLARE_KINDS: [&str; 13] = [
    "const",
    "let",
    "var",
    "function",
    "class",
    "abstract",
    "enum",
    "module",
    "namespace",
    "global",
    "type",
    "interface",
    "async",
];

impl ModuleSyntax {
    /// Scan a source text
    pub fn parse(source: &str) -> Self {
        let tokens = tokenize(source);
        let parser = SyntaxParser::new(source, &tokens);
        let mut syntax = parser.run();
        syntax.amd_name = amd_module_name(source);
        syntax
    }

    /// Every module reference in source order
    pub fn module_refs(&self) -> Vec<ImportRef> {
        let mut refs: Vec<ImportRef> = self
            .imports
            .iter()
            .map(|decl| ImportRef {
                specifier: decl.source.text.clone(),
                span: decl.source.span,
                kind: match decl.clause {
                    ImportClause::SideEffect => ImportKind::SideEffect,
                    _ => ImportKind::Import,
                },
                type_only: decl.type_only,
            })
            .collect();
        for export in &self.exports {
            if let Some(source) = export.source() {
                let type_only = matches!(
                    export,
                    ExportDecl::Named { type_only: true, .. } | ExportDecl::Star { type_only: true, .. }
                );
                refs.push(ImportRef {
                    specifier: source.text.clone(),
                    span: source.span,
                    kind: ImportKind::ExportFrom,
                    type_only,
                });
            }
        }
        refs.sort_by_key(|r| r.span.start);
        refs
    }

    /// Names exported by this module
    pub fn surface(&self) -> ExportSurface {
        let mut surface = ExportSurface {
            open: !self.ambient_modules.is_empty(),
            ..Default::default()
        };
        for export in &self.exports {
            match export {
                ExportDecl::Named {
                    bindings,
                    type_only,
                    ..
                } => {
                    for binding in bindings {
                        if binding.local == "default" {
                            surface.has_default = true;
                        } else if *type_only || binding.type_only {
                            surface.types.insert(binding.local.clone());
                        } else {
                            surface.values.insert(binding.local.clone());
                        }
                    }
                }
                ExportDecl::Star { alias: Some(alias), .. } => {
                    surface.values.insert(alias.clone());
                }
                ExportDecl::Star { alias: None, .. } | ExportDecl::Assignment { .. } => {
                    surface.open = true;
                }
                ExportDecl::Default { .. } => surface.has_default = true,
                ExportDecl::Declaration { names, .. } => {
                    surface.values.extend(names.iter().cloned());
                }
            }
        }
        for decl in self.erased.iter().filter(|d| d.exported) {
            let target = if decl.declares_value {
                &mut surface.values
            } else {
                &mut surface.types
            };
            target.extend(decl.names.iter().cloned());
        }
        surface
    }

    /// Names declared by type-only statements of this file
    pub fn local_types(&self) -> BTreeSet<String> {
        self.erased
            .iter()
            .filter(|d| !d.declares_value)
            .flat_map(|d| d.names.iter().cloned())
            .collect()
    }
}

/// Extract the name from a leading `///<amd-module name='x'/>` directive
pub fn amd_module_name(source: &str) -> Option<String> {
    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !trimmed.starts_with("///") {
            return None;
        }
        let Some(directive) = trimmed.find("<amd-module") else {
            continue;
        };
        let rest = &trimmed[directive..];
        let name_at = rest.find("name=")? + "name=".len();
        let rest = &rest[name_at..];
        let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
        let value = &rest[1..];
        let close = value.find(quote)?;
        return Some(value[..close].to_string());
    }
    None
}

struct SyntaxParser<'a> {
    tree: TokenTree<'a>,
}

impl<'a> Deref for SyntaxParser<'a> {
    type Target = TokenTree<'a>;

    fn deref(&self) -> &Self::Target {
        &self.tree
    }
}

impl<'a> SyntaxParser<'a> {
    fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            tree: TokenTree::new(source, tokens),
        }
    }

    fn specifier(&self, i: usize) -> Specifier {
        let token = self.tokens[i];
        Specifier {
            text: string_value(token.text(self.source)),
            span: Span::new(token.start, token.end),
        }
    }

    fn is_statement_start(&self, i: usize) -> bool {
        if self.depth[i] != 0 {
            return false;
        }
        i == 0 || self.tokens[i].newline_before || matches!(self.text(i - 1), ";" | "}")
    }

    /// Parse `{ a, b as c, type d }` starting at the opening brace
    fn named_bindings(&self, open: usize) -> Option<(Vec<NamedBinding>, usize)> {
        let close = self.matching[open]?;
        let mut bindings = Vec::new();
        let mut j = open + 1;
        while j < close {
            if self.is(j, ",") {
                j += 1;
                continue;
            }
            let mut type_only = false;
            if self.is(j, "type")
                && (self.is_ident(j + 1) || self.is_string(j + 1))
                && !self.is(j + 1, "as")
            {
                type_only = true;
                j += 1;
            }
            let imported = if self.is_string(j) {
                string_value(self.text(j))
            } else {
                self.text(j).to_string()
            };
            j += 1;
            let mut local = imported.clone();
            if self.is(j, "as") {
                local = if self.is_string(j + 1) {
                    string_value(self.text(j + 1))
                } else {
                    self.text(j + 1).to_string()
                };
                j += 2;
            }
            bindings.push(NamedBinding {
                imported,
                local,
                type_only,
            });
        }
        Some((bindings, close))
    }

    fn parse_import(&self, i: usize) -> Option<(ImportDecl, usize)> {
        let mut j = i + 1;
        if matches!(self.text(j), "(" | ".") {
            return None;
        }
        let mut type_only = false;
        if self.is(j, "type")
            && !(self.is(j + 1, "from") && self.is_string(j + 2))
            && (self.is_ident(j + 1) || matches!(self.text(j + 1), "{" | "*"))
        {
            type_only = true;
            j += 1;
        }

        if self.is_string(j) {
            let last = self.finish(j);
            let decl = ImportDecl {
                span: self.span(i, last),
                source: self.specifier(j),
                clause: ImportClause::SideEffect,
                type_only,
            };
            return Some((decl, last + 1));
        }

        if self.is_ident(j) && self.is(j + 1, "=") {
            let local = self.text(j).to_string();
            if self.is(j + 2, "require") && self.is(j + 3, "(") && self.is_string(j + 4) {
                let last = self.finish(j + 5);
                let decl = ImportDecl {
                    span: self.span(i, last),
                    source: self.specifier(j + 4),
                    clause: ImportClause::Equals(local),
                    type_only,
                };
                return Some((decl, last + 1));
            }
            return None;
        }

        let mut default = None;
        let mut namespace = None;
        let mut named = Vec::new();
        if self.is_ident(j) && !(self.is(j, "from") && self.is_string(j + 1)) {
            default = Some(self.text(j).to_string());
            j += 1;
            if self.is(j, ",") {
                j += 1;
            }
        }
        if self.is(j, "*") && self.is(j + 1, "as") && self.is_ident(j + 2) {
            namespace = Some(self.text(j + 2).to_string());
            j += 3;
        } else if self.is(j, "{") {
            let (bindings, close) = self.named_bindings(j)?;
            named = bindings;
            j = close + 1;
        }
        if !(self.is(j, "from") && self.is_string(j + 1)) {
            return None;
        }
        let last = self.finish(j + 1);
        let decl = ImportDecl {
            span: self.span(i, last),
            source: self.specifier(j + 1),
            clause: ImportClause::Bindings {
                default,
                namespace,
                named,
            },
            type_only,
        };
        Some((decl, last + 1))
    }

    /// `interface X`, `type X =`, `declare ...` starting at `j`; the
    /// statement itself starts at `start` (which may be an `export`)
    fn parse_erased(&self, start: usize, j: usize, exported: bool) -> Option<(ErasedDecl, usize)> {
        let (end, names, declares_value) = match self.text(j) {
            "interface" if self.is_ident(j + 1) => {
                (self.block_end(j), vec![self.text(j + 1).to_string()], false)
            }
            "type" if self.is_ident(j + 1) && matches!(self.text(j + 2), "=" | "<") => {
                (self.statement_end(j), vec![self.text(j + 1).to_string()], false)
            }
            "declare" if DECLARE_KINDS.contains(&self.text(j + 1)) => {
                let kind_at = j + 1;
                match self.text(kind_at) {
                    "const" | "let" | "var" if !self.is(kind_at + 1, "enum") => {
                        let end = self.statement_end(j);
                        (end, self.declarator_names(kind_at + 1, end), true)
                    }
                    "type" | "interface" => return self.parse_erased(start, kind_at, exported),
                    "function" | "async" => {
                        let end = self.statement_end(j);
                        (end, self.declared_name(kind_at).into_iter().collect(), true)
                    }
                    "global" => (self.block_end(j), Vec::new(), false),
                    "module" if self.is_string(kind_at + 1) => {
                        (self.block_end(j), Vec::new(), false)
                    }
                    _ => (
                        self.block_end(j),
                        self.declared_name(kind_at).into_iter().collect(),
                        true,
                    ),
                }
            }
            _ => return None,
        };
        let end = end.max(j + 1);
        let decl = ErasedDecl {
            span: self.span(start, end - 1),
            names,
            exported,
            declares_value,
        };
        Some((decl, end))
    }

    fn parse_export(&self, i: usize, syntax: &mut ModuleSyntax) -> Option<usize> {
        let j = i + 1;
        match self.text(j) {
            "type" if self.is(j + 1, "{") => {
                let (bindings, close) = self.named_bindings(j + 1)?;
                self.finish_named(i, close, bindings, true, syntax)
            }
            "type" if self.is(j + 1, "*") => self.parse_star(i, j + 1, true, syntax),
            "{" => {
                let (bindings, close) = self.named_bindings(j)?;
                self.finish_named(i, close, bindings, false, syntax)
            }
            "*" => self.parse_star(i, j, false, syntax),
            "interface" | "type" | "declare" => {
                let (decl, end) = self.parse_erased(i, j, true)?;
                syntax.erased.push(decl);
                Some(end)
            }
            "=" => {
                syntax.exports.push(ExportDecl::Assignment {
                    prefix: self.span(i, j),
                });
                Some(j + 1)
            }
            "default" => {
                let mut k = j + 1;
                if self.is(k, "abstract") && self.is(k + 1, "class") {
                    syntax.modifiers.push(self.span(k, k));
                    k += 1;
                }
                let target = match self.text(k) {
                    "async" if self.is(k + 1, "function") => {
                        DefaultTarget::Function(self.declared_name(k))
                    }
                    "function" => DefaultTarget::Function(self.declared_name(k)),
                    "class" => {
                        let named = self.is_ident(k + 1)
                            && !matches!(self.text(k + 1), "extends" | "implements");
                        DefaultTarget::Class(named.then(|| self.text(k + 1).to_string()))
                    }
                    "interface" if self.is_ident(k + 1) => {
                        let (decl, end) = self.parse_erased(i, k, true)?;
                        syntax.erased.push(decl);
                        return Some(end);
                    }
                    _ => DefaultTarget::Expression,
                };
                syntax.exports.push(ExportDecl::Default {
                    prefix: self.span(i, j),
                    target,
                });
                Some(k)
            }
            "abstract" if self.is(j + 1, "class") => {
                syntax.modifiers.push(self.span(j, j));
                self.push_declaration(i, j + 1, DeclKind::Class, syntax)
            }
            "async" | "function" => self.push_declaration(i, j, DeclKind::Function, syntax),
            "class" => self.push_declaration(i, j, DeclKind::Class, syntax),
            "enum" => self.push_declaration(i, j, DeclKind::Enum, syntax),
            "const" if self.is(j + 1, "enum") => {
                self.push_declaration(i, j, DeclKind::Enum, syntax)
            }
            "namespace" | "module" if self.is_ident(j + 1) => {
                self.push_declaration(i, j, DeclKind::Namespace, syntax)
            }
            "const" | "let" | "var" => {
                let end = self.statement_end(j);
                let names = self.declarator_names(j + 1, end);
                syntax.exports.push(ExportDecl::Declaration {
                    prefix: self.span(i, i),
                    kind: DeclKind::Variable,
                    names,
                });
                Some(j + 1)
            }
            _ => None,
        }
    }

    fn push_declaration(
        &self,
        i: usize,
        j: usize,
        kind: DeclKind,
        syntax: &mut ModuleSyntax,
    ) -> Option<usize> {
        let name = self.declared_name(j)?;
        syntax.exports.push(ExportDecl::Declaration {
            prefix: self.span(i, i),
            kind,
            names: vec![name],
        });
        Some(j + 1)
    }

    fn finish_named(
        &self,
        i: usize,
        close: usize,
        bindings: Vec<NamedBinding>,
        type_only: bool,
        syntax: &mut ModuleSyntax,
    ) -> Option<usize> {
        let (source, last) = if self.is(close + 1, "from") && self.is_string(close + 2) {
            (Some(self.specifier(close + 2)), self.finish(close + 2))
        } else {
            (None, self.finish(close))
        };
        syntax.exports.push(ExportDecl::Named {
            span: self.span(i, last),
            bindings,
            source,
            type_only,
        });
        Some(last + 1)
    }

    fn parse_star(
        &self,
        i: usize,
        star: usize,
        type_only: bool,
        syntax: &mut ModuleSyntax,
    ) -> Option<usize> {
        let mut k = star + 1;
        let mut alias = None;
        if self.is(k, "as") && (self.is_ident(k + 1) || self.is_string(k + 1)) {
            alias = Some(if self.is_string(k + 1) {
                string_value(self.text(k + 1))
            } else {
                self.text(k + 1).to_string()
            });
            k += 2;
        }
        if !(self.is(k, "from") && self.is_string(k + 1)) {
            return None;
        }
        let last = self.finish(k + 1);
        syntax.exports.push(ExportDecl::Star {
            span: self.span(i, last),
            source: self.specifier(k + 1),
            alias,
            type_only,
        });
        Some(last + 1)
    }

    fn run(&self) -> ModuleSyntax {
        let mut syntax = ModuleSyntax::default();
        let mut i = 0;
        while i < self.tokens.len() {
            if !self.is_statement_start(i) || !self.is_ident(i) {
                i += 1;
                continue;
            }
            let next = match self.text(i) {
                "import" => self.parse_import(i).map(|(decl, next)| {
                    syntax.imports.push(decl);
                    next
                }),
                "export" => self.parse_export(i, &mut syntax),
                "interface" | "type" | "declare" => {
                    self.parse_erased(i, i, false).map(|(decl, next)| {
                        if self.is(i, "declare")
                            && self.is(i + 1, "module")
                            && self.is_string(i + 2)
                        {
                            syntax
                                .ambient_modules
                                .push(string_value(self.text(i + 2)));
                        }
                        syntax.erased.push(decl);
                        next
                    })
                }
                "abstract" if self.is(i + 1, "class") => {
                    syntax.modifiers.push(self.span(i, i));
                    Some(i + 1)
                }
                _ => None,
            };
            i = next.unwrap_or(i + 1);
        }
        syntax
    }
}
