//! Module emission
//!
//! Rewrites one source file into an AMD `define` call and, for the
//! declaration pass, into an ambient `declare module` block.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::host::HostSourceFile;
use crate::scan::{
    tokenize, DeclKind, DefaultTarget, ExportDecl, ExportSurface, ImportClause, ImportDecl,
    ModuleSyntax, NamedBinding, Span, Token, TokenKind,
};
use crate::store::strip_source_suffix;

use super::bindings::{Bindings, Scope, TopLevel};
use super::decorate::{scan_decorators, DecoratedClass, Decorator, DecoratorScan, Helpers, ParamDecorators};
use super::erase::{apply_edits, blank, erase_types, Edit};

/// Where an import specifier of a file points
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    /// Dependency name written into the `define` call
    pub module: String,
    /// Names the target exports
    pub surface: ExportSurface,
}

/// A `define` call and the helpers its body calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmittedModule {
    pub text: String,
    pub helpers: Helpers,
}

/// AMD name of a source file: its `amd-module` directive, or its logical
/// path without suffix
pub fn module_name(file: &HostSourceFile) -> String {
    if let Some(name) = &file.syntax().amd_name {
        return name.clone();
    }
    let name = &file.file_name;
    if let Some(stem) = name.strip_suffix(".d.ts") {
        return stem.to_string();
    }
    [".json", ".js"]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or_else(|| strip_source_suffix(name))
        .to_string()
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// `object.name`, or `object["name"]` when `name` is not an identifier
fn member(object: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, quote(name))
    }
}

fn getter(exported: &str, access: &str) -> String {
    format!(
        "Object.defineProperty(exports, {}, {{ enumerable: true, get: function () {{ return {}; }} }});",
        quote(exported),
        access
    )
}

/// Parameter stem for a dependency: its last path segment as an identifier
fn parameter_stem(module: &str) -> String {
    let segment = module.rsplit('/').next().unwrap_or(module);
    let mut stem: String = segment
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        stem.push_str("module");
    }
    if stem.starts_with(|c: char| c.is_ascii_digit()) {
        stem.insert(0, '_');
    }
    stem
}

#[derive(Debug)]
struct Dependency {
    module: String,
    param: Option<String>,
}

struct ModuleEmitter<'a> {
    source: &'a str,
    tokens: &'a [Token],
    syntax: &'a ModuleSyntax,
    links: &'a HashMap<String, Link>,
    scope: Scope<'a>,
    /// Declarations per name anywhere in the file
    declared: HashMap<String, usize>,
    bindings: Bindings,
    /// Locals bound by import statements
    imported: HashSet<String>,
    decorators: DecoratorScan,
    /// Reference edits inside decorator expressions
    decorator_refs: Vec<Edit>,
    helpers: Helpers,
    edits: Vec<Edit>,
    skip: Vec<Span>,
    /// Statement ends that already carry a separator
    terminated: HashSet<usize>,
    deps: Vec<Dependency>,
    /// Identifiers of the file plus generated parameters
    taken: HashSet<String>,
    /// Identifiers referenced outside import statements
    used: HashSet<String>,
    /// Locals that only name types
    type_locals: HashSet<String>,
    hoisted: Vec<String>,
    trailing: Vec<String>,
    export_assignment: bool,
}

impl<'a> ModuleEmitter<'a> {
    fn new(
        source: &'a str,
        tokens: &'a [Token],
        syntax: &'a ModuleSyntax,
        links: &'a HashMap<String, Link>,
    ) -> Self {
        let imports: Vec<Span> = syntax.imports.iter().map(|d| d.span).collect();
        let inside_import = |at: usize| imports.iter().any(|s| s.start <= at && at < s.end);

        let mut taken = HashSet::new();
        let mut used = HashSet::new();
        for (i, token) in tokens.iter().enumerate() {
            if token.kind != TokenKind::Ident {
                continue;
            }
            let text = token.text(source);
            taken.insert(text.to_string());
            let is_member = i > 0
                && tokens[i - 1].text(source) == "."
                && !(i > 1 && tokens[i - 2].text(source) == ".");
            if !is_member && !inside_import(token.start) {
                used.insert(text.to_string());
            }
        }

        let scope = Scope::new(source, tokens);
        let declared = scope.declared_names();
        let decorators = scan_decorators(&scope);
        Self {
            source,
            tokens,
            syntax,
            links,
            scope,
            declared,
            bindings: Bindings::default(),
            imported: HashSet::new(),
            decorators,
            decorator_refs: Vec::new(),
            helpers: Helpers::default(),
            edits: Vec::new(),
            skip: Vec::new(),
            terminated: HashSet::new(),
            deps: Vec::new(),
            taken,
            used,
            type_locals: syntax.local_types().into_iter().collect(),
            hoisted: Vec::new(),
            trailing: Vec::new(),
            export_assignment: false,
        }
    }

    /// `span` extended over the whitespace that follows it
    fn through_space(&self, span: Span) -> Span {
        let next = self.tokens.partition_point(|t| t.start < span.end);
        match self.tokens.get(next) {
            Some(token) => Span::new(span.start, token.start),
            None => span,
        }
    }

    fn replace(&mut self, span: Span, text: String) {
        self.skip.push(span);
        let kept_lines = blank(&self.source[span.start..span.end]);
        self.edits.push(Edit::replace(span, text + &kept_lines));
    }

    fn drop_span(&mut self, span: Span) {
        self.replace(span, String::new());
    }

    /// Run `line` right after the statement ending before token `end`
    fn after(&mut self, end: usize, line: &str) {
        let at = self.tokens[end - 1].end;
        let separator = if self.scope.is(end - 1, ";") || !self.terminated.insert(end) {
            " "
        } else {
            "; "
        };
        self.edits.push(Edit::insert(at, format!("{}{}", separator, line)));
    }

    fn dependency(&mut self, module: &str) {
        if !self.deps.iter().any(|d| d.module == module) {
            self.deps.push(Dependency {
                module: module.to_string(),
                param: None,
            });
        }
    }

    /// Parameter bound to `module` in the factory function
    fn param(&mut self, module: &str) -> String {
        self.dependency(module);
        let existing = self
            .deps
            .iter()
            .find(|d| d.module == module)
            .and_then(|d| d.param.clone());
        if let Some(param) = existing {
            return param;
        }
        let stem = parameter_stem(module);
        let mut n = 1;
        let param = loop {
            let candidate = format!("{}_{}", stem, n);
            if !self.taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        self.taken.insert(param.clone());
        if let Some(dep) = self.deps.iter_mut().find(|d| d.module == module) {
            dep.param = Some(param.clone());
        }
        param
    }

    fn target(&self, specifier: &str) -> (String, Option<&'a ExportSurface>) {
        match self.links.get(specifier) {
            Some(link) => (link.module.clone(), Some(&link.surface)),
            None => (specifier.to_string(), None),
        }
    }

    /// A local declared again somewhere in the file keeps a snapshot
    fn is_shadowed(&self, local: &str) -> bool {
        self.declared.get(local).is_some_and(|n| *n > 0)
    }

    /// Read `local` through `access`, or bind a snapshot in `statements`
    /// when an inner declaration shadows it
    fn bind_import(&mut self, local: &str, access: String, statements: &mut Vec<String>) {
        if self.is_shadowed(local) {
            statements.push(format!("const {} = {};", local, access));
        } else {
            self.bindings.insert(local, access);
            self.imported.insert(local.to_string());
        }
    }

    fn import(&mut self, decl: &ImportDecl) {
        let (module, surface) = self.target(&decl.source.text);
        if decl.type_only {
            for local in binding_locals(&decl.clause) {
                self.type_locals.insert(local);
            }
            self.drop_span(decl.span);
            return;
        }
        let text = match &decl.clause {
            ImportClause::SideEffect => {
                self.dependency(&module);
                String::new()
            }
            ImportClause::Equals(local) => {
                if self.used.contains(local) {
                    format!("const {} = {};", local, self.param(&module))
                } else {
                    String::new()
                }
            }
            ImportClause::Bindings {
                default,
                namespace,
                named,
            } => {
                let default = default.as_ref().filter(|d| self.used.contains(d.as_str()));
                let namespace = namespace.as_ref().filter(|n| self.used.contains(n.as_str()));
                let mut kept: Vec<&NamedBinding> = Vec::new();
                for binding in named {
                    let is_type = binding.type_only
                        || surface.is_some_and(|s| s.is_type_only(&binding.imported));
                    if is_type {
                        self.type_locals.insert(binding.local.clone());
                    } else if self.used.contains(&binding.local) {
                        kept.push(binding);
                    }
                }
                if default.is_none() && namespace.is_none() && kept.is_empty() {
                    String::new()
                } else {
                    let param = self.param(&module);
                    let mut statements = Vec::new();
                    if let Some(local) = default {
                        self.bind_import(local, member(&param, "default"), &mut statements);
                    }
                    if let Some(local) = namespace {
                        statements.push(format!("const {} = {};", local, param));
                    }
                    let mut snapshot = Vec::new();
                    for binding in kept {
                        if self.is_shadowed(&binding.local) {
                            snapshot.push(binding);
                        } else {
                            self.bind_import(&binding.local, member(&param, &binding.imported), &mut statements);
                        }
                    }
                    if !snapshot.is_empty() {
                        let fields: Vec<String> = snapshot
                            .iter()
                            .map(|b| match (b.imported == b.local, is_identifier(&b.imported)) {
                                (true, _) => b.local.clone(),
                                (false, true) => format!("{}: {}", b.imported, b.local),
                                (false, false) => format!("{}: {}", quote(&b.imported), b.local),
                            })
                            .collect();
                        statements.push(format!("const {{ {} }} = {};", fields.join(", "), param));
                    }
                    statements.join(" ")
                }
            }
        };
        self.replace(decl.span, text);
    }

    /// Keep `exports.<exported>` equal to the local binding `local`
    fn export_local(&mut self, exported: &str, local: &str) {
        let target = member("exports", exported);
        if let Some(access) = self.bindings.get(local) {
            if access != target {
                let line = getter(exported, access);
                push_unique(&mut self.hoisted, line);
            }
            return;
        }
        let line = format!("{} = {};", target, local);
        match self.scope.top_level(local) {
            Some(TopLevel::Function) => push_unique(&mut self.hoisted, line),
            Some(TopLevel::Statement(end)) if !self.imported.contains(local) => self.after(end, &line),
            _ => push_unique(&mut self.trailing, line),
        }
    }

    /// Name tokens of `a = 1, b` and whether each has an initializer;
    /// `None` when a declarator is a pattern
    fn simple_declarators(&self, mut j: usize, end: usize) -> Option<Vec<(usize, bool)>> {
        let scope = &self.scope;
        let base = scope.depth.get(j).copied()?;
        let mut out = Vec::new();
        while j < end {
            if !scope.is_ident(j) {
                return None;
            }
            let name = j;
            let mut initialized = false;
            while j < end && !(scope.is(j, ",") && scope.depth[j] == base) {
                if scope.is(j, "=") && scope.depth[j] == base && !scope.is_arrow(j) && !scope.is(j + 1, "=") {
                    initialized = true;
                }
                j += 1;
            }
            out.push((name, initialized));
            j += 1;
        }
        Some(out)
    }

    /// `export let|const|var`: each name becomes a property of `exports`
    /// when it is a plain identifier declared once, otherwise it is copied
    /// after the statement
    fn export_variables(&mut self, prefix: Span, names: &[String]) {
        let keyword = self.tokens.partition_point(|t| t.start < prefix.end);
        if !matches!(self.scope.text(keyword), "let" | "const" | "var") {
            for name in names {
                self.export_local(name, name);
            }
            return;
        }
        let end = self.scope.statement_end(keyword);
        let declarators = self.simple_declarators(keyword + 1, end).filter(|found| {
            found.len() == names.len()
                && found.iter().all(|(at, _)| {
                    let name = self.scope.text(*at);
                    names.iter().any(|n| n == name) && self.declared.get(name) == Some(&1)
                })
        });
        let Some(declarators) = declarators else {
            let line = names
                .iter()
                .map(|name| format!("{} = {};", member("exports", name), name))
                .collect::<Vec<_>>()
                .join(" ");
            self.after(end, &line);
            return;
        };
        // left out of `skip` so the eraser still strips the annotations
        let keyword_span = Span::new(self.tokens[keyword].start, self.tokens[keyword + 1].start);
        self.edits.push(Edit::replace(keyword_span, String::new()));
        for (at, initialized) in declarators {
            let token = self.tokens[at];
            let access = member("exports", token.text(self.source));
            let text = if initialized {
                access.clone()
            } else {
                format!("{} = void 0", access)
            };
            self.edits.push(Edit::replace(Span::new(token.start, token.end), text));
            self.bindings.insert(token.text(self.source), access);
        }
    }

    fn declaration(&mut self, prefix: Span, kind: DeclKind, names: &[String]) {
        self.drop_span(self.through_space(prefix));
        match kind {
            DeclKind::Function => {
                for name in names {
                    push_unique(&mut self.hoisted, format!("{} = {};", member("exports", name), name));
                }
            }
            DeclKind::Variable => self.export_variables(prefix, names),
            _ => {
                for name in names {
                    self.export_local(name, name);
                }
            }
        }
    }

    fn export(&mut self, export: &ExportDecl) {
        match export {
            ExportDecl::Named {
                span,
                bindings,
                source: None,
                type_only,
            } => {
                self.drop_span(*span);
                if *type_only {
                    return;
                }
                for binding in bindings {
                    if binding.type_only || self.type_locals.contains(&binding.imported) {
                        continue;
                    }
                    self.export_local(&binding.local, &binding.imported);
                }
            }
            ExportDecl::Named {
                span,
                bindings,
                source: Some(source),
                type_only,
            } => {
                let (module, surface) = self.target(&source.text);
                let kept: Vec<&NamedBinding> = bindings
                    .iter()
                    .filter(|b| !*type_only && !b.type_only)
                    .filter(|b| !surface.is_some_and(|s| s.is_type_only(&b.imported)))
                    .collect();
                if kept.is_empty() {
                    self.drop_span(*span);
                    return;
                }
                let param = self.param(&module);
                let text = kept
                    .iter()
                    .map(|b| getter(&b.local, &member(&param, &b.imported)))
                    .collect::<Vec<_>>()
                    .join(" ");
                self.replace(*span, text);
            }
            ExportDecl::Star {
                span,
                source,
                alias,
                type_only,
            } => {
                if *type_only {
                    self.drop_span(*span);
                    return;
                }
                let (module, _) = self.target(&source.text);
                let param = self.param(&module);
                let text = match alias {
                    Some(alias) => format!("{} = {};", member("exports", alias), param),
                    None => format!(
                        "for (const k in {0}) if (k !== \"default\" && !Object.prototype.hasOwnProperty.call(exports, k)) exports[k] = {0}[k];",
                        param
                    ),
                };
                self.replace(*span, text);
            }
            ExportDecl::Default { prefix, target } => match target {
                DefaultTarget::Function(Some(name)) => {
                    self.drop_span(self.through_space(*prefix));
                    push_unique(&mut self.hoisted, format!("exports.default = {};", name));
                }
                DefaultTarget::Class(Some(name)) => {
                    self.drop_span(self.through_space(*prefix));
                    self.export_local("default", name);
                }
                DefaultTarget::Class(None) if self.decorators.classes.iter().any(|c| c.name.is_none()) => {
                    // the lowered class assigns `exports.default` itself
                    self.drop_span(self.through_space(*prefix));
                }
                _ => self.replace(*prefix, String::from("exports.default =")),
            },
            ExportDecl::Declaration { .. } => {}
            ExportDecl::Assignment { prefix } => {
                self.export_assignment = true;
                self.replace(*prefix, String::from("return"));
            }
        }
    }

    /// Decorator expression with imported names rewritten and type
    /// arguments dropped
    fn decorator_text(&self, decorator: &Decorator) -> String {
        let span = decorator.expression;
        let shift = |s: Span| Span::new(s.start - span.start, s.end - span.start);
        let mut edits: Vec<Edit> = self
            .decorator_refs
            .iter()
            .filter(|e| e.span.start >= span.start && e.span.end <= span.end)
            .map(|e| Edit::replace(shift(e.span), e.text.clone()))
            .collect();
        if let Some(arguments) = decorator.type_arguments {
            edits.push(Edit::replace(shift(arguments), String::new()));
        }
        apply_edits(&self.source[span.start..span.end], edits)
    }

    fn decorator_list(&self, decorators: &[Decorator], params: &[ParamDecorators]) -> String {
        let mut items: Vec<String> = decorators.iter().map(|d| self.decorator_text(d)).collect();
        for param in params {
            for decorator in &param.decorators {
                items.push(format!("__param({}, {})", param.index, self.decorator_text(decorator)));
            }
        }
        items.join(", ")
    }

    /// Declare `class` undecorated and apply its decorators after the body
    fn lower_class(&mut self, class: &DecoratedClass) {
        let name = class.name.clone().unwrap_or_else(|| String::from("default_1"));
        let mut statements = Vec::new();
        for m in &class.members {
            let target = if m.is_static {
                name.clone()
            } else {
                format!("{}.prototype", name)
            };
            let descriptor = if m.has_descriptor { "null" } else { "void 0" };
            statements.push(format!(
                "__decorate([{}], {}, {}, {});",
                self.decorator_list(&m.decorators, &m.params),
                target,
                m.key,
                descriptor
            ));
        }
        if class.rebinds() || class.name.is_none() {
            let at = self.tokens[class.keyword].start;
            self.edits.push(Edit::insert(at, format!("let {} = ", name)));
        }
        if class.rebinds() {
            statements.push(format!(
                "{0} = __decorate([{1}], {0});",
                name,
                self.decorator_list(&class.decorators, &class.constructor_params)
            ));
        }
        if class.name.is_none() {
            statements.push(String::from("exports.default = default_1;"));
        }
        self.helpers.decorate = true;
        self.helpers.param |= class.has_params();
        self.after(class.end, &statements.join(" "));
    }

    fn rewrite(&mut self) {
        let syntax = self.syntax;
        for decl in &syntax.imports {
            self.import(decl);
        }
        // variables first: decorator arguments may read them
        for export in &syntax.exports {
            if let ExportDecl::Declaration {
                prefix,
                kind: DeclKind::Variable,
                names,
            } = export
            {
                self.declaration(*prefix, DeclKind::Variable, names);
            }
        }
        if !self.decorators.classes.is_empty() {
            self.decorator_refs = self.scope.reference_edits(&self.bindings, &self.skip);
            let classes = std::mem::take(&mut self.decorators.classes);
            for class in &classes {
                self.lower_class(class);
            }
            self.decorators.classes = classes;
        }
        for export in &syntax.exports {
            match export {
                ExportDecl::Declaration {
                    kind: DeclKind::Variable,
                    ..
                } => {}
                ExportDecl::Declaration { prefix, kind, names } => self.declaration(*prefix, *kind, names),
                other => self.export(other),
            }
        }
        for decl in &syntax.erased {
            self.drop_span(decl.span);
        }
        for modifier in &syntax.modifiers {
            self.drop_span(self.through_space(*modifier));
        }
    }

    fn render(mut self, module: &str, strict: bool) -> EmittedModule {
        self.rewrite();
        let mut edits = erase_types(self.source, self.tokens, self.skip.clone());
        let mut excluded = self.skip.clone();
        excluded.extend(edits.iter().filter(|e| e.span.start < e.span.end).map(|e| e.span));
        edits.extend(self.scope.reference_edits(&self.bindings, &excluded));
        edits.append(&mut self.edits);
        let body = apply_edits(self.source, edits);

        let mut names = vec![quote("require"), quote("exports")];
        let mut params = vec![String::from("require"), String::from("exports")];
        for dep in self.deps.iter().filter(|d| d.param.is_some()) {
            names.push(quote(&dep.module));
            params.extend(dep.param.clone());
        }
        for dep in self.deps.iter().filter(|d| d.param.is_none()) {
            names.push(quote(&dep.module));
        }

        let mut out = format!(
            "define({}, [{}], function ({}) {{\n",
            quote(module),
            names.join(", "),
            params.join(", ")
        );
        if strict {
            out.push_str("    \"use strict\";\n");
        }
        if !self.export_assignment {
            out.push_str("    Object.defineProperty(exports, \"__esModule\", { value: true });\n");
        }
        for line in &self.hoisted {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(body.trim_end());
        out.push('\n');
        for line in &self.trailing {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("});\n");
        EmittedModule {
            text: out,
            helpers: self.helpers,
        }
    }
}

fn push_unique(lines: &mut Vec<String>, line: String) {
    if !lines.contains(&line) {
        lines.push(line);
    }
}

fn binding_locals(clause: &ImportClause) -> Vec<String> {
    match clause {
        ImportClause::SideEffect => Vec::new(),
        ImportClause::Equals(local) => vec![local.clone()],
        ImportClause::Bindings {
            default,
            namespace,
            named,
        } => default
            .iter()
            .chain(namespace.iter())
            .cloned()
            .chain(named.iter().map(|b| b.local.clone()))
            .collect(),
    }
}

/// AMD `define` call for one source file
pub fn emit_module(
    file: &HostSourceFile,
    module: &str,
    links: &HashMap<String, Link>,
    strict: bool,
) -> EmittedModule {
    let tokens = tokenize(&file.text);
    ModuleEmitter::new(&file.text, &tokens, file.syntax(), links).render(module, strict)
}

/// AMD `define` call for a JSON file: its object properties become named
/// exports and the whole value the default export
pub fn emit_json_module(module: &str, value: &serde_json::Value, strict: bool) -> String {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| String::from("null"));
    let mut out = format!("define({}, [\"require\", \"exports\"], function (require, exports) {{\n", quote(module));
    if strict {
        out.push_str("    \"use strict\";\n");
    }
    out.push_str("    Object.defineProperty(exports, \"__esModule\", { value: true });\n");
    out.push_str("    const json = ");
    out.push_str(&json.replace('\n', "\n    "));
    out.push_str(";\n");
    if value.is_object() {
        out.push_str("    Object.assign(exports, json);\n");
    }
    out.push_str("    exports.default = json;\n});\n");
    out
}

fn binding_list(bindings: &[NamedBinding]) -> String {
    bindings
        .iter()
        .map(|b| {
            let prefix = if b.type_only { "type " } else { "" };
            if b.imported == b.local {
                format!("{}{}", prefix, b.imported)
            } else {
                format!("{}{} as {}", prefix, b.imported, b.local)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ambient `declare module` block describing one source file
///
/// Type declarations are copied; exported values are declared as `any`.
pub fn emit_declarations(file: &HostSourceFile, module: &str, links: &HashMap<String, Link>) -> String {
    let syntax = file.syntax();
    let text: &str = &file.text;
    let dep = |specifier: &str| {
        links
            .get(specifier)
            .map(|l| l.module.clone())
            .unwrap_or_else(|| specifier.to_string())
    };
    let mut lines: Vec<String> = Vec::new();

    for decl in &syntax.imports {
        let from = quote(&dep(&decl.source.text));
        let keyword = if decl.type_only { "import type" } else { "import" };
        match &decl.clause {
            ImportClause::SideEffect => {}
            ImportClause::Equals(local) => {
                lines.push(format!("import {} = require({});", local, from));
            }
            ImportClause::Bindings {
                default,
                namespace,
                named,
            } => {
                if let Some(local) = default {
                    lines.push(format!("{} {} from {};", keyword, local, from));
                }
                if let Some(local) = namespace {
                    lines.push(format!("{} * as {} from {};", keyword, local, from));
                }
                if !named.is_empty() {
                    lines.push(format!("{} {{ {} }} from {};", keyword, binding_list(named), from));
                }
            }
        }
    }

    for decl in &syntax.erased {
        let statement = text[decl.span.start..decl.span.end].trim();
        let (exported, rest) = match statement.strip_prefix("export ") {
            Some(rest) => (true, rest.trim_start()),
            None => (false, statement),
        };
        let rest = rest.strip_prefix("declare ").map(str::trim_start).unwrap_or(rest);
        if rest.starts_with("module ") || rest.starts_with("global") {
            continue;
        }
        let prefix = if exported { "export " } else { "" };
        lines.push(format!("{}{}", prefix, rest));
    }

    let local_types: BTreeSet<String> = syntax.local_types();
    for export in &syntax.exports {
        match export {
            ExportDecl::Declaration { kind, names, .. } => {
                for name in names {
                    lines.push(match kind {
                        DeclKind::Function => format!("export function {}(...args: any[]): any;", name),
                        DeclKind::Class => format!(
                            "export class {} {{ constructor(...args: any[]); [key: string]: any; }}",
                            name
                        ),
                        _ => format!("export const {}: any;", name),
                    });
                }
            }
            ExportDecl::Named {
                bindings,
                source: None,
                type_only,
                ..
            } => {
                for binding in bindings {
                    if *type_only || binding.type_only || local_types.contains(&binding.imported) {
                        lines.push(format!("export {{ {} as {} }};", binding.imported, binding.local));
                    } else if binding.local == "default" {
                        lines.push(String::from("const _default: any;"));
                        lines.push(String::from("export default _default;"));
                    } else {
                        lines.push(format!("export const {}: any;", binding.local));
                    }
                }
            }
            ExportDecl::Named {
                bindings,
                source: Some(source),
                type_only,
                ..
            } => {
                let keyword = if *type_only { "export type" } else { "export" };
                lines.push(format!(
                    "{} {{ {} }} from {};",
                    keyword,
                    binding_list(bindings),
                    quote(&dep(&source.text))
                ));
            }
            ExportDecl::Star { source, alias, .. } => {
                let from = quote(&dep(&source.text));
                lines.push(match alias {
                    Some(alias) => format!("export * as {} from {};", alias, from),
                    None => format!("export * from {};", from),
                });
            }
            ExportDecl::Default { .. } => {
                lines.push(String::from("const _default: any;"));
                lines.push(String::from("export default _default;"));
            }
            ExportDecl::Assignment { .. } => {
                lines.push(String::from("const _exported: any;"));
                lines.push(String::from("export = _exported;"));
            }
        }
    }

    let mut out = format!("declare module {} {{\n", quote(module));
    for line in lines {
        for part in line.lines() {
            out.push_str("    ");
            out.push_str(part);
            out.push('\n');
        }
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(path: &str, text: &str, links: &[(&str, &str, ExportSurface)]) -> String {
        emitted(path, text, links).text
    }

    fn emitted(path: &str, text: &str, links: &[(&str, &str, ExportSurface)]) -> EmittedModule {
        let file = HostSourceFile::new(path, text);
        let links: HashMap<String, Link> = links
            .iter()
            .map(|(specifier, module, surface)| {
                (
                    specifier.to_string(),
                    Link {
                        module: module.to_string(),
                        surface: surface.clone(),
                    },
                )
            })
            .collect();
        emit_module(&file, &module_name(&file), &links, true)
    }

    fn surface(values: &[&str], types: &[&str]) -> ExportSurface {
        ExportSurface {
            values: values.iter().map(|v| v.to_string()).collect(),
            types: types.iter().map(|t| t.to_string()).collect(),
            has_default: false,
            open: false,
        }
    }

    #[test]
    fn test_module_name() {
        assert_eq!(module_name(&HostSourceFile::new("lib/util.ts", "")), "lib/util");
        assert_eq!(module_name(&HostSourceFile::new("types.d.ts", "")), "types");
        let named = HostSourceFile::new("index.ts", "///<amd-module name='my-pack'/> \nexport const a = 1;");
        assert_eq!(module_name(&named), "my-pack");
        assert_eq!(module_name(&HostSourceFile::new("data/config.json", "{}")), "data/config");
    }

    #[test]
    fn test_parameter_stem() {
        assert_eq!(parameter_stem("./util"), "util");
        assert_eq!(parameter_stem("bignumber.js"), "bignumber_js");
        assert_eq!(parameter_stem("@ijstech/plugin"), "plugin");
        assert_eq!(parameter_stem("2d"), "_2d");
    }

    #[test]
    fn test_define_wraps_imports_and_exports() {
        let out = emit(
            "index.ts",
            "import { f } from './util';\nexport function main(): number { return f(); }\n",
            &[("./util", "util", surface(&["f"], &[]))],
        );
        assert!(out.starts_with(
            "define(\"index\", [\"require\", \"exports\", \"util\"], function (require, exports, util_1) {\n"
        ));
        assert!(out.contains("    \"use strict\";\n"));
        assert!(out.contains("    exports.main = main;\n"));
        assert!(!out.contains("const { f }"));
        assert!(out.contains("function main() { return (0, util_1.f)(); }"));
        assert!(out.ends_with("});\n"));
    }

    #[test]
    fn test_type_only_imports_are_elided() {
        let out = emit(
            "index.ts",
            "import { Options } from './types';\nimport type { Other } from './other';\nexport const x: Options = {};\n",
            &[
                ("./types", "types", surface(&[], &["Options"])),
                ("./other", "other", surface(&[], &["Other"])),
            ],
        );
        assert!(out.starts_with("define(\"index\", [\"require\", \"exports\"], function (require, exports) {"));
        assert!(out.contains("exports.x = {};"));
        assert!(!out.contains("exports.x = x;"));
        assert!(!out.contains("types"));
    }

    #[test]
    fn test_unused_imports_are_elided_but_side_effects_kept() {
        let out = emit(
            "index.ts",
            "import { unused } from './a';\nimport './polyfill';\nconsole.log(1);\n",
            &[("./a", "a", surface(&["unused"], &[])), ("./polyfill", "polyfill", surface(&[], &[]))],
        );
        assert!(out.starts_with(
            "define(\"index\", [\"require\", \"exports\", \"polyfill\"], function (require, exports) {"
        ));
    }

    #[test]
    fn test_default_and_namespace_imports() {
        let out = emit(
            "index.ts",
            "import BigNumber from 'bignumber.js';\nimport * as util from './util';\nexport default new BigNumber(util.x);\n",
            &[
                ("bignumber.js", "bignumber.js", ExportSurface { has_default: true, ..Default::default() }),
                ("./util", "util", surface(&["x"], &[])),
            ],
        );
        assert!(out.contains("function (require, exports, bignumber_js_1, util_1)"));
        assert!(!out.contains("const BigNumber"));
        assert!(out.contains("const util = util_1;"));
        assert!(out.contains("exports.default = new bignumber_js_1.default(util.x);"));
    }

    #[test]
    fn test_re_exports() {
        let out = emit(
            "index.ts",
            "export { a, b as c } from './lib';\nexport * from './more';\nexport * as ns from './ns';\n",
            &[
                ("./lib", "lib", surface(&["a", "b"], &[])),
                ("./more", "more", surface(&[], &[])),
                ("./ns", "ns", surface(&[], &[])),
            ],
        );
        assert!(out.contains(
            "Object.defineProperty(exports, \"a\", { enumerable: true, get: function () { return lib_1.a; } });"
        ));
        assert!(out.contains("return lib_1.b; }"));
        assert!(out.contains("for (const k in more_1) if (k !== \"default\""));
        assert!(out.contains("exports.ns = ns_1;"));
    }

    #[test]
    fn test_local_export_list_and_classes() {
        let out = emit(
            "index.ts",
            "interface Shape { w: number }\nclass Box { constructor(public w: number) {} }\nconst size = 1;\nexport { Box, size as default, Shape };\n",
            &[],
        );
        assert!(out.contains("class Box { constructor(w) { this.w = w; } }; exports.Box = Box;"));
        assert!(out.contains("const size = 1; exports.default = size;"));
        assert!(!out.contains("exports.Shape"));
        assert!(!out.contains("interface"));
    }

    #[test]
    fn test_exported_let_is_live() {
        let out = emit(
            "counter.ts",
            "export let count = 0;\nexport function inc(): void { count++; }\ninc(); inc();\nexport const seen = count;\n",
            &[],
        );
        assert!(out.contains("    exports.inc = inc;\n"));
        assert!(out.contains("exports.count = 0;"));
        assert!(out.contains("function inc() { exports.count++; }"));
        assert!(out.contains("exports.seen = exports.count;"));
        assert!(!out.contains("let count"));
        assert!(!out.contains("exports.count = count"));
    }

    #[test]
    fn test_imports_are_read_at_each_use() {
        let out = emit(
            "index.ts",
            "import { count, inc } from './counter';\ninc();\nexport const now = count;\n",
            &[("./counter", "counter", surface(&["count", "inc"], &[]))],
        );
        assert!(out.contains("(0, counter_1.inc)();"));
        assert!(out.contains("exports.now = counter_1.count;"));
    }

    #[test]
    fn test_cycle_reads_values_set_later() {
        let index = emit(
            "index.ts",
            "import { b } from './b';\nexport const a = 1;\nexport const viaB = b();\n",
            &[("./b", "b", surface(&["b"], &[]))],
        );
        assert!(index.contains("exports.a = 1;"));
        assert!(index.contains("exports.viaB = (0, b_1.b)();"));
        let b = emit(
            "b.ts",
            "import { a } from './index';\nexport function b() { return a; }\n",
            &[("./index", "index", surface(&["a", "viaB"], &[]))],
        );
        assert!(b.contains("    exports.b = b;\n"));
        assert!(b.contains("function b() { return index_1.a; }"));
    }

    #[test]
    fn test_shadowed_import_keeps_snapshot() {
        let out = emit(
            "index.ts",
            "import { f } from './util';\nfunction g(f: number) { return f; }\nexport const v = f() + g(1);\n",
            &[("./util", "util", surface(&["f"], &[]))],
        );
        assert!(out.contains("const { f } = util_1;"));
        assert!(out.contains("function g(f) { return f; }"));
        assert!(out.contains("exports.v = f() + g(1);"));
    }

    #[test]
    fn test_destructured_export_is_copied_after_declaration() {
        let out = emit("index.ts", "const o = { a: 1, b: 2 };\nexport const { a, b } = o;\nconsole.log(a);\n", &[]);
        assert!(out.contains("const { a, b } = o; exports.a = a; exports.b = b;\nconsole.log(a);"));
    }

    #[test]
    fn test_decorated_class_is_lowered() {
        let module = emitted(
            "service.ts",
            "import { log, inject } from './deco';\n@log\nexport class Service {\n    @log run(@inject('db') db: string) {}\n}\n",
            &[("./deco", "deco", surface(&["log", "inject"], &[]))],
        );
        let out = module.text;
        assert!(!out.contains('@'), "{}", out);
        assert!(out.contains("let Service = class Service {"));
        assert!(out.contains("run( db) {}"));
        assert!(out.contains(
            "}; __decorate([deco_1.log, __param(0, (0, deco_1.inject)('db'))], Service.prototype, \"run\", null);"
        ));
        assert!(out.contains("Service = __decorate([deco_1.log], Service); exports.Service = Service;"));
        assert_eq!(module.helpers, Helpers { decorate: true, param: true });
    }

    #[test]
    fn test_decorated_anonymous_default_class() {
        let module = emitted(
            "index.ts",
            "function sealed(c: any) {}\n@sealed\nexport default class {\n    @sealed static size = 1;\n}\n",
            &[],
        );
        let out = module.text;
        assert!(out.contains("let default_1 = class {"), "{}", out);
        assert!(out.contains("__decorate([sealed], default_1, \"size\", void 0);"));
        assert!(out.contains("default_1 = __decorate([sealed], default_1); exports.default = default_1;"));
        assert!(!out.contains("exports.default = class"));
        assert!(!module.helpers.param);
    }

    #[test]
    fn test_json_module() {
        let value: serde_json::Value = serde_json::from_str(r#"{ "name": "demo", "port": 8080 }"#).unwrap();
        let out = emit_json_module("config", &value, true);
        assert!(out.starts_with("define(\"config\", [\"require\", \"exports\"], function (require, exports) {\n"));
        assert!(out.contains("    const json = {\n      \"name\": \"demo\",\n      \"port\": 8080\n    };\n"));
        assert!(out.contains("    Object.assign(exports, json);\n"));
        assert!(out.ends_with("    exports.default = json;\n});\n"));
        let list = emit_json_module("list", &serde_json::json!([1, 2]), false);
        assert!(!list.contains("Object.assign"));
    }

    #[test]
    fn test_export_assignment_returns_value() {
        let out = emit("index.ts", "const api = { run() {} };\nexport = api;\n", &[]);
        assert!(out.contains("return api;"));
        assert!(!out.contains("__esModule"));
    }

    #[test]
    fn test_declarations_block() {
        let file = HostSourceFile::new(
            "lib/util.ts",
            "import { Base } from './base';\nexport interface Options { name: string }\nexport function run(o: Options): void {}\nexport const VERSION = '1';\nexport default class Runner {}\n",
        );
        let mut links = HashMap::new();
        links.insert(
            String::from("./base"),
            Link {
                module: String::from("lib/base"),
                surface: ExportSurface::default(),
            },
        );
        let out = emit_declarations(&file, &module_name(&file), &links);
        assert!(out.starts_with("declare module \"lib/util\" {\n"));
        assert!(out.contains("    import { Base } from \"lib/base\";\n"));
        assert!(out.contains("    export interface Options { name: string }\n"));
        assert!(out.contains("    export function run(...args: any[]): any;\n"));
        assert!(out.contains("    export const VERSION: any;\n"));
        assert!(out.contains("    export default _default;\n"));
        assert!(out.ends_with("}\n"));
    }
}
