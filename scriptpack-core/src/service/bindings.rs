//! Live bindings
//!
//! An imported name is read through its dependency parameter at every use
//! and an exported variable lives on `exports`. Importers then observe
//! later assignments, and modules that import each other see values set
//! after they were loaded.

use std::collections::{HashMap, HashSet};
use std::ops::{Deref, Range};

use crate::scan::{tokenize, Span, Token, TokenKind};

use super::erase::{apply_edits, Edit, TypeEraser};

/// Words that can precede a class member name
pub const MEMBER_MODIFIERS: [&str; 12] = [
    "static", "public", "private", "protected", "readonly", "abstract", "override", "declare", "async",
    "get", "set", "accessor",
];

const PARAM_MODIFIERS: [&str; 5] = ["public", "private", "protected", "readonly", "override"];

/// Words after which `{` opens an object literal
const LITERAL_KEYWORDS: [&str; 10] = [
    "return", "yield", "await", "case", "typeof", "void", "in", "of", "throw", "delete",
];

/// Access expressions standing in for local names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    access: HashMap<String, String>,
}

impl Bindings {
    pub fn insert(&mut self, local: impl Into<String>, access: impl Into<String>) {
        self.access.insert(local.into(), access.into());
    }

    pub fn get(&self, local: &str) -> Option<&str> {
        self.access.get(local).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_empty()
    }
}

/// Where a top-level declaration can be observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevel {
    /// Function declarations are hoisted
    Function,
    /// Token index one past the declaring statement
    Statement(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Read,
    Shorthand,
    Call,
}

/// Declaration sites and bracket context of one token stream
pub struct Scope<'a> {
    eraser: TypeEraser<'a>,
    /// Innermost bracket around each token
    enclosing: Vec<Option<usize>>,
    /// Opener of each closing bracket
    opener: Vec<Option<usize>>,
    class_bodies: HashSet<usize>,
    /// Tokens that declare a name
    sites: HashSet<usize>,
    top_level: HashMap<String, TopLevel>,
}

impl<'a> Deref for Scope<'a> {
    type Target = TypeEraser<'a>;

    fn deref(&self) -> &Self::Target {
        &self.eraser
    }
}

impl<'a> Scope<'a> {
    pub fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        let mut enclosing = Vec::with_capacity(tokens.len());
        let mut opener = vec![None; tokens.len()];
        let mut stack: Vec<usize> = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            let punct = token.kind == TokenKind::Punct;
            let text = token.text(source);
            if punct && matches!(text, ")" | "]" | "}") {
                opener[i] = stack.pop();
            }
            enclosing.push(stack.last().copied());
            if punct && matches!(text, "(" | "[" | "{") {
                stack.push(i);
            }
        }
        let mut scope = Self {
            eraser: TypeEraser::new(source, tokens, Vec::new()),
            enclosing,
            opener,
            class_bodies: HashSet::new(),
            sites: HashSet::new(),
            top_level: HashMap::new(),
        };
        scope.collect();
        scope
    }

    fn collect(&mut self) {
        let mut sites = Vec::new();
        let mut top_level = HashMap::new();
        let mut class_bodies = HashSet::new();
        for i in 0..self.len() {
            if i > 0 && self.is(i - 1, ".") {
                continue;
            }
            let at_top = self.depth[i] == 0;
            match self.text(i) {
                "class" if self.is_ident(i) => {
                    class_bodies.extend(self.class_body(i));
                    let named = self.is_ident(i + 1) && !matches!(self.text(i + 1), "extends" | "implements");
                    if named {
                        sites.push(i + 1);
                        if at_top {
                            top_level.insert(self.text(i + 1).to_string(), TopLevel::Statement(self.block_end(i)));
                        }
                    }
                }
                "function" if self.is_ident(i) => {
                    let k = if self.is(i + 1, "*") { i + 2 } else { i + 1 };
                    if self.is_ident(k) {
                        sites.push(k);
                        if at_top {
                            top_level.insert(self.text(k).to_string(), TopLevel::Function);
                        }
                    }
                }
                "enum" | "namespace" | "module" if self.is_ident(i) && self.is_ident(i + 1) => {
                    sites.push(i + 1);
                    if at_top {
                        top_level.insert(self.text(i + 1).to_string(), TopLevel::Statement(self.block_end(i)));
                    }
                }
                "let" | "const" | "var"
                    if self.is_ident(i) && !self.is(i + 1, "enum") && self.starts_binding(i + 1) =>
                {
                    let end = self.statement_end(i);
                    let first = sites.len();
                    self.declarators(i + 1, end, &mut sites);
                    if at_top {
                        for &site in &sites[first..] {
                            top_level.insert(self.text(site).to_string(), TopLevel::Statement(end));
                        }
                    }
                }
                "(" if self.kind(i) == Some(TokenKind::Punct) && self.is_param_list(i) => {
                    self.params(i, &mut sites)
                }
                _ if self.is_ident(i) && self.is_arrow(i + 1) => sites.push(i),
                _ => {}
            }
        }
        self.sites = sites.into_iter().collect();
        self.top_level = top_level;
        self.class_bodies = class_bodies;
    }

    fn starts_binding(&self, j: usize) -> bool {
        self.is_ident(j) || self.is(j, "{") || self.is(j, "[")
    }

    fn declarators(&self, mut j: usize, end: usize, sites: &mut Vec<usize>) {
        let base = self.depth[j];
        while j < end {
            self.binding(j, sites);
            while j < end && !(self.is(j, ",") && self.depth[j] == base) {
                j += 1;
            }
            j += 1;
        }
    }

    fn binding(&self, j: usize, sites: &mut Vec<usize>) {
        if matches!(self.text(j), "{" | "[") {
            self.pattern(j + 1, self.close_of(j), sites);
        } else if self.is_ident(j) {
            sites.push(j);
        }
    }

    fn pattern(&self, mut j: usize, close: usize, sites: &mut Vec<usize>) {
        while j < close {
            match self.text(j) {
                "{" | "[" => {
                    let inner = self.close_of(j);
                    self.pattern(j + 1, inner, sites);
                    j = inner + 1;
                }
                "=" => {
                    let level = self.depth[j];
                    j += 1;
                    while j < close && !(self.is(j, ",") && self.depth[j] == level) {
                        j += 1;
                    }
                }
                _ if self.is_ident(j) => {
                    if !self.is(j + 1, ":") {
                        sites.push(j);
                    }
                    j += 1;
                }
                _ => j += 1,
            }
        }
    }

    fn params(&self, open: usize, sites: &mut Vec<usize>) {
        let close = self.close_of(open);
        let inner = self.depth[open] + 1;
        let mut k = open + 1;
        while k < close {
            while self.is(k, "@") {
                k = self.skip_decorator(k);
            }
            while self.is(k, ".") || (PARAM_MODIFIERS.contains(&self.text(k)) && self.starts_binding(k + 1)) {
                k += 1;
            }
            self.binding(k, sites);
            while k < close && !(self.is(k, ",") && self.depth[k] == inner) {
                k += 1;
            }
            k += 1;
        }
    }

    /// `{` opening the body of the class whose keyword is at `keyword`
    pub fn class_body(&self, keyword: usize) -> Option<usize> {
        let base = self.depth[keyword];
        for k in keyword + 1..self.len() {
            if self.depth[k] < base {
                return None;
            }
            if self.depth[k] == base {
                if self.is(k, "{") {
                    return Some(k);
                }
                if self.is(k, ";") || self.is_closer(k) {
                    return None;
                }
            }
        }
        None
    }

    pub fn top_level(&self, name: &str) -> Option<TopLevel> {
        self.top_level.get(name).copied()
    }

    /// Token `i` declares a name
    pub fn is_site(&self, i: usize) -> bool {
        self.sites.contains(&i)
    }

    /// How often each name is declared, template substitutions included
    pub fn declared_names(&self) -> HashMap<String, usize> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for &site in &self.sites {
            *counts.entry(self.text(site).to_string()).or_default() += 1;
        }
        for token in self.tokens.iter().filter(|t| t.kind == TokenKind::Template) {
            let text = token.text(self.source);
            for range in substitutions(text) {
                let inner = &text[range];
                let tokens = tokenize(inner);
                for (name, n) in Scope::new(inner, &tokens).declared_names() {
                    *counts.entry(name).or_default() += n;
                }
            }
        }
        counts
    }

    fn usage(&self, i: usize) -> Option<Usage> {
        if self.is_site(i) {
            return None;
        }
        let prev = if i > 0 { self.text(i - 1) } else { "" };
        if prev == "#" || (prev == "." && !(i > 1 && self.is(i - 2, "."))) {
            return None;
        }
        let parent = self.enclosing[i];
        if let Some(body) = parent.filter(|p| self.class_bodies.contains(p)) {
            if self.is_member_name(i, body) {
                return None;
            }
        }
        let listed = matches!(prev, "{" | ",");
        let in_braces = parent.is_some_and(|p| self.is(p, "{"));
        if in_braces && listed && self.is(i + 1, ":") {
            return None;
        }
        if self.is(i + 1, "(") && self.is_param_list(i + 1) {
            return None;
        }
        if in_braces
            && listed
            && matches!(self.text(i + 1), "}" | ",")
            && parent.is_some_and(|p| self.object_literal(p))
        {
            return Some(Usage::Shorthand);
        }
        let generic_call = self.is(i + 1, "<") && self.angle_close(i + 1).is_some_and(|c| self.is(c + 1, "("));
        let called = self.is(i + 1, "(") || generic_call || self.kind(i + 1) == Some(TokenKind::Template);
        if called && prev != "new" {
            return Some(Usage::Call);
        }
        Some(Usage::Read)
    }

    fn is_member_name(&self, i: usize, body: usize) -> bool {
        let prev = i - 1;
        if prev == body || matches!(self.text(prev), ";" | "}") {
            return true;
        }
        if self.is(prev, "*") {
            return self.is_member_name(prev, body);
        }
        if self.is_ident(prev) && MEMBER_MODIFIERS.contains(&self.text(prev)) {
            return true;
        }
        if self.ends_decorator(prev) {
            return true;
        }
        self.tokens[i].newline_before && !self.continues(prev, i)
    }

    /// Token `j` is the last token of a decorator
    fn ends_decorator(&self, mut j: usize) -> bool {
        if self.is(j, ")") {
            match self.opener[j] {
                Some(open) if open > 0 => j = open - 1,
                _ => return false,
            }
            if self.is(j, "@") {
                return true;
            }
        }
        while j >= 2 && self.is_ident(j) && self.is(j - 1, ".") {
            j -= 2;
        }
        j >= 1 && self.is_ident(j) && self.is(j - 1, "@")
    }

    /// `{` at `open` starts an object literal rather than a block
    fn object_literal(&self, open: usize) -> bool {
        if open == 0 {
            return false;
        }
        let prev = open - 1;
        match self.kind(prev) {
            Some(TokenKind::Punct) => {
                if prev > 0 && self.is_arrow(prev - 1) {
                    return false;
                }
                !matches!(self.text(prev), ")" | "]" | "}" | ";" | "{")
            }
            Some(TokenKind::Ident) => LITERAL_KEYWORDS.contains(&self.text(prev)),
            _ => false,
        }
    }

    /// Edits reading each bound name through its access expression,
    /// leaving tokens that touch `excluded` alone
    pub fn reference_edits(&self, bindings: &Bindings, excluded: &[Span]) -> Vec<Edit> {
        let mut edits = Vec::new();
        if bindings.is_empty() {
            return edits;
        }
        for (i, token) in self.tokens.iter().enumerate() {
            if excluded.iter().any(|s| s.start < token.end && token.start < s.end) {
                continue;
            }
            let span = Span::new(token.start, token.end);
            match token.kind {
                TokenKind::Template => {
                    if let Some(text) = rewrite_template(token.text(self.source), bindings) {
                        edits.push(Edit::replace(span, text));
                    }
                }
                TokenKind::Ident => {
                    let name = token.text(self.source);
                    let Some(access) = bindings.get(name) else {
                        continue;
                    };
                    let text = match self.usage(i) {
                        None => continue,
                        Some(Usage::Read) => access.to_string(),
                        Some(Usage::Shorthand) => format!("{}: {}", name, access),
                        Some(Usage::Call) => format!("(0, {})", access),
                    };
                    edits.push(Edit::replace(span, text));
                }
                _ => {}
            }
        }
        edits
    }
}

fn rewrite_template(text: &str, bindings: &Bindings) -> Option<String> {
    let mut out = String::new();
    let mut cursor = 0;
    for range in substitutions(text) {
        let inner = &text[range.clone()];
        let tokens = tokenize(inner);
        let edits = Scope::new(inner, &tokens).reference_edits(bindings, &[]);
        if edits.is_empty() {
            continue;
        }
        out.push_str(&text[cursor..range.start]);
        out.push_str(&apply_edits(inner, edits));
        cursor = range.end;
    }
    (cursor > 0).then(|| {
        out.push_str(&text[cursor..]);
        out
    })
}

/// Byte ranges of the `${...}` expressions of a template literal
fn substitutions(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut k = 1;
    while k < bytes.len() {
        match bytes[k] {
            b'\\' => k += 2,
            b'$' if bytes.get(k + 1) == Some(&b'{') => {
                let start = k + 2;
                let Some(len) = substitution_len(&text[start..]) else {
                    break;
                };
                ranges.push(start..start + len);
                k = start + len + 1;
            }
            _ => k += 1,
        }
    }
    ranges
}

fn substitution_len(rest: &str) -> Option<usize> {
    let mut depth = 0usize;
    for token in tokenize(rest) {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text(rest) {
            "{" => depth += 1,
            "}" if depth == 0 => return Some(token.start),
            "}" => depth -= 1,
            _ => {}
        }
    }
    None
}
