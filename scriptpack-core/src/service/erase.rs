//! Type erasure
//!
//! Computes the edits that turn TypeScript statements into plain script:
//! annotations, type arguments, assertions, non-null marks and
//! checker-only members are removed; enums and namespaces become
//! function-scoped objects. Statements owned by module-level rewriting are
//! passed in as skipped ranges and left alone.

use std::ops::Deref;

use crate::scan::lexer::string_value;
use crate::scan::{Span, Token, TokenKind, TokenTree};

/// Replace `span` of the source with `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub text: String,
}

impl Edit {
    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(Span::new(at, at), text)
    }

    /// Remove `span`, keeping its line breaks
    pub fn blank(source: &str, span: Span) -> Self {
        Self::replace(span, blank(&source[span.start..span.end]))
    }
}

/// The line breaks of `text`
pub fn blank(text: &str) -> String {
    text.chars().filter(|c| *c == '\n').collect()
}

/// Apply edits in source order. An edit overlapping an earlier one is
/// dropped.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.span.start, e.span.end));
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.span.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..edit.span.start]);
        out.push_str(&edit.text);
        cursor = edit.span.end;
    }
    out.push_str(&source[cursor..]);
    out
}

/// Words that never end an expression
const KEYWORDS: [&str; 38] = [
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "finally", "for", "function", "if",
    "import", "in", "instanceof", "let", "new", "of", "return", "switch", "throw", "try", "typeof",
    "var", "void", "while", "with", "yield", "implements", "interface",
];

/// Keywords after which an expression starts
const EXPRESSION_KEYWORDS: [&str; 13] = [
    "return", "typeof", "await", "yield", "case", "throw", "in", "of", "void", "delete", "else",
    "do", "new",
];

const TS_MODIFIERS: [&str; 7] = [
    "public",
    "private",
    "protected",
    "readonly",
    "abstract",
    "override",
    "declare",
];

const JS_MODIFIERS: [&str; 5] = ["static", "async", "get", "set", "accessor"];

const PARAM_MODIFIERS: [&str; 5] = ["public", "private", "protected", "readonly", "override"];

const TYPE_OPERATORS: [&str; 6] = ["keyof", "typeof", "readonly", "unique", "infer", "asserts"];

/// Keywords whose parenthesized head is never a parameter list
const GROUPING_KEYWORDS: [&str; 5] = ["if", "for", "while", "switch", "with"];

/// Collects erasure edits over one token stream
pub struct TypeEraser<'a> {
    tree: TokenTree<'a>,
    /// Sorted ranges owned by module-level rewriting
    skip: Vec<Span>,
    edits: Vec<Edit>,
}

impl<'a> Deref for TypeEraser<'a> {
    type Target = TokenTree<'a>;

    fn deref(&self) -> &Self::Target {
        &self.tree
    }
}

impl<'a> TypeEraser<'a> {
    pub fn new(source: &'a str, tokens: &'a [Token], mut skip: Vec<Span>) -> Self {
        skip.sort();
        Self {
            tree: TokenTree::new(source, tokens),
            skip,
            edits: Vec::new(),
        }
    }

    /// Walk the whole file and return the edits
    pub fn run(mut self) -> Vec<Edit> {
        let len = self.len();
        self.walk(0, len, true);
        self.edits
    }

    // ---- edit helpers ----

    /// Blank tokens `from..to`
    fn remove(&mut self, from: usize, to: usize) {
        if from >= to || to > self.len() {
            return;
        }
        let span = Span::new(self.tokens[from].start, self.tokens[to - 1].end);
        self.blank_span(span);
    }

    fn remove_token(&mut self, i: usize) {
        self.remove(i, i + 1);
    }

    /// Blank token `i` with the whitespace after it
    fn remove_word(&mut self, i: usize) {
        match self.tokens.get(i + 1) {
            Some(next) => {
                let span = Span::new(self.tokens[i].start, next.start);
                self.blank_span(span);
            }
            None => self.remove_token(i),
        }
    }

    /// Blank tokens `anchor + 1..to` with the whitespace before them
    fn remove_after(&mut self, anchor: usize, to: usize) {
        if anchor + 1 >= to || to > self.len() {
            return;
        }
        let span = Span::new(self.tokens[anchor].end, self.tokens[to - 1].end);
        self.blank_span(span);
    }

    fn blank_span(&mut self, span: Span) {
        let edit = Edit::blank(self.source, span);
        self.edits.push(edit);
    }

    /// Replace tokens `from..to`, dropping edits already made inside them
    fn replace(&mut self, from: usize, to: usize, text: String) {
        if from >= to || to > self.len() {
            return;
        }
        let span = Span::new(self.tokens[from].start, self.tokens[to - 1].end);
        self.edits
            .retain(|e| e.span.end <= span.start || e.span.start >= span.end);
        self.edits.push(Edit::replace(span, text));
    }

    fn erase(&mut self, from: usize, to: usize) {
        if from >= to || to > self.len() {
            return;
        }
        let span = Span::new(self.tokens[from].start, self.tokens[to - 1].end);
        let text = blank(&self.source[span.start..span.end]);
        self.replace(from, to, text);
    }

    /// Index of the first token after the skipped range containing token `i`
    fn skipped(&self, i: usize) -> Option<usize> {
        let start = self.tokens[i].start;
        let at = self.skip.partition_point(|s| s.end <= start);
        let span = self.skip.get(at)?;
        if span.start > start {
            return None;
        }
        let mut j = i;
        while j < self.len() && self.tokens[j].start < span.end {
            j += 1;
        }
        Some(j)
    }

    // ---- token classification ----

    fn doubled(&self, i: usize) -> bool {
        self.is(i + 1, self.text(i)) && self.adjacent(i, i + 1)
    }

    fn is_value_word(&self, i: usize) -> bool {
        self.is_ident(i) && !KEYWORDS.contains(&self.text(i))
    }

    /// Token before `i` can end an expression
    fn value_before(&self, i: usize) -> bool {
        if i == 0 {
            return false;
        }
        let prev = i - 1;
        match self.kind(prev) {
            Some(TokenKind::Ident) => self.is_value_word(prev),
            Some(TokenKind::Punct) => matches!(self.text(prev), ")" | "]" | "}" | "!"),
            Some(_) => true,
            None => false,
        }
    }

    /// An expression may start at `i`
    fn expression_start(&self, i: usize) -> bool {
        if i == 0 {
            return true;
        }
        let prev = i - 1;
        match self.kind(prev) {
            Some(TokenKind::Punct) => !matches!(self.text(prev), ")" | "]" | "}"),
            Some(TokenKind::Ident) => EXPRESSION_KEYWORDS.contains(&self.text(prev)),
            _ => false,
        }
    }

    fn starts_type(&self, i: usize) -> bool {
        match self.kind(i) {
            Some(TokenKind::Ident | TokenKind::String | TokenKind::Number | TokenKind::Template) => true,
            Some(TokenKind::Punct) => matches!(self.text(i), "(" | "[" | "{" | "<" | "-"),
            _ => false,
        }
    }

    fn starts_binding(&self, i: usize) -> bool {
        self.is_ident(i) || self.is(i, "{") || self.is(i, "[")
    }

    fn starts_statement(&self, i: usize) -> bool {
        if i == 0 {
            return true;
        }
        self.tokens[i].newline_before
            || matches!(self.text(i - 1), ";" | "}" | "{" | "export" | "default")
    }

    /// `!` at `i` asserts non-null on the expression before it
    fn is_non_null(&self, i: usize) -> bool {
        if i == 0 || !self.adjacent(i - 1, i) {
            return false;
        }
        let prev_is_value = self.is_value_word(i - 1) || matches!(self.text(i - 1), ")" | "]");
        prev_is_value && !(self.is(i + 1, "=") && self.adjacent(i, i + 1))
    }

    /// Matching `>` of a type argument list opened at `open`
    pub fn angle_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut k = open;
        while k < self.len() {
            match self.text(k) {
                "<" => depth += 1,
                ">" if !(k > 0 && self.is(k - 1, "=") && self.adjacent(k - 1, k)) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(k);
                    }
                }
                "(" | "[" | "{" => k = self.matching[k]?,
                ";" | ")" | "]" | "}" | "+" | "*" | "/" | "%" | "!" | "^" | "~" => return None,
                "&" | "|" if self.doubled(k) => return None,
                "=" if !self.is_arrow(k) => return None,
                _ if self.kind(k) == Some(TokenKind::Regex) => return None,
                _ => {}
            }
            k += 1;
        }
        None
    }

    /// Index after the type starting at `start`. With `stop_arrow` a `=>`
    /// after a parenthesized type is left for the caller.
    pub fn skip_type(&self, start: usize, stop_arrow: bool) -> usize {
        let mut i = start;
        loop {
            loop {
                if matches!(self.text(i), "|" | "&") && !self.doubled(i) {
                    i += 1;
                } else if self.is_ident(i)
                    && TYPE_OPERATORS.contains(&self.text(i))
                    && self.starts_type(i + 1)
                {
                    i += 1;
                } else {
                    break;
                }
            }

            let mut paren = false;
            match self.text(i) {
                "(" => {
                    paren = true;
                    i = self.close_of(i) + 1;
                }
                "[" | "{" => i = self.close_of(i) + 1,
                "<" => match self.angle_close(i) {
                    Some(close) => {
                        i = close + 1;
                        continue;
                    }
                    None => return i,
                },
                "new" if matches!(self.text(i + 1), "(" | "<") => {
                    i += 1;
                    continue;
                }
                "-" if self.kind(i + 1) == Some(TokenKind::Number) => i += 2,
                _ if matches!(
                    self.kind(i),
                    Some(TokenKind::Ident | TokenKind::String | TokenKind::Number | TokenKind::Template)
                ) =>
                {
                    i += 1;
                    while self.is(i, ".") && self.is_ident(i + 1) {
                        i += 2;
                    }
                    if self.is(i, "<") {
                        if let Some(close) = self.angle_close(i) {
                            i = close + 1;
                        }
                    }
                }
                _ => return i,
            }

            while self.is(i, "[") && i < self.len() && !self.tokens[i].newline_before {
                i = self.close_of(i) + 1;
            }
            if paren && !stop_arrow && self.is_arrow(i) {
                i += 2;
                continue;
            }
            if self.is(i, "is") && self.is_ident(i) {
                i += 1;
                continue;
            }
            if matches!(self.text(i), "|" | "&") && !self.doubled(i) {
                i += 1;
                continue;
            }
            return i;
        }
    }

    /// `(` at `open` starts a parameter list
    pub fn is_param_list(&self, open: usize) -> bool {
        let close = self.close_of(open);
        let prev = if open > 0 { self.text(open - 1) } else { "" };
        if GROUPING_KEYWORDS.contains(&prev) {
            return false;
        }
        if self.is_arrow(close + 1) {
            return true;
        }
        let callable = open > 0
            && (self.is_value_word(open - 1)
                || matches!(prev, ">" | "*" | "function" | "]")
                || self.kind(open - 1) == Some(TokenKind::String));
        if self.is(close + 1, "{") {
            return callable || prev == "catch";
        }
        if self.is(close + 1, ":") {
            if self.is_arrow(self.skip_type(close + 2, true)) {
                return true;
            }
            return callable && self.is(self.skip_type(close + 2, false), "{");
        }
        false
    }

    // ---- walkers ----

    fn walk(&mut self, start: usize, end: usize, block: bool) {
        let mut i = start;
        while i < end {
            let next = self.step(i, end, block);
            i = next.max(i + 1);
        }
    }

    fn step(&mut self, i: usize, end: usize, block: bool) -> usize {
        if let Some(next) = self.skipped(i) {
            return next;
        }
        if block && self.starts_statement(i) {
            if let Some(next) = self.statement(i, end) {
                return next;
            }
        }
        match self.text(i) {
            "(" => self.paren(i),
            "[" | "{" => {
                let close = self.close_of(i);
                let block = self.is(i, "{");
                self.walk(i + 1, close, block);
                close + 1
            }
            "class" => self.class(i),
            "@" if self.is_ident(i + 1) || self.is(i + 1, "(") => {
                let next = self.skip_decorator(i);
                self.remove(i, next);
                next
            }
            "<" => self.angle(i),
            "as" | "satisfies" if self.value_before(i) && self.starts_type(i + 1) => {
                let end = self.skip_type(i + 1, false);
                self.remove_after(i - 1, end);
                end
            }
            "!" if self.is_non_null(i) => {
                self.remove_token(i);
                i + 1
            }
            _ => i + 1,
        }
    }

    /// Walk an expression up to a `,`, `;`, closer, or line break at its
    /// own depth; returns the index of the stopping token
    fn expression(&mut self, start: usize, limit: usize) -> usize {
        if start >= limit {
            return limit;
        }
        let base = self.depth[start];
        let mut k = start;
        while k < limit {
            if self.depth[k] < base {
                return k;
            }
            if self.depth[k] == base {
                if self.is_closer(k) || matches!(self.text(k), "," | ";") {
                    return k;
                }
                if k > start && self.tokens[k].newline_before && !self.continues(k - 1, k) {
                    return k;
                }
            }
            let next = self.step(k, limit, false);
            k = next.max(k + 1);
        }
        limit
    }

    fn statement(&mut self, i: usize, end: usize) -> Option<usize> {
        match self.text(i) {
            "let" | "var" if self.starts_binding(i + 1) => Some(self.declarators(i, end)),
            "const" if self.is(i + 1, "enum") => self.enum_decl(i),
            "const" if self.starts_binding(i + 1) => Some(self.declarators(i, end)),
            "enum" if self.is_ident(i + 1) && self.is(i + 2, "{") => self.enum_decl(i),
            "interface" if self.is_ident(i + 1) => {
                let stop = self.block_end(i);
                self.erase(i, stop);
                Some(stop)
            }
            "type" if self.is_ident(i + 1) && matches!(self.text(i + 2), "=" | "<") => {
                let stop = self.statement_end(i);
                self.erase(i, stop);
                Some(stop)
            }
            "declare" if self.is_ident(i + 1) && !self.tokens[i + 1].newline_before => {
                let stop = self.block_end(i);
                self.erase(i, stop);
                Some(stop)
            }
            "abstract" if self.is(i + 1, "class") => {
                self.remove_word(i);
                Some(i + 1)
            }
            "namespace" | "module" if self.is_ident(i + 1) && self.is(i + 2, "{") => {
                self.namespace(i)
            }
            "function" => self.function_decl(i, i),
            "async" if self.is(i + 1, "function") => self.function_decl(i, i + 1),
            _ => None,
        }
    }

    fn declarators(&mut self, i: usize, end: usize) -> usize {
        let mut k = i + 1;
        loop {
            if matches!(self.text(k), "{" | "[") {
                let close = self.close_of(k);
                self.walk(k + 1, close, false);
                k = close + 1;
            } else if self.is_ident(k) {
                k += 1;
            } else {
                return k;
            }
            if self.is(k, "!") && self.is(k + 1, ":") {
                self.remove_token(k);
                k += 1;
            }
            if self.is(k, ":") {
                let stop = self.skip_type(k + 1, false);
                self.remove(k, stop);
                k = stop;
            }
            if self.is(k, "=") {
                k = self.expression(k + 1, end);
            }
            if self.is(k, ",") {
                k += 1;
                continue;
            }
            return k;
        }
    }

    fn paren(&mut self, open: usize) -> usize {
        let close = self.close_of(open);
        if !self.is_param_list(open) {
            self.walk(open + 1, close, false);
            return close + 1;
        }
        self.params(open, close);
        if !self.is(close + 1, ":") {
            return close + 1;
        }
        let arrow_end = self.skip_type(close + 2, true);
        let stop = if self.is_arrow(arrow_end) {
            arrow_end
        } else {
            self.skip_type(close + 2, false)
        };
        self.remove(close + 1, stop);
        stop
    }

    /// Strip a parameter list; returns the names of parameter properties
    fn params(&mut self, open: usize, close: usize) -> Vec<String> {
        let mut properties = Vec::new();
        let mut k = open + 1;
        while k < close {
            while self.is(k, "@") {
                let next = self.skip_decorator(k);
                self.remove(k, next);
                k = next;
            }
            let mut is_property = false;
            while PARAM_MODIFIERS.contains(&self.text(k)) && self.starts_binding(k + 1) {
                self.remove_word(k);
                is_property = true;
                k += 1;
            }
            if self.is(k, "this") && self.is(k + 1, ":") {
                let stop = self.skip_type(k + 2, false);
                let stop = if self.is(stop, ",") { stop + 1 } else { stop };
                let span = Span::new(self.tokens[k].start, self.tokens[stop.min(close)].start);
                self.blank_span(span);
                k = stop;
                continue;
            }
            while self.is(k, ".") {
                k += 1;
            }
            if matches!(self.text(k), "{" | "[") {
                let inner = self.close_of(k);
                self.walk(k + 1, inner, false);
                k = inner + 1;
            } else {
                if is_property {
                    properties.push(self.text(k).to_string());
                }
                k += 1;
            }
            if self.is(k, "?") {
                self.remove_token(k);
                k += 1;
            }
            if self.is(k, ":") {
                let stop = self.skip_type(k + 1, false);
                self.remove(k, stop);
                k = stop;
            }
            if self.is(k, "=") {
                k = self.expression(k + 1, close);
            }
            while k < close && !self.is(k, ",") {
                let next = self.step(k, close, false);
                k = next.max(k + 1);
            }
            k += 1;
        }
        properties
    }

    /// Index after the decorator whose `@` is at `at`
    pub fn skip_decorator(&self, at: usize) -> usize {
        let mut k = at + 1;
        if self.is(k, "(") {
            return self.close_of(k) + 1;
        }
        if self.is_ident(k) {
            k += 1;
        }
        while self.is(k, ".") && self.is_ident(k + 1) {
            k += 2;
        }
        if self.is(k, "<") {
            if let Some(close) = self.angle_close(k) {
                k = close + 1;
            }
        }
        if self.is(k, "(") {
            k = self.close_of(k) + 1;
        }
        k
    }

    fn angle(&mut self, i: usize) -> usize {
        if self.expression_start(i) {
            // `<T>value` assertion or generic arrow parameters
            if let Some(close) = self.angle_close(i) {
                self.remove(i, close + 1);
                return close + 1;
            }
            return i + 1;
        }
        if self.value_before(i) {
            if let Some(close) = self.angle_close(i) {
                if self.is(close + 1, "(") || self.kind(close + 1) == Some(TokenKind::Template) {
                    self.remove(i, close + 1);
                    return close + 1;
                }
            }
        }
        i + 1
    }

    fn function_decl(&mut self, start: usize, keyword: usize) -> Option<usize> {
        let mut k = keyword + 1;
        if self.is(k, "*") {
            k += 1;
        }
        if !self.is_ident(k) {
            return None;
        }
        k += 1;
        let type_params = if self.is(k, "<") { self.angle_close(k) } else { None };
        let open = type_params.map(|c| c + 1).unwrap_or(k);
        if !self.is(open, "(") {
            return None;
        }
        let close = self.close_of(open);
        let body = if self.is(close + 1, ":") {
            self.skip_type(close + 2, false)
        } else {
            close + 1
        };
        if !self.is(body, "{") {
            // overload signature
            let stop = self.statement_end(start);
            self.erase(start, stop);
            return Some(stop);
        }
        if let Some(c) = type_params {
            self.remove(k, c + 1);
        }
        self.params(open, close);
        self.remove(close + 1, body);
        let body_close = self.close_of(body);
        self.walk(body + 1, body_close, true);
        Some(body_close + 1)
    }

    fn class(&mut self, i: usize) -> usize {
        let base = self.depth[i];
        let len = self.len();
        let mut k = i + 1;
        if self.is_ident(k) && !matches!(self.text(k), "extends" | "implements") {
            k += 1;
        }
        if self.is(k, "<") {
            if let Some(close) = self.angle_close(k) {
                self.remove(k, close + 1);
                k = close + 1;
            }
        }
        if self.is(k, "extends") {
            k += 1;
            while k < len && !(self.depth[k] == base && matches!(self.text(k), "{" | "implements")) {
                if self.is(k, "<") {
                    if let Some(close) = self.angle_close(k) {
                        self.remove(k, close + 1);
                        k = close + 1;
                        continue;
                    }
                }
                let next = self.step(k, len, false);
                k = next.max(k + 1);
            }
        }
        if self.is(k, "implements") {
            let anchor = k - 1;
            while k < len && !(self.depth[k] == base && self.is(k, "{")) {
                match self.angle_close(k).filter(|_| self.is(k, "<")) {
                    Some(close) => k = close + 1,
                    None => k += 1,
                }
            }
            self.remove_after(anchor, k);
        }
        if !self.is(k, "{") {
            return k;
        }
        let close = self.close_of(k);
        self.class_body(k, close);
        close + 1
    }

    fn class_body(&mut self, open: usize, close: usize) {
        let mut m = open + 1;
        while m < close {
            if self.is(m, ";") {
                m += 1;
                continue;
            }
            let next = self.member(m, close);
            m = next.max(m + 1);
        }
    }

    /// A member can follow a modifier at `i`
    pub fn member_follows(&self, i: usize) -> bool {
        match self.kind(i) {
            Some(TokenKind::Ident | TokenKind::String | TokenKind::Number) => true,
            Some(TokenKind::Punct) => matches!(self.text(i), "[" | "#" | "*" | "{"),
            _ => false,
        }
    }

    /// Index after the member ending at or after `from`
    pub fn member_end(&self, from: usize, close: usize) -> usize {
        let base = self.depth[close];
        let mut k = from;
        while k < close {
            if self.depth[k] == base {
                if self.is(k, ";") {
                    return k + 1;
                }
                if k > from && self.tokens[k].newline_before && !self.continues(k - 1, k) {
                    return k;
                }
            }
            k += 1;
        }
        close
    }

    fn member(&mut self, start: usize, close: usize) -> usize {
        let mut m = start;
        while self.is(m, "@") {
            let next = self.skip_decorator(m);
            self.remove(m, next);
            m = next;
        }
        let mut checker_only = false;
        loop {
            let word = self.text(m);
            let is_modifier = self.is_ident(m)
                && (TS_MODIFIERS.contains(&word) || JS_MODIFIERS.contains(&word))
                && self.member_follows(m + 1);
            if !is_modifier {
                break;
            }
            if matches!(word, "declare" | "abstract") {
                checker_only = true;
            }
            if TS_MODIFIERS.contains(&word) {
                self.remove_word(m);
            }
            m += 1;
        }
        if checker_only {
            let stop = self.member_end(m, close);
            self.erase(start, stop);
            return stop;
        }
        if self.is(m, "{") {
            let body_close = self.close_of(m);
            self.walk(m + 1, body_close, true);
            return body_close + 1;
        }
        if self.is(m, "*") {
            m += 1;
        }

        let name = self.text(m);
        match name {
            "[" => {
                let bracket_close = self.close_of(m);
                if self.is_ident(m + 1) && self.is(m + 2, ":") {
                    // index signature
                    let stop = self.member_end(bracket_close + 1, close);
                    self.erase(start, stop);
                    return stop;
                }
                self.walk(m + 1, bracket_close, false);
                m = bracket_close + 1;
            }
            "#" => m += 2,
            _ => m += 1,
        }
        if matches!(self.text(m), "?" | "!") {
            self.remove_token(m);
            m += 1;
        }
        if self.is(m, "<") {
            if let Some(c) = self.angle_close(m) {
                self.remove(m, c + 1);
                m = c + 1;
            }
        }

        if self.is(m, "(") {
            let params_close = self.close_of(m);
            let body = if self.is(params_close + 1, ":") {
                self.skip_type(params_close + 2, false)
            } else {
                params_close + 1
            };
            if !self.is(body, "{") {
                // overload signature
                let stop = self.member_end(body, close);
                self.erase(start, stop);
                return stop;
            }
            let properties = self.params(m, params_close);
            self.remove(params_close + 1, body);
            let body_close = self.close_of(body);
            self.walk(body + 1, body_close, true);
            if name == "constructor" && !properties.is_empty() {
                self.assign_properties(body, body_close, &properties);
            }
            return body_close + 1;
        }

        if self.is(m, ":") {
            let stop = self.skip_type(m + 1, false);
            self.remove(m, stop);
            m = stop;
        }
        if self.is(m, "=") {
            m = self.expression(m + 1, close);
            if self.is(m, ";") {
                m += 1;
            }
            return m;
        }
        // a field without initializer only exists for the checker
        let stop = self.member_end(m, close);
        self.erase(start, stop);
        stop
    }

    /// `this.x = x;` for parameter properties, after any `super(...)` call
    fn assign_properties(&mut self, open: usize, close: usize, properties: &[String]) {
        let inner = self.depth[open] + 1;
        let mut at = self.tokens[open].end;
        for k in open + 1..close {
            if self.depth[k] == inner && self.is(k, "super") && self.is(k + 1, "(") {
                let call_close = self.close_of(k + 1);
                let last = if self.is(call_close + 1, ";") {
                    call_close + 1
                } else {
                    call_close
                };
                at = self.tokens[last].end;
                break;
            }
        }
        let mut text: String = properties
            .iter()
            .map(|p| format!(" this.{} = {};", p, p))
            .collect();
        if close == open + 1 && self.adjacent(open, close) {
            text.push(' ');
        }
        self.edits.push(Edit::insert(at, text));
    }

    fn enum_decl(&mut self, i: usize) -> Option<usize> {
        let keyword = if self.is(i, "const") { i + 1 } else { i };
        let name_at = keyword + 1;
        if !self.is_ident(name_at) || !self.is(name_at + 1, "{") {
            return None;
        }
        let name = self.text(name_at);
        let open = name_at + 1;
        let close = self.close_of(open);
        let inner = self.depth[open] + 1;

        let mut lines = vec![format!("var {};", name), format!("(function ({}) {{", name)];
        let mut next_value: Option<i64> = Some(0);
        let mut previous: Option<String> = None;
        let mut m = open + 1;
        while m < close {
            if self.is(m, ",") {
                m += 1;
                continue;
            }
            let member = if self.kind(m) == Some(TokenKind::String) {
                string_value(self.text(m))
            } else {
                self.text(m).to_string()
            };
            let key = serde_json::to_string(&member).unwrap_or_default();
            m += 1;

            if self.is(m, "=") {
                let value_start = m + 1;
                let mut value_end = value_start;
                while value_end < close && !(self.depth[value_end] == inner && self.is(value_end, ",")) {
                    value_end += 1;
                }
                m = value_end;
                if value_end <= value_start {
                    continue;
                }
                let init = self.source[self.tokens[value_start].start..self.tokens[value_end - 1].end].trim();
                if value_end == value_start + 1 && self.kind(value_start) == Some(TokenKind::String) {
                    lines.push(format!("    {}[{}] = {};", name, key, init));
                    next_value = None;
                } else {
                    lines.push(format!("    {0}[{0}[{1}] = {2}] = {1};", name, key, init));
                    next_value = init.parse::<i64>().ok().map(|v| v + 1);
                }
            } else {
                let value = match (next_value, &previous) {
                    (Some(v), _) => v.to_string(),
                    (None, Some(prev)) => format!("{}[{}] + 1", name, prev),
                    (None, None) => String::from("0"),
                };
                lines.push(format!("    {0}[{0}[{1}] = {2}] = {1};", name, key, value));
                next_value = next_value.map(|v| v + 1);
            }
            previous = Some(key);
        }
        lines.push(format!("}})({0} || ({0} = {{}}));", name));

        let stop = if self.is(close + 1, ";") { close + 2 } else { close + 1 };
        self.replace(i, stop, lines.join("\n"));
        Some(stop)
    }

    fn namespace(&mut self, i: usize) -> Option<usize> {
        let name = self.text(i + 1);
        let open = i + 2;
        let close = self.close_of(open);
        let inner = self.depth[open] + 1;

        let mut exported = Vec::new();
        for k in open + 1..close {
            if self.depth[k] != inner || !self.is(k, "export") || !self.starts_statement(k) {
                continue;
            }
            let j = k + 1;
            match self.text(j) {
                "const" | "let" | "var" if self.starts_binding(j + 1) => {
                    let stop = self.statement_end(j);
                    exported.extend(self.declarator_names(j + 1, stop));
                }
                "function" | "class" | "enum" | "namespace" | "async" | "abstract" => {
                    exported.extend(self.declared_name(j));
                }
                "const" => exported.extend(self.declared_name(j)),
                _ => {}
            }
            self.remove_word(k);
        }
        self.walk(open + 1, close, true);

        self.replace(i, open + 1, format!("var {0};\n(function ({0}) {{", name));
        let assignments: String = exported
            .iter()
            .map(|n| format!("    {0}.{1} = {1};\n", name, n))
            .collect();
        self.replace(close, close + 1, format!("{}}})({1} || ({1} = {{}}));", assignments, name));
        Some(close + 1)
    }
}

/// Erasure edits for `source`, leaving `skip` ranges untouched
pub fn erase_types(source: &str, tokens: &[Token], skip: Vec<Span>) -> Vec<Edit> {
    TypeEraser::new(source, tokens, skip).run()
}
