//! Bracket structure of a token stream
//!
//! Shared by the module syntax scanner and the type eraser: bracket depth
//! and matching closers per token, plus statement boundary heuristics.

use super::lexer::{Token, TokenKind};
use super::syntax::Span;

/// Tokens after which a line break does not end the statement
const CONTINUES_AFTER: [&str; 29] = [
    "=", ",", "+", "-", "*", "/", "%", "?", ":", ".", "(", "[", "{", "&", "|", "<", ">", "!", "^",
    "~", "extends", "implements", "keyof", "typeof", "instanceof", "in", "as", "satisfies", "new",
];

/// Tokens that continue the previous line's expression
const CONTINUES_BEFORE: [&str; 22] = [
    ".", "?", "(", "[", "+", "-", "*", "/", ",", "=", "&", "|", ":", ">", "<", "%", "^",
    "extends", "implements", "instanceof", "as", "satisfies",
];

/// Tokens of one source text with their bracket structure
pub struct TokenTree<'a> {
    pub source: &'a str,
    pub tokens: &'a [Token],
    /// Bracket depth before each token
    pub depth: Vec<usize>,
    /// Index of the matching closer for each opening bracket
    pub matching: Vec<Option<usize>>,
}

impl<'a> TokenTree<'a> {
    pub fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        let mut depth = Vec::with_capacity(tokens.len());
        let mut matching = vec![None; tokens.len()];
        let mut stack: Vec<usize> = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            depth.push(stack.len());
            if token.kind != TokenKind::Punct {
                continue;
            }
            match token.text(source) {
                "(" | "[" | "{" => stack.push(i),
                ")" | "]" | "}" => {
                    if let Some(open) = stack.pop() {
                        matching[open] = Some(i);
                    }
                }
                _ => {}
            }
        }
        Self {
            source,
            tokens,
            depth,
            matching,
        }
    }

    pub fn text(&self, i: usize) -> &'a str {
        self.tokens
            .get(i)
            .map(|t| t.text(self.source))
            .unwrap_or_default()
    }

    pub fn is(&self, i: usize, text: &str) -> bool {
        self.text(i) == text
    }

    pub fn kind(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|t| t.kind)
    }

    pub fn is_ident(&self, i: usize) -> bool {
        self.kind(i) == Some(TokenKind::Ident)
    }

    pub fn is_string(&self, i: usize) -> bool {
        self.kind(i) == Some(TokenKind::String)
    }

    pub fn span(&self, from: usize, to: usize) -> Span {
        Span::new(self.tokens[from].start, self.tokens[to].end)
    }

    /// Include a trailing semicolon and import attributes
    pub fn finish(&self, mut last: usize) -> usize {
        if matches!(self.text(last + 1), "assert" | "with") && self.is(last + 2, "{") {
            if let Some(close) = self.matching[last + 2] {
                last = close;
            }
        }
        if self.is(last + 1, ";") {
            last += 1;
        }
        last
    }

    pub fn continues(&self, prev: usize, next: usize) -> bool {
        let prev_text = self.text(prev);
        let next_text = self.text(next);
        (self.kind(prev) != Some(TokenKind::String) && CONTINUES_AFTER.contains(&prev_text))
            || CONTINUES_BEFORE.contains(&next_text)
    }

    /// Index one past the last token of the statement starting at `start`
    pub fn statement_end(&self, start: usize) -> usize {
        let base = self.depth[start];
        let mut k = start + 1;
        while k < self.tokens.len() {
            if self.depth[k] < base {
                return k;
            }
            if self.depth[k] == base {
                // A closer recorded at this depth ends the enclosing bracket
                if self.is_closer(k) {
                    return k;
                }
                if self.is(k, ";") {
                    return k + 1;
                }
                if self.tokens[k].newline_before && !self.continues(k - 1, k) {
                    return k;
                }
            }
            k += 1;
        }
        self.tokens.len()
    }

    /// Index one past the body of a block declaration whose head starts at
    /// `start`, or the plain statement end when it has no body
    pub fn block_end(&self, start: usize) -> usize {
        let plain_end = self.statement_end(start);
        let base = self.depth[start];
        for k in start + 1..self.tokens.len() {
            if self.depth[k] == base && self.is(k, ";") {
                break;
            }
            if self.depth[k] == base && self.is(k, "{") {
                if let Some(close) = self.matching[k] {
                    return self.finish(close) + 1;
                }
                break;
            }
            if k >= plain_end && !self.is(k, "{") {
                break;
            }
        }
        plain_end
    }

    /// Binding names of `a = 1, { b, c: d } = x, [e] = y`
    pub fn declarator_names(&self, mut j: usize, end: usize) -> Vec<String> {
        let mut names = Vec::new();
        let base = self.depth[j.min(self.tokens.len().saturating_sub(1))];
        while j < end {
            if matches!(self.text(j), "{" | "[") {
                let close = self.matching[j].unwrap_or(end.saturating_sub(1));
                self.pattern_names(j + 1, close, &mut names);
                j = close + 1;
            } else if self.is_ident(j) {
                names.push(self.text(j).to_string());
                j += 1;
            }
            while j < end && !(self.is(j, ",") && self.depth[j] == base) {
                j += 1;
            }
            j += 1;
        }
        names
    }

    pub fn pattern_names(&self, mut j: usize, close: usize, names: &mut Vec<String>) {
        while j < close {
            match self.text(j) {
                "{" | "[" => {
                    let inner = self.matching[j].unwrap_or(close);
                    self.pattern_names(j + 1, inner, names);
                    j = inner + 1;
                }
                "=" => {
                    let level = self.depth[j];
                    j += 1;
                    while j < close && !(self.is(j, ",") && self.depth[j] == level) {
                        j += 1;
                    }
                }
                "." | "," => j += 1,
                _ if self.is_ident(j) => {
                    if !self.is(j + 1, ":") {
                        names.push(self.text(j).to_string());
                    }
                    j += 1;
                }
                _ => j += 1,
            }
        }
    }

    /// Names declared by `function|class|enum|namespace <name>` at `j`
    pub fn declared_name(&self, mut j: usize) -> Option<String> {
        while matches!(self.text(j), "async" | "function" | "*" | "class" | "abstract" | "const" | "enum" | "namespace" | "module") {
            j += 1;
        }
        self.is_ident(j).then(|| self.text(j).to_string())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Closer of the bracket at `open`, or the last token when unbalanced
    pub fn close_of(&self, open: usize) -> usize {
        self.matching
            .get(open)
            .copied()
            .flatten()
            .unwrap_or(self.tokens.len().saturating_sub(1))
    }

    /// No whitespace between tokens `a` and `b`
    pub fn adjacent(&self, a: usize, b: usize) -> bool {
        match (self.tokens.get(a), self.tokens.get(b)) {
            (Some(first), Some(second)) => first.end == second.start,
            _ => false,
        }
    }

    pub fn is_closer(&self, i: usize) -> bool {
        self.kind(i) == Some(TokenKind::Punct) && matches!(self.text(i), ")" | "]" | "}")
    }

    /// `=>` starting at `i`
    pub fn is_arrow(&self, i: usize) -> bool {
        self.is(i, "=") && self.is(i + 1, ">") && self.adjacent(i, i + 1)
    }
}
