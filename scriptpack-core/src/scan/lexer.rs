//! Token scanner for the scripting dialect
//!
//! Only as much lexing as module discovery needs: comments and whitespace are
//! skipped, string/template/regex literals become single tokens, and every
//! punctuation character is its own token.

/// Token kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    String,
    Template,
    Number,
    Regex,
    Punct,
}

/// A token, addressed by byte offsets into the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// A line break separates this token from the previous one
    pub newline_before: bool,
}

impl Token {
    /// Source text of the token
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Keywords after which a `/` starts a regular expression
const REGEX_PREFIX_KEYWORDS: [&str; 14] = [
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Streaming tokenizer
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    prev: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            prev: None,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skip whitespace and comments, reporting whether a line break was seen
    fn skip_trivia(&mut self) -> bool {
        let mut newline = false;
        while let Some(c) = self.peek() {
            match c {
                '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                    newline = true;
                    self.bump();
                }
                c if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump();
                }
                '/' if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.pos += 2;
                    loop {
                        match self.bump() {
                            None => break,
                            Some('\n') => newline = true,
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ => break,
            }
        }
        newline
    }

    fn scan_string(&mut self, quote: char) {
        self.bump();
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '\n' => break,
                c if c == quote => break,
                _ => {}
            }
        }
    }

    fn scan_template(&mut self) {
        self.bump();
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '`' => return,
                '$' if self.peek() == Some('{') => {
                    self.bump();
                    let mut depth = 1usize;
                    while let Some(token) = self.next_token() {
                        if token.kind == TokenKind::Punct {
                            match token.text(self.source) {
                                "{" => depth += 1,
                                "}" => {
                                    depth -= 1;
                                    if depth == 0 {
                                        break;
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Returns false when no closing slash exists on the line
    fn scan_regex(&mut self) -> bool {
        let start = self.pos;
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                None | Some('\n') => {
                    self.pos = start;
                    return false;
                }
                Some('\\') => {
                    self.bump();
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        while matches!(self.peek(), Some(c) if is_ident_part(c)) {
            self.bump();
        }
        true
    }

    fn regex_allowed(&self) -> bool {
        match self.prev {
            None => true,
            Some(prev) => {
                let text = prev.text(self.source);
                match prev.kind {
                    TokenKind::Punct => !matches!(text, ")" | "]" | "}"),
                    TokenKind::Ident => REGEX_PREFIX_KEYWORDS.contains(&text),
                    _ => false,
                }
            }
        }
    }

    /// Scan the next token
    pub fn next_token(&mut self) -> Option<Token> {
        let newline_before = self.skip_trivia();
        let start = self.pos;
        let c = self.peek()?;

        let kind = match c {
            '"' | '\'' => {
                self.scan_string(c);
                TokenKind::String
            }
            '`' => {
                self.scan_template();
                TokenKind::Template
            }
            c if is_ident_start(c) => {
                while matches!(self.peek(), Some(c) if is_ident_part(c)) {
                    self.bump();
                }
                TokenKind::Ident
            }
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '.' || c == '_')
                {
                    self.bump();
                }
                TokenKind::Number
            }
            '/' if self.regex_allowed() && self.scan_regex() => TokenKind::Regex,
            _ => {
                self.bump();
                TokenKind::Punct
            }
        };

        let token = Token {
            kind,
            start,
            end: self.pos,
            newline_before,
        };
        self.prev = Some(token);
        Some(token)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

/// Tokenize a whole source text
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Value of a string literal token, without quotes and with simple escapes
/// resolved
pub fn string_value(literal: &str) -> String {
    let inner = literal
        .get(1..literal.len().saturating_sub(1))
        .unwrap_or_default();
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some('0') => value.push('\0'),
            Some(other) => value.push(other),
            None => {}
        }
    }
    value
}
