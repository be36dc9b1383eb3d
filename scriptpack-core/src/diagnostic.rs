//! Compiler diagnostics

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Severity of a diagnostic, serialized as its number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Warning = 0,
    Error = 1,
    Suggestion = 2,
    Message = 3,
}

impl DiagnosticCategory {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Warning),
            1 => Some(Self::Error),
            2 => Some(Self::Suggestion),
            3 => Some(Self::Message),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Suggestion => "suggestion",
            Self::Message => "message",
        }
    }
}

impl Serialize for DiagnosticCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for DiagnosticCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown diagnostic category {}", code)))
    }
}

/// A message with nested detail lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageChain {
    pub message_text: String,
    pub category: DiagnosticCategory,
    pub code: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next: Vec<MessageChain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticMessage {
    Text(String),
    Chain(MessageChain),
}

impl DiagnosticMessage {
    /// The head line of the message
    pub fn text(&self) -> &str {
        match self {
            DiagnosticMessage::Text(text) => text,
            DiagnosticMessage::Chain(chain) => &chain.message_text,
        }
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticMessage::Text(text) => f.write_str(text),
            DiagnosticMessage::Chain(chain) => {
                fn write_chain(f: &mut fmt::Formatter<'_>, chain: &MessageChain, indent: usize) -> fmt::Result {
                    if indent > 0 {
                        write!(f, "\n{:width$}", "", width = indent * 2)?;
                    }
                    f.write_str(&chain.message_text)?;
                    for next in &chain.next {
                        write_chain(f, next, indent + 1)?;
                    }
                    Ok(())
                }
                write_chain(f, chain, 0)
            }
        }
    }
}

/// One diagnostic of a compile pass. Offsets count characters of the file
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: Option<String>,
    pub start: Option<usize>,
    pub length: Option<usize>,
    pub message: DiagnosticMessage,
    pub category: DiagnosticCategory,
    pub code: u32,
}

impl Diagnostic {
    /// An error not attached to a file
    pub fn global(code: u32, message: impl Into<DiagnosticMessage>) -> Self {
        Self {
            file: None,
            start: None,
            length: None,
            message: message.into(),
            category: DiagnosticCategory::Error,
            code,
        }
    }

    /// An error at a byte range of `text`
    pub fn at(file: &str, text: &str, byte_start: usize, byte_end: usize, code: u32, message: impl Into<DiagnosticMessage>) -> Self {
        let start = char_offset(text, byte_start);
        let end = char_offset(text, byte_end);
        Self {
            file: Some(file.to_string()),
            start: Some(start),
            length: Some(end - start),
            message: message.into(),
            category: DiagnosticCategory::Error,
            code,
        }
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

impl From<String> for DiagnosticMessage {
    fn from(text: String) -> Self {
        DiagnosticMessage::Text(text)
    }
}

impl From<&str> for DiagnosticMessage {
    fn from(text: &str) -> Self {
        DiagnosticMessage::Text(text.to_string())
    }
}

impl From<MessageChain> for DiagnosticMessage {
    fn from(chain: MessageChain) -> Self {
        DiagnosticMessage::Chain(chain)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}", file)?;
            if let Some(start) = self.start {
                write!(f, "({})", start)?;
            }
            f.write_str(": ")?;
        }
        write!(f, "{} TS{}: {}", self.category.as_str(), self.code, self.message)
    }
}

fn char_offset(text: &str, byte: usize) -> usize {
    let byte = byte.min(text.len());
    text.char_indices().take_while(|(i, _)| *i < byte).count()
}
