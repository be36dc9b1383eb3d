//! Source scanning
//!
//! Turns TypeScript source text into tokens and the top-level module
//! declarations the walker and the linker work from.

pub mod lexer;
pub mod syntax;
pub mod tree;

pub use lexer::{tokenize, Token, TokenKind};
pub use tree::TokenTree;
pub use syntax::{
    amd_module_name, DeclKind, DefaultTarget, ErasedDecl, ExportDecl, ExportSurface, ImportClause,
    ImportDecl, ImportKind, ImportRef, ModuleSyntax, NamedBinding, Span, Specifier,
};

/// Module references of a source text in source order
pub fn scan_imports(source: &str) -> Vec<ImportRef> {
    ModuleSyntax::parse(source).module_refs()
}
