//! Compiler session errors
//!
//! Only explicit ingestion reads fail loudly. Resolution misses and package
//! lookups recover on their own and end up as diagnostics or stubs.

use thiserror::Error;

use scriptpack_vfs::LoadError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    /// An explicitly requested file or directory could not be read
    #[error("cannot ingest source: {0}")]
    Load(#[from] LoadError),
}

pub type CompilerResult<T> = Result<T, CompilerError>;
