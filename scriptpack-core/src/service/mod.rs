//! Compiler service
//!
//! The compiler is reached only through [`CompilerService`]; the session
//! hands it root file names, emit options and a [`CompilerHost`]. The
//! bundled [`AmdLinker`] strips types and links modules into AMD `define`
//! calls without a full type checker.

pub mod bindings;
pub mod decorate;
pub mod emit;
pub mod erase;
pub mod linker;

pub use linker::AmdLinker;

use scriptpack_config::EmitOptions;

use crate::diagnostic::Diagnostic;
use crate::host::CompilerHost;

/// A program-level compiler
pub trait CompilerService: Send + Sync {
    /// Compile `root_names` as one program and write outputs through
    /// `host`; returns pre-emit and emit diagnostics
    fn emit(&self, root_names: &[String], options: &EmitOptions, host: &mut dyn CompilerHost) -> Vec<Diagnostic>;
}
