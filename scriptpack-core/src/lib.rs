//! Scriptpack core
//!
//! An on-demand compiler session for TypeScript plugin scripts:
//!
//! - [`store`]: in-memory files and packages of a session
//! - [`scan`]: tokenizer and top-level module syntax
//! - [`walker`]: recursive import discovery through a [`DependencyResolver`]
//! - [`registry`] / [`manifest`]: package materialization with fallbacks
//! - [`host`]: the compiler service's view of the session
//! - [`service`]: the compiler service seam and the built-in AMD linker
//! - [`compiler`]: the session itself
//! - [`preset`]: baseline packages per plugin kind

pub mod compiler;
pub mod diagnostic;
pub mod error;
pub mod host;
pub mod ingest;
pub mod manifest;
pub mod preset;
pub mod registry;
pub mod scan;
pub mod service;
pub mod store;
pub mod walker;

pub use compiler::{CompiledBundle, Compiler, DEFAULT_ENTRY};
pub use diagnostic::{Diagnostic, DiagnosticCategory, DiagnosticMessage, MessageChain};
pub use error::{CompilerError, CompilerResult};
pub use host::{CompilationHost, CompilerHost, HostSourceFile, ResolvedModule};
pub use manifest::{ManifestError, ManifestLocator, PackageManifest};
pub use preset::{capability_packages, Capabilities, Preset, PresetCompiler};
pub use registry::PackageRegistry;
pub use service::{AmdLinker, CompilerService};
pub use store::{FileStore, Package, PackageSummary, SessionState, SourceFile};
pub use walker::{record_references, resolve_absolute_path, DependencyResolver, DependencyWalker, ResolvedDependency};
