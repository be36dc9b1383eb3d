//! Scriptpack API - plugin script orchestration layer
//!
//! Provides the unified entry points on top of the compiler session:
//! - Plugin Script Resolver ([`plugin_script`], [`compile_plugin`])
//! - Configuration abstraction ([`RunConfig`])
//! - Unified error handling ([`ScriptpackError`])
//!
//! For CLI convenience, this crate provides a global singleton config.
//! For library use, pass a [`RunConfig`] explicitly.

pub mod config;
pub mod error;
pub mod plugin;

pub use config::{config as get_config, init as init_config, is_initialized, RunConfig};
pub use error::ScriptpackError;
pub use plugin::{compile_plugin, plugin_script, resolve_file_path, DependencyOptions, PluginOptions};

// Re-export config and core types
pub use scriptpack_config;
pub use scriptpack_config::{CompilerConfig, EmitOptions, LogLevel, LoggingConfig, Phase, PresetConfig};
pub use scriptpack_core::{Capabilities, CompiledBundle, Diagnostic, PackageSummary, Preset};
