//! Scriptpack Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all Scriptpack crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Output module format of the compiled bundle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Named `define(...)` blocks, one per source file
    #[default]
    Amd,
}

/// Language level of the emitted script
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScriptTarget {
    Es5,
    #[default]
    Es2017,
}

/// Options handed to the compiler service for one emit pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmitOptions {
    pub allow_js: bool,
    pub always_strict: bool,
    /// Emit a declaration file next to the script
    pub declaration: bool,
    /// Only emit the declaration file
    pub emit_declaration_only: bool,
    pub experimental_decorators: bool,
    pub resolve_json_module: bool,
    pub module: ModuleKind,
    /// Suppress all output when any error diagnostic is reported
    pub no_emit_on_error: bool,
    /// Single output file all modules are concatenated into
    pub out_file: String,
    pub target: ScriptTarget,
}

impl EmitOptions {
    /// Configuration of the implementation pass
    pub fn implementation() -> Self {
        Self {
            allow_js: false,
            always_strict: true,
            declaration: false,
            emit_declaration_only: false,
            experimental_decorators: true,
            resolve_json_module: false,
            module: ModuleKind::Amd,
            no_emit_on_error: true,
            out_file: String::from("index.js"),
            target: ScriptTarget::Es2017,
        }
    }

    /// Configuration of the declaration-only pass
    pub fn declarations() -> Self {
        Self {
            declaration: true,
            emit_declaration_only: true,
            target: ScriptTarget::Es5,
            ..Self::implementation()
        }
    }

    /// Name of the declaration output derived from `out_file`
    pub fn declaration_file(&self) -> String {
        let stem = self
            .out_file
            .strip_suffix(".js")
            .unwrap_or(self.out_file.as_str());
        format!("{}.d.ts", stem)
    }
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self::implementation()
    }
}

/// Package names used by the plugin presets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PresetConfig {
    /// Plugin runtime type packages, registered first by every preset
    pub runtime_types: Vec<String>,
    /// Numeric precision package, registered by every preset
    pub numeric: String,
    /// Blockchain interaction package added by the wallet preset
    pub blockchain: String,
    /// Package registered when a plugin requests database access
    pub database: String,
    /// Package registered when a plugin requests wallet access
    pub wallet: String,
    /// Declared dependencies fetched from the package ecosystem instead of
    /// registered from caller supplied declarations
    pub fetched_dependencies: Vec<String>,
    /// Packages whose implementation text is never loaded
    pub type_only: Vec<String>,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            runtime_types: vec![
                String::from("@ijstech/plugin"),
                String::from("@ijstech/types"),
            ],
            numeric: String::from("bignumber.js"),
            blockchain: String::from("@ijstech/eth-contract"),
            database: String::from("@ijstech/pdm"),
            wallet: String::from("@ijstech/wallet"),
            fetched_dependencies: vec![
                String::from("bignumber.js"),
                String::from("@ijstech/crypto"),
                String::from("@ijstech/eth-contract"),
            ],
            type_only: vec![
                String::from("@ijstech/plugin"),
                String::from("@ijstech/types"),
            ],
        }
    }
}

/// Configuration for one compiler session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Options of the implementation pass
    pub script: EmitOptions,
    /// Options of the declaration pass
    pub declarations: EmitOptions,
    /// Directory package manifests are searched from, upwards
    pub package_root: PathBuf,
    /// Upper bound for a single dependency resolver call, in milliseconds.
    /// `None` waits indefinitely.
    pub resolver_timeout_ms: Option<u64>,
    pub presets: PresetConfig,
}

impl CompilerConfig {
    /// Resolver timeout as a `Duration`
    pub fn resolver_timeout(&self) -> Option<Duration> {
        self.resolver_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            script: EmitOptions::implementation(),
            declarations: EmitOptions::declarations(),
            package_root: PathBuf::from("."),
            resolver_timeout_ms: None,
            presets: PresetConfig::default(),
        }
    }
}

/// Log verbosity, mirrors the tracing levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Global level plus per-phase overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub global: LogLevel,
    pub walker: Option<LogLevel>,
    pub registry: Option<LogLevel>,
    pub host: Option<LogLevel>,
    pub compiler: Option<LogLevel>,
    pub resolver: Option<LogLevel>,
}

impl LoggingConfig {
    /// Effective level of a phase
    pub fn level_for(&self, phase: Phase) -> LogLevel {
        let specific = match phase {
            Phase::Walker => self.walker,
            Phase::Registry => self.registry,
            Phase::Host => self.host,
            Phase::Compiler => self.compiler,
            Phase::Resolver => self.resolver,
        };
        specific.unwrap_or(self.global)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global: LogLevel::Info,
            walker: None,
            registry: None,
            host: None,
            compiler: None,
            resolver: None,
        }
    }
}

/// Pipeline phase, used for phase-specific log targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Walker,
    Registry,
    Host,
    Compiler,
    Resolver,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Walker,
        Phase::Registry,
        Phase::Host,
        Phase::Compiler,
        Phase::Resolver,
    ];

    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Walker => "walker",
            Phase::Registry => "registry",
            Phase::Host => "host",
            Phase::Compiler => "compiler",
            Phase::Resolver => "resolver",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("scriptpack::{}", self.as_str())
    }
}
