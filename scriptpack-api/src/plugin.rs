//! Plugin Script Resolver
//!
//! Turns a plugin descriptor into the script a plugin loader runs. A literal
//! script is passed through untouched; everything else goes through a fresh
//! preset session per call.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use scriptpack_core::manifest::{absolutize, normalize_path};
use scriptpack_core::{
    capability_packages, AmdLinker, Capabilities, CompiledBundle, Compiler, Package, Preset,
    PresetCompiler,
};

use crate::config::RunConfig;
use crate::error::ScriptpackError;

/// A declared plugin dependency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyOptions {
    pub version: Option<String>,
    /// Declaration text registered when the package is not fetched
    pub dts: Option<String>,
}

/// Plugin descriptor as handed over by a plugin loader
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginOptions {
    /// Ready-to-run script text; skips compilation entirely
    pub script: Option<String>,
    /// A `.ts` entry file, or a directory of sources
    pub script_path: Option<String>,
    /// Directory a relative `.ts` entry is resolved against
    pub module_path: Option<String>,
    pub dependencies: BTreeMap<String, DependencyOptions>,
    pub plugins: Capabilities,
}

impl PluginOptions {
    /// Parse a JSON descriptor
    pub fn from_json(text: &str) -> Result<Self, ScriptpackError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse the JSON descriptor at `path` through the config's loader
    pub async fn read(path: &Path, config: &RunConfig) -> Result<Self, ScriptpackError> {
        let text = config.loader.read_to_string(path).await?;
        Self::from_json(&text)
    }

    fn literal_script(&self) -> Option<&str> {
        self.script.as_deref().filter(|s| !s.is_empty())
    }
}

/// Join `path` onto the resolved `roots`.
///
/// Roots are joined left to right, so an absolute root restarts the chain.
/// Returns `None` when the result leaves the root and `allow_outside` is
/// not set.
pub fn resolve_file_path<P: AsRef<Path>>(roots: &[P], path: &str, allow_outside: bool) -> Option<PathBuf> {
    let root = absolutize(&roots.iter().fold(PathBuf::new(), |acc, r| acc.join(r)));
    let result = normalize_path(&root.join(path));
    if allow_outside || result.starts_with(&root) {
        Some(result)
    } else {
        None
    }
}

/// Script for `options`: the literal script, or the output of a compile.
///
/// Compile diagnostics are logged, not returned; `Ok(None)` means the
/// compile produced no output.
#[instrument(target = "scriptpack::resolver", skip_all, fields(script_path = ?options.script_path))]
pub async fn plugin_script(options: &PluginOptions, config: &RunConfig) -> Result<Option<String>, ScriptpackError> {
    if let Some(script) = options.literal_script() {
        debug!(target: "scriptpack::resolver", "using literal script");
        return Ok(Some(script.to_string()));
    }
    let bundle = compile_plugin(options, config, false).await?;
    for diagnostic in &bundle.errors {
        warn!(
            target: "scriptpack::resolver",
            file = diagnostic.file.as_deref().unwrap_or("<global>"),
            start = diagnostic.start,
            code = diagnostic.code,
            "{}",
            diagnostic.message.text()
        );
    }
    Ok(bundle.script)
}

/// Compile `options` and return the whole bundle
#[instrument(target = "scriptpack::resolver", skip_all, fields(script_path = ?options.script_path))]
pub async fn compile_plugin(
    options: &PluginOptions,
    config: &RunConfig,
    emit_declarations: bool,
) -> Result<CompiledBundle, ScriptpackError> {
    if let Some(script) = options.literal_script() {
        return Ok(CompiledBundle {
            script: Some(script.to_string()),
            ..CompiledBundle::default()
        });
    }
    let script_path = options.script_path.as_deref().ok_or(ScriptpackError::MissingEntry)?;

    let compiler_config = config.compiler_config();
    let presets = compiler_config.presets.clone();
    let preset = Preset::for_capabilities(&options.plugins);
    let session = Compiler::with_parts(compiler_config, config.loader.clone(), Arc::new(AmdLinker::new()));
    let mut compiler = PresetCompiler::new(preset, session).await;
    info!(target: "scriptpack::resolver", preset = ?preset, script_path, "compiling plugin");

    for name in capability_packages(&options.plugins, &presets) {
        compiler.add_package(&name, None).await;
    }
    for (name, dependency) in &options.dependencies {
        if presets.fetched_dependencies.contains(name) {
            compiler.add_package(name, None).await;
        } else if let Some(dts) = &dependency.dts {
            let version = dependency.version.as_deref().unwrap_or("*");
            let package = Package::inline(name.as_str(), version, None, dts.as_str());
            compiler.add_package(name, Some(package)).await;
        } else {
            debug!(target: "scriptpack::resolver", package = %name, "dependency without declarations skipped");
        }
    }

    ingest_entry(&mut compiler, options, script_path, &config.root_dir).await?;
    Ok(compiler.compile(emit_declarations).await)
}

/// Ingest a `.ts` entry as one file, anything else as a directory
async fn ingest_entry(
    compiler: &mut Compiler,
    options: &PluginOptions,
    script_path: &str,
    root: &Path,
) -> Result<(), ScriptpackError> {
    let path = Path::new(script_path);
    if script_path.ends_with(".ts") {
        let file = if path.is_absolute() {
            Some(path.to_path_buf())
        } else if let Some(module_path) = options.module_path.as_deref() {
            resolve_file_path(&[root, Path::new(module_path)], script_path, true)
        } else {
            resolve_file_path(&[root], script_path, true)
        };
        let file = file.ok_or_else(|| ScriptpackError::OutsideRoot { path: path.to_path_buf() })?;
        debug!(target: "scriptpack::resolver", file = %file.display(), "entry file");
        compiler.ingest_file(file, None).await?;
        return Ok(());
    }

    let dir = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let dir = resolve_file_path(&[root], script_path, true)
            .ok_or_else(|| ScriptpackError::OutsideRoot { path: path.to_path_buf() })?;
        // A `directories.bin` override must stay inside the package
        match compiler.registry().locator().script_dir(&dir).await {
            Some(bin) if bin.starts_with(&dir) => bin,
            _ => dir,
        }
    };
    debug!(target: "scriptpack::resolver", dir = %dir.display(), "entry directory");
    compiler.ingest_directory(dir).await?;
    Ok(())
}
