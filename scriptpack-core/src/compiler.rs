//! Compiler session
//!
//! Owns the files and packages of one compilation. Ingestion entry points
//! feed the store; [`Compiler::compile`] hands the accumulated root list to
//! the compiler service through a [`CompilationHost`]. State only grows
//! until [`Compiler::reset`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use scriptpack_config::CompilerConfig;
use scriptpack_vfs::{native_loader, SourceLoader};

use crate::diagnostic::Diagnostic;
use crate::error::CompilerResult;
use crate::host::CompilationHost;
use crate::ingest;
use crate::manifest::ManifestLocator;
use crate::registry::PackageRegistry;
use crate::service::{AmdLinker, CompilerService};
use crate::store::{FileStore, Package, PackageSummary, SessionState};
use crate::walker::{record_references, DependencyResolver, DependencyWalker};

/// Logical name of a file ingested without one
pub const DEFAULT_ENTRY: &str = "index.ts";

/// Result of one `compile` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledBundle {
    pub errors: Vec<Diagnostic>,
    /// `None` when the service refused to emit
    pub script: Option<String>,
    pub dependencies: BTreeMap<String, PackageSummary>,
    pub dts: String,
}

impl CompiledBundle {
    pub fn is_hard_failure(&self) -> bool {
        self.script.is_none()
    }
}

/// Header naming the AMD module a package-scoped file registers as
pub fn amd_header(package: &str) -> String {
    format!("///<amd-module name='{}'/> \n", package)
}

pub struct Compiler {
    state: SessionState,
    registry: PackageRegistry,
    loader: Arc<dyn SourceLoader>,
    service: Arc<dyn CompilerService>,
    config: CompilerConfig,
}

impl Compiler {
    /// Session over the native file system with the built-in linker
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_parts(config, Arc::new(native_loader()), Arc::new(AmdLinker::new()))
    }

    pub fn with_parts(
        config: CompilerConfig,
        loader: Arc<dyn SourceLoader>,
        service: Arc<dyn CompilerService>,
    ) -> Self {
        let locator = ManifestLocator::new(&config.package_root, loader.clone());
        let registry = PackageRegistry::new(locator, config.presets.type_only.clone());
        Self {
            state: SessionState::new(),
            registry,
            loader,
            service,
            config,
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn store(&self) -> &FileStore {
        &self.state.store
    }

    /// Root names in ingestion order
    pub fn file_names(&self) -> &[String] {
        &self.state.file_names
    }

    pub fn dependencies(&self) -> &BTreeMap<String, PackageSummary> {
        &self.state.closure
    }

    pub fn registry(&self) -> &PackageRegistry {
        &self.registry
    }

    pub fn loader(&self) -> &Arc<dyn SourceLoader> {
        &self.loader
    }

    /// Ingest every source file below `dir` under its relative path
    pub async fn ingest_directory(&mut self, dir: impl AsRef<Path>) -> CompilerResult<BTreeMap<String, String>> {
        self.ingest_directory_as(dir, "", "").await
    }

    /// Ingest every source file below `dir` as `<package>/<parent>/<relative path>`
    pub async fn ingest_directory_as(
        &mut self,
        dir: impl AsRef<Path>,
        parent: &str,
        package: &str,
    ) -> CompilerResult<BTreeMap<String, String>> {
        let files =
            ingest::ingest_directory(self.loader.as_ref(), &mut self.state, dir.as_ref(), parent, package).await?;
        info!(
            target: "scriptpack::compiler",
            dir = %dir.as_ref().display(),
            files = files.len(),
            "ingested directory"
        );
        Ok(files)
    }

    /// Read one file into the session as `logical_name` (`index.ts` by default)
    #[instrument(target = "scriptpack::compiler", skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn ingest_file(&mut self, path: impl AsRef<Path>, logical_name: Option<&str>) -> CompilerResult<()> {
        let text = self.loader.read_to_string(path.as_ref()).await?;
        let name = logical_name.unwrap_or(DEFAULT_ENTRY);
        self.state.add_file(name, text.as_str(), None);
        debug!(target: "scriptpack::compiler", name, "ingested file");
        Ok(())
    }

    /// Register `text` as `name`.
    ///
    /// With a package name the text is prefixed by an AMD module header. With
    /// a resolver the imports of the file are walked immediately; the newly
    /// registered files and packages are returned.
    #[instrument(target = "scriptpack::compiler", skip(self, text, resolver))]
    pub async fn ingest_text(
        &mut self,
        name: &str,
        text: &str,
        package: Option<&str>,
        resolver: Option<&dyn DependencyResolver>,
    ) -> Vec<String> {
        let text = match package {
            Some(package) => format!("{}{}", amd_header(package), text),
            None => text.to_string(),
        };
        self.state.add_file(name, text.as_str(), package.map(str::to_string));

        let Some(resolver) = resolver else {
            return Vec::new();
        };
        let walker = DependencyWalker::new(&self.registry, resolver).with_timeout(self.config.resolver_timeout());
        walker.walk(&mut self.state, name, &text).await
    }

    /// Register `package` under `name`, or look it up when `None`.
    /// The first registration of a name wins.
    pub async fn add_package(&mut self, name: &str, package: Option<Package>) -> Arc<Package> {
        match package {
            Some(package) => self.registry.register(&mut self.state, name, package).await,
            None => self.registry.get_or_create(&mut self.state, name).await,
        }
    }

    /// Compile the accumulated roots.
    ///
    /// Roots that were never walked have their imports followed through
    /// known files first, so the closure covers every root. Diagnostics come
    /// from the implementation pass. With `emit_declarations` a second,
    /// declaration-only pass fills `dts`.
    #[instrument(target = "scriptpack::compiler", skip(self), fields(roots = self.state.file_names.len()))]
    pub fn compile(&mut self, emit_declarations: bool) -> CompiledBundle {
        record_references(&mut self.state);
        let mut host = CompilationHost::new(&self.state.store);
        let errors = self
            .service
            .emit(&self.state.file_names, &self.config.script, &mut host);
        let script = host.into_output().script;

        let mut dts = String::new();
        if emit_declarations {
            let mut host = CompilationHost::new(&self.state.store);
            self.service
                .emit(&self.state.file_names, &self.config.declarations, &mut host);
            dts = host.into_output().declarations.unwrap_or_default();
        }

        info!(
            target: "scriptpack::compiler",
            diagnostics = errors.len(),
            emitted = script.is_some(),
            dependencies = self.state.closure.len(),
            "compiled"
        );
        CompiledBundle {
            errors,
            script,
            dependencies: self.state.closure.clone(),
            dts,
        }
    }

    /// Drop every file, package and recorded dependency
    pub fn reset(&mut self) {
        debug!(target: "scriptpack::compiler", "reset session");
        self.state.clear();
    }
}
