//! Compiler presets
//!
//! A preset is the ordered list of packages registered before any user
//! content, chosen from the capabilities a plugin asks for.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use tracing::debug;

use scriptpack_config::PresetConfig;

use crate::compiler::{CompiledBundle, Compiler};

/// Optional plugin kinds a plugin requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub db: bool,
    pub wallet: bool,
    pub cache: bool,
    pub queue: bool,
    pub message: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Runtime types and the numeric package
    Base,
    /// Base plus the blockchain package
    Wallet,
}

impl Preset {
    pub fn for_capabilities(capabilities: &Capabilities) -> Self {
        if capabilities.wallet {
            Preset::Wallet
        } else {
            Preset::Base
        }
    }

    /// Packages registered before user content, in order
    pub fn baseline_packages(&self, config: &PresetConfig) -> Vec<String> {
        let mut packages = config.runtime_types.clone();
        packages.push(config.numeric.clone());
        if *self == Preset::Wallet {
            packages.push(config.blockchain.clone());
        }
        packages
    }
}

/// Packages a plugin's capabilities pull in on top of its preset
pub fn capability_packages(capabilities: &Capabilities, config: &PresetConfig) -> Vec<String> {
    let mut packages = Vec::new();
    if capabilities.db {
        packages.push(config.database.clone());
    }
    if capabilities.wallet {
        packages.push(config.wallet.clone());
        packages.push(config.blockchain.clone());
    }
    packages
}

/// A [`Compiler`] that keeps its preset's baseline registered
pub struct PresetCompiler {
    preset: Preset,
    compiler: Compiler,
}

impl PresetCompiler {
    /// Wrap `compiler` and register the baseline packages
    pub async fn new(preset: Preset, compiler: Compiler) -> Self {
        let mut this = Self { preset, compiler };
        this.init().await;
        this
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn into_inner(self) -> Compiler {
        self.compiler
    }

    async fn init(&mut self) {
        let packages = self.preset.baseline_packages(&self.compiler.config().presets);
        debug!(target: "scriptpack::compiler", preset = ?self.preset, packages = ?packages, "registering baseline");
        for name in packages {
            self.compiler.add_package(&name, None).await;
        }
    }

    /// Re-register the baseline, which is a no-op unless the session was
    /// reset, then compile
    pub async fn compile(&mut self, emit_declarations: bool) -> CompiledBundle {
        self.init().await;
        self.compiler.compile(emit_declarations)
    }
}

impl Deref for PresetCompiler {
    type Target = Compiler;

    fn deref(&self) -> &Self::Target {
        &self.compiler
    }
}

impl DerefMut for PresetCompiler {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.compiler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::AmdLinker;
    use scriptpack_config::CompilerConfig;
    use scriptpack_vfs::MemoryLoader;
    use std::sync::Arc;

    fn compiler() -> Compiler {
        let config = CompilerConfig {
            package_root: "/app".into(),
            ..Default::default()
        };
        Compiler::with_parts(config, Arc::new(MemoryLoader::new()), Arc::new(AmdLinker::new()))
    }

    #[test]
    fn test_preset_selection() {
        assert_eq!(Preset::for_capabilities(&Capabilities::default()), Preset::Base);
        let wallet = Capabilities {
            wallet: true,
            ..Default::default()
        };
        assert_eq!(Preset::for_capabilities(&wallet), Preset::Wallet);
    }

    #[test]
    fn test_baseline_order() {
        let config = PresetConfig::default();
        assert_eq!(
            Preset::Base.baseline_packages(&config),
            ["@ijstech/plugin", "@ijstech/types", "bignumber.js"]
        );
        assert_eq!(
            Preset::Wallet.baseline_packages(&config).last().map(String::as_str),
            Some("@ijstech/eth-contract")
        );
    }

    #[test]
    fn test_capability_packages() {
        let config = PresetConfig::default();
        let caps = Capabilities {
            db: true,
            wallet: true,
            ..Default::default()
        };
        assert_eq!(
            capability_packages(&caps, &config),
            ["@ijstech/pdm", "@ijstech/wallet", "@ijstech/eth-contract"]
        );
        assert!(capability_packages(&Capabilities::default(), &config).is_empty());
    }

    #[tokio::test]
    async fn test_baseline_is_registered_and_restored_after_reset() {
        let mut compiler = PresetCompiler::new(Preset::Base, compiler()).await;
        // Nothing is installed, so every baseline package is an opaque stub
        assert!(compiler.store().has_package("bignumber.js"));
        assert_eq!(compiler.store().package("@ijstech/plugin").unwrap().version, "*");

        compiler.reset();
        assert!(!compiler.store().has_package("bignumber.js"));
        compiler.ingest_text("index.ts", "export default 1;", None, None).await;
        let bundle = compiler.compile(false).await;
        assert!(bundle.errors.is_empty());
        assert!(compiler.store().has_package("bignumber.js"));
    }
}
