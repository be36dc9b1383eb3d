//! API 层配置
//!
//! 包含执行配置 RunConfig 和全局单例（供 CLI 使用）

use once_cell::sync::OnceCell;
use scriptpack_config::{CompilerConfig, LoggingConfig};
use scriptpack_vfs::{native_loader, SourceLoader};
use std::path::PathBuf;
use std::sync::Arc;

/// Execution configuration
#[derive(Clone)]
pub struct RunConfig {
    /// Where relative script paths and package lookup start
    pub root_dir: PathBuf,
    /// Compiler configuration; its package root is replaced by `root_dir`
    pub compiler: CompilerConfig,
    pub logging: LoggingConfig,
    /// Storage the sessions read from
    pub loader: Arc<dyn SourceLoader>,
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("root_dir", &self.root_dir)
            .field("compiler", &self.compiler)
            .field("logging", &self.logging)
            .finish()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            compiler: CompilerConfig::default(),
            logging: LoggingConfig::default(),
            loader: Arc::new(native_loader()),
        }
    }
}

impl RunConfig {
    /// Configuration rooted at `root_dir`
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Same configuration reading from `loader`
    pub fn with_loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Compiler configuration of one plugin session
    pub fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig {
            package_root: self.root_dir.clone(),
            ..self.compiler.clone()
        }
    }
}

// Global config singleton for CLI convenience
static GLOBAL_CONFIG: OnceCell<RunConfig> = OnceCell::new();

/// Initialize global configuration (must be called once before any operation)
///
/// # Panics
/// If config is already initialized
pub fn init(config: RunConfig) {
    GLOBAL_CONFIG
        .set(config)
        .expect("Config already initialized");
}

/// Get global config reference
///
/// # Panics
/// If config is not initialized
pub fn config() -> &'static RunConfig {
    GLOBAL_CONFIG.get().expect("Config not initialized")
}

/// Check if config is initialized
pub fn is_initialized() -> bool {
    GLOBAL_CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_config() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.root_dir, PathBuf::from("."));
        assert_eq!(cfg.compiler.script.out_file, "index.js");
        assert!(cfg.compiler.resolver_timeout().is_none());
    }

    #[test]
    fn test_compiler_config_uses_root_dir() {
        let cfg = RunConfig::with_root("/srv/plugins");
        assert_eq!(cfg.compiler_config().package_root, PathBuf::from("/srv/plugins"));
        assert_eq!(cfg.compiler_config().presets, cfg.compiler.presets);
    }

    #[test]
    fn test_run_config_debug() {
        let cfg = RunConfig::default();
        let debug_str = format!("{:?}", cfg);
        assert!(debug_str.contains("root_dir"));
        assert!(debug_str.contains("compiler"));
        assert!(debug_str.contains("logging"));
    }

    #[test]
    fn test_global_config_init_and_get() {
        // 全局状态：已初始化时跳过
        if !is_initialized() {
            init(RunConfig::with_root("/global"));
            assert!(is_initialized());
            assert_eq!(config().root_dir, PathBuf::from("/global"));
        }
    }
}
