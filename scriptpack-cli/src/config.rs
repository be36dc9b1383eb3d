//! CLI 配置
//!
//! 可选的 JSON 配置文件：编译器配置和日志配置的组合

use std::path::Path;

use serde::{Deserialize, Serialize};

use scriptpack_config::{CompilerConfig, LogLevel, LoggingConfig};

/// Contents of a `--config` file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub compiler: CompilerConfig,
    pub logging: LoggingConfig,
}

impl CliConfig {
    pub async fn read(path: &Path) -> Result<Self, String> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("无法读取 '{}': {}", path.display(), e))?;
        serde_json::from_str(&content).map_err(|e| format!("解析 '{}' 失败: {}", path.display(), e))
    }
}

/// `-v` count to global level: none keeps `fallback`, then info, debug, trace
pub fn verbosity(count: u8, fallback: LogLevel) -> LogLevel {
    match count {
        0 => fallback,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: CliConfig = serde_json::from_str(
            r#"{ "compiler": { "resolverTimeoutMs": 500 }, "logging": { "walker": "trace" } }"#,
        )
        .unwrap();
        assert_eq!(config.compiler.resolver_timeout_ms, Some(500));
        assert_eq!(config.compiler.script.out_file, "index.js");
        assert_eq!(config.logging.walker, Some(LogLevel::Trace));
        assert_eq!(config.logging.global, LogLevel::Info);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = CliConfig::read(Path::new("/nonexistent/scriptpack.json")).await.unwrap_err();
        assert!(err.contains("/nonexistent/scriptpack.json"));
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(verbosity(0, LogLevel::Warn), LogLevel::Warn);
        assert_eq!(verbosity(1, LogLevel::Warn), LogLevel::Info);
        assert_eq!(verbosity(5, LogLevel::Warn), LogLevel::Trace);
    }
}
