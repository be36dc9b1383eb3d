//! API 错误类型
//!
//! 统一各层错误。编译诊断不属于错误，它们留在 `CompiledBundle` 中。

use std::path::PathBuf;

use scriptpack_core::CompilerError;
use scriptpack_vfs::LoadError;
use thiserror::Error;

/// Scriptpack 错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptpackError {
    /// 入口文件读取失败
    #[error(transparent)]
    Compiler(#[from] CompilerError),

    /// 插件描述文件读取失败
    #[error(transparent)]
    Load(#[from] LoadError),

    /// 插件描述无法解析
    #[error("invalid plugin descriptor: {0}")]
    Descriptor(String),

    /// 既没有脚本文本也没有脚本路径
    #[error("plugin has neither a script nor a script path")]
    MissingEntry,

    /// 路径越出根目录
    #[error("path '{}' is outside of the root directory", path.display())]
    OutsideRoot { path: PathBuf },
}

impl ScriptpackError {
    /// 获取错误阶段名称
    pub fn phase(&self) -> &'static str {
        match self {
            ScriptpackError::Compiler(_) | ScriptpackError::Load(_) => "ingest",
            ScriptpackError::Descriptor(_)
            | ScriptpackError::MissingEntry
            | ScriptpackError::OutsideRoot { .. } => "resolver",
        }
    }
}

impl From<serde_json::Error> for ScriptpackError {
    fn from(err: serde_json::Error) -> Self {
        ScriptpackError::Descriptor(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_passes_through() {
        let err: ScriptpackError = LoadError::NotFound {
            path: PathBuf::from("/app/index.ts"),
        }
        .into();
        assert_eq!(err.to_string(), "Path not found: /app/index.ts");
        assert_eq!(err.phase(), "ingest");
    }

    #[test]
    fn test_descriptor_error_from_json() {
        let err: ScriptpackError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, ScriptpackError::Descriptor(_)));
        assert_eq!(err.phase(), "resolver");
    }
}
