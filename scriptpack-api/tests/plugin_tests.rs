//! Plugin Script Resolver tests

mod common;

use std::sync::Arc;

use common::{empty_config, memory_config, TempDir};
use scriptpack_api::{compile_plugin, plugin_script, Capabilities, DependencyOptions, PluginOptions, RunConfig, ScriptpackError};
use scriptpack_core::CompilerError;
use scriptpack_vfs::{native_loader, LoadError};

const HELLO: &str = "import BigNumber from 'bignumber.js';\n\
export default function main(n: number): string { return new BigNumber(n).toString(); }";

fn entry(path: &str) -> PluginOptions {
    PluginOptions {
        script_path: Some(path.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_literal_script_bypasses_compilation() {
    let options = PluginOptions {
        script: Some(String::from("define('x', [], function () {});")),
        script_path: Some(String::from("does/not/exist.ts")),
        ..Default::default()
    };
    let script = plugin_script(&options, &empty_config()).await.unwrap();
    assert_eq!(script.as_deref(), Some("define('x', [], function () {});"));
}

#[tokio::test]
async fn test_missing_entry_is_an_error() {
    let err = plugin_script(&PluginOptions::default(), &empty_config()).await.unwrap_err();
    assert_eq!(err, ScriptpackError::MissingEntry);
}

#[tokio::test]
async fn test_single_file_relative_to_root() {
    let config = memory_config([("/app/plugins/hello/index.ts", HELLO)]);
    let bundle = compile_plugin(&entry("plugins/hello/index.ts"), &config, false).await.unwrap();
    assert!(bundle.errors.is_empty(), "{:?}", bundle.errors);
    let script = bundle.script.unwrap();
    assert!(script.contains("define(\"index\", [\"require\", \"exports\", \"bignumber.js\"]"));
    assert!(script.contains("return new bignumber_js_1.default(n).toString();"));
    assert!(!script.contains("const BigNumber"));
}

#[tokio::test]
async fn test_single_file_relative_to_module_path() {
    let config = memory_config([("/app/mods/hello/main.ts", "export default 42;")]);
    let options = PluginOptions {
        module_path: Some(String::from("mods/hello")),
        ..entry("main.ts")
    };
    let script = plugin_script(&options, &config).await.unwrap();
    assert!(script.unwrap().contains("exports.default = 42;"));
}

#[tokio::test]
async fn test_absolute_entry_file() {
    let config = memory_config([("/elsewhere/index.ts", "export default 1;")]);
    let script = plugin_script(&entry("/elsewhere/index.ts"), &config).await.unwrap();
    assert!(script.is_some());
}

#[tokio::test]
async fn test_unreadable_entry_propagates() {
    let err = plugin_script(&entry("plugins/missing.ts"), &empty_config()).await.unwrap_err();
    assert!(matches!(
        err,
        ScriptpackError::Compiler(CompilerError::Load(LoadError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn test_descriptor_read_through_loader() {
    let config = memory_config([(
        "/app/plugin.json",
        r#"{ "scriptPath": "plugins/hello/index.ts", "plugins": { "wallet": true } }"#,
    )]);
    let options = PluginOptions::read(std::path::Path::new("/app/plugin.json"), &config).await.unwrap();
    assert_eq!(options.script_path.as_deref(), Some("plugins/hello/index.ts"));
    assert!(options.plugins.wallet);

    let err = PluginOptions::read(std::path::Path::new("/app/missing.json"), &config).await.unwrap_err();
    assert!(matches!(err, ScriptpackError::Load(LoadError::NotFound { .. })));
    assert_eq!(err.phase(), "ingest");
}

#[tokio::test]
async fn test_directory_entry_honors_bin_override() {
    let config = memory_config([
        ("/app/plugins/tool/package.json", r#"{ "directories": { "bin": "src" } }"#),
        ("/app/plugins/tool/src/index.ts", "import { twice } from './lib/math';\nexport default twice(2);"),
        ("/app/plugins/tool/src/lib/math.ts", "export const twice = (n: number): number => n * 2;"),
        ("/app/plugins/tool/scratch.ts", "this file is not ingested"),
    ]);
    let bundle = compile_plugin(&entry("plugins/tool"), &config, false).await.unwrap();
    assert!(bundle.errors.is_empty(), "{:?}", bundle.errors);
    let script = bundle.script.unwrap();
    assert!(script.contains("define(\"lib/math\""));
    assert!(script.contains("define(\"index\", [\"require\", \"exports\", \"lib/math\"]"));
}

#[tokio::test]
async fn test_bin_override_outside_package_is_ignored() {
    let config = memory_config([
        ("/app/plugins/tool/package.json", r#"{ "directories": { "bin": "../../secret" } }"#),
        ("/app/plugins/tool/index.ts", "export default 'tool';"),
        ("/app/secret/index.ts", "export default 'secret';"),
    ]);
    let script = plugin_script(&entry("plugins/tool"), &config).await.unwrap().unwrap();
    assert!(script.contains("'tool'"));
    assert!(!script.contains("'secret'"));
}

#[tokio::test]
async fn test_declared_dependency_stub() {
    let config = memory_config([(
        "/app/plugins/greeter.ts",
        "import { greet } from 'greeting';\nexport default greet('plugin');",
    )]);
    let mut options = entry("plugins/greeter.ts");
    options.dependencies.insert(
        String::from("greeting"),
        DependencyOptions {
            version: None,
            dts: Some(String::from("export declare function greet(name: string): string;")),
        },
    );
    options.dependencies.insert(String::from("no-types"), DependencyOptions::default());

    let bundle = compile_plugin(&options, &config, false).await.unwrap();
    assert!(bundle.errors.is_empty(), "{:?}", bundle.errors);
    assert!(bundle.script.unwrap().contains("\"greeting\""));
}

#[tokio::test]
async fn test_undeclared_package_leaves_no_script() {
    let config = memory_config([("/app/plugins/bad.ts", "import { pad } from 'left-pad-fake';\nexport default pad;")]);
    let bundle = compile_plugin(&entry("plugins/bad.ts"), &config, false).await.unwrap();
    assert!(bundle.is_hard_failure());
    assert_eq!(bundle.errors[0].code, 2307);
    assert_eq!(plugin_script(&entry("plugins/bad.ts"), &config).await.unwrap(), None);
}

#[tokio::test]
async fn test_wallet_capability_registers_chain_packages() {
    let config = memory_config([(
        "/app/plugins/wallet.ts",
        "import Contract from '@ijstech/eth-contract';\nimport Wallet from '@ijstech/wallet';\nexport default [Contract, Wallet];",
    )]);
    let options = PluginOptions {
        plugins: Capabilities {
            wallet: true,
            ..Default::default()
        },
        ..entry("plugins/wallet.ts")
    };
    let bundle = compile_plugin(&options, &config, true).await.unwrap();
    assert!(bundle.errors.is_empty(), "{:?}", bundle.errors);
    assert!(bundle.dts.contains("declare module \"index\""));
}

#[tokio::test]
async fn test_directory_entry_on_disk() {
    let dir = TempDir::new("directory_entry_on_disk");
    dir.write("plugins/hello/index.ts", "import { name } from './name';\nexport default name;");
    dir.write("plugins/hello/name.ts", "export const name: string = 'hello';");
    let config = RunConfig::with_root(&dir.path).with_loader(Arc::new(native_loader()));

    let bundle = compile_plugin(&entry("plugins/hello"), &config, false).await.unwrap();
    assert!(bundle.errors.is_empty(), "{:?}", bundle.errors);
    let script = bundle.script.unwrap();
    assert!(script.contains("define(\"name\""));
    assert!(script.contains("exports.name = 'hello';"));
    assert!(script.contains("exports.default = name_1.name;"));
}
