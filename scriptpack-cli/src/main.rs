//! Scriptpack CLI - 命令行入口
//!
//! 纯前端，无业务逻辑。只负责参数解析、日志初始化和调用 API。

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};

use scriptpack_api::{compile_plugin, get_config, init_config, PluginOptions, RunConfig};
use scriptpack_config::LogLevel;

mod config;
mod logging;

use crate::config::{verbosity, CliConfig};
use crate::logging::LogFormat;

#[derive(Parser)]
#[command(
    name = "scriptpack",
    about = "Compile a TypeScript plugin into an AMD bundle",
    version = "0.1.0"
)]
struct Cli {
    /// 插件描述文件 (JSON)
    descriptor: PathBuf,

    /// 脚本路径和包查找的根目录 (默认: 当前目录)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// 同时生成声明文件
    #[arg(long)]
    dts: bool,

    /// 编译器和日志配置文件 (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 日志输出格式
    #[arg(long, value_enum, default_value = "pretty")]
    format: LogFormat,

    /// 日志级别 (-v=info, -vv=debug, -vvv=trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Walker 日志级别
    #[arg(long, value_enum)]
    log_walker: Option<LogLevelArg>,

    /// Registry 日志级别
    #[arg(long, value_enum)]
    log_registry: Option<LogLevelArg>,

    /// Resolver 日志级别
    #[arg(long, value_enum)]
    log_resolver: Option<LogLevelArg>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let file_config = match cli.config.as_deref() {
        Some(path) => match CliConfig::read(path).await {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => CliConfig::default(),
    };

    // 初始化日志
    let mut logging = file_config.logging;
    logging.global = verbosity(cli.verbose, if cli.config.is_some() { logging.global } else { LogLevel::Warn });
    logging.walker = cli.log_walker.map(LogLevel::from).or(logging.walker);
    logging.registry = cli.log_registry.map(LogLevel::from).or(logging.registry);
    logging.resolver = cli.log_resolver.map(LogLevel::from).or(logging.resolver);
    logging::init(&logging, cli.format);

    init_config(RunConfig {
        root_dir: cli.root.clone().unwrap_or_else(|| PathBuf::from(".")),
        compiler: file_config.compiler,
        logging,
        ..RunConfig::default()
    });

    // 读取插件描述
    let options = match PluginOptions::read(&cli.descriptor, get_config()).await {
        Ok(options) => options,
        Err(e) => {
            error!(target: "scriptpack::cli", phase = e.phase(), "{}", e);
            eprintln!("Error: '{}': {}", cli.descriptor.display(), e);
            process::exit(1);
        }
    };
    info!(target: "scriptpack::cli", descriptor = %cli.descriptor.display(), "compiling");

    let bundle = match compile_plugin(&options, get_config(), cli.dts).await {
        Ok(bundle) => bundle,
        Err(e) => {
            error!(target: "scriptpack::cli", phase = e.phase(), "{}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&bundle) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: cannot serialize bundle: {}", e);
            process::exit(1);
        }
    }
    if bundle.is_hard_failure() {
        process::exit(1);
    }
}
