//! # Picker CLI
//!
//! 抓放编排器的命令行工具。
//!
//! ## 仿真运行
//!
//! 在进程内模拟世界中运行编排器，按场景文件提交目标并打印任务报告：
//!
//! ```bash
//! picker-cli run --scenario conveyor.json --config picker.toml
//! picker-cli run --scenario conveyor.json --json > reports.jsonl
//! ```
//!
//! ## 配置管理
//!
//! ```bash
//! picker-cli config init picker.toml
//! picker-cli config check picker.toml
//! picker-cli config show --config picker.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod scenario;

use commands::{ConfigCommand, RunCommand};

/// Picker CLI - 抓放编排器命令行工具
#[derive(Parser, Debug)]
#[command(name = "picker-cli")]
#[command(about = "Simulator and configuration tool for the picker orchestrator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 在模拟世界中运行场景
    Run {
        #[command(flatten)]
        args: RunCommand,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("picker_cli=info,picker_driver=info")
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Run { args } => args.execute(),
    }
}
