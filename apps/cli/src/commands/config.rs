//! 配置管理命令
//!
//! 生成、校验和查看编排器 TOML 配置

use anyhow::{Context, Result};
use clap::Subcommand;
use picker_driver::OrchestratorConfig;
use std::path::{Path, PathBuf};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 写出默认配置
    Init {
        /// 输出路径
        path: PathBuf,

        /// 覆盖已有文件
        #[arg(short, long)]
        force: bool,
    },

    /// 校验配置文件
    Check {
        /// 配置文件路径
        path: PathBuf,
    },

    /// 打印生效配置（TOML）
    Show {
        /// 配置文件路径（缺省打印内置默认值）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Init { path, force } => init(&path, force),
            ConfigCommand::Check { path } => check(&path).map(|_| ()),
            ConfigCommand::Show { config } => {
                print!("{}", show(config.as_deref())?);
                Ok(())
            },
        }
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} 已存在（使用 --force 覆盖）", path.display());
    }
    OrchestratorConfig::default()
        .save_to_file(path)
        .with_context(|| format!("写入 {} 失败", path.display()))?;
    println!("✅ 已写入默认配置: {}", path.display());
    Ok(())
}

fn check(path: &Path) -> Result<OrchestratorConfig> {
    // load_from_file 会同时执行 validate
    let config = OrchestratorConfig::load_from_file(path)
        .with_context(|| format!("配置 {} 无效", path.display()))?;

    println!("✅ 配置有效: {}", path.display());
    println!(
        "  导轨: {} (控制器 {}, 等待位姿 {})",
        config.rail.group_name, config.rail.controller_name, config.rail.wait_pose_name
    );
    println!(
        "  机械臂: {} (控制器 {}, 等待位姿 {})",
        config.arm.group_name, config.arm.controller_name, config.arm.wait_pose_name
    );
    println!("  tick 周期: {:?}", config.tick_period());
    println!("  吸附超时: {:?}", config.monitor.attachment_timeout());
    Ok(config)
}

fn show(path: Option<&Path>) -> Result<String> {
    let config = match path {
        Some(path) => OrchestratorConfig::load_from_file(path)
            .with_context(|| format!("加载 {} 失败", path.display()))?,
        None => OrchestratorConfig::default(),
    };
    config.to_toml_string().context("序列化配置失败")
}
