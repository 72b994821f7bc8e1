//! run 命令
//!
//! 在模拟世界中启动编排器，按场景提交目标，打印每个任务的报告和最终指标。

use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::RecvTimeoutError;
use picker_driver::{MetricsSnapshot, OrchestratorBuilder, OrchestratorConfig, TaskOutcome, TaskReport};
use picker_protocol::Timestamp;
use picker_services::mock::MockWorld;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::scenario::Scenario;

/// 报告接收的轮询周期（用于响应 Ctrl-C）
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 场景运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 场景文件路径（JSON）
    #[arg(short, long)]
    pub scenario: PathBuf,

    /// 编排器配置文件（TOML，缺省使用内置默认值）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 以 JSON Lines 输出报告和指标
    #[arg(long)]
    pub json: bool,

    /// 最后一个目标提交后等待报告的最长时间（秒）
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

/// 一次运行的结果
#[derive(Debug)]
pub struct RunSummary {
    pub reports: Vec<TaskReport>,
    pub metrics: MetricsSnapshot,
    pub interrupted: bool,
}

impl RunCommand {
    /// 执行场景（安装 Ctrl-C 处理）
    pub fn execute(&self) -> Result<()> {
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = interrupted.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .context("安装 Ctrl-C 处理器失败")?;

        let summary = self.run(&interrupted)?;
        self.print_summary(&summary)?;
        Ok(())
    }

    /// 运行场景直到收齐所有报告、超时或被中断
    pub fn run(&self, interrupted: &AtomicBool) -> Result<RunSummary> {
        let config = match &self.config {
            Some(path) => OrchestratorConfig::load_from_file(path)
                .with_context(|| format!("加载配置 {} 失败", path.display()))?,
            None => OrchestratorConfig::default(),
        };
        let scenario = Scenario::load(&self.scenario)
            .with_context(|| format!("加载场景 {} 失败", self.scenario.display()))?;

        if !self.json {
            println!("📋 场景: {}", scenario.name);
            if !scenario.description.is_empty() {
                println!("    {}", scenario.description);
            }
            println!("    {} 个目标", scenario.targets.len());
            println!();
        }

        let world = MockWorld::with_groups(&config.rail, &config.arm);
        scenario.apply_to(&world, &config.rail.group_name, &config.arm.group_name);

        let orchestrator = OrchestratorBuilder::new()
            .config(config)
            .services(world.services())
            .attachment_feedback(world.feedback())
            .build()
            .context("启动编排器失败")?;
        let reports = orchestrator.subscribe();

        let total = scenario.targets.len();
        let timeout = Duration::from_secs(self.timeout_secs);
        let mut received = Vec::with_capacity(total);

        thread::scope(|s| -> Result<()> {
            let producer = s.spawn(|| {
                for (i, target) in scenario.targets.iter().enumerate() {
                    thread::sleep(target.submit_delay());
                    if interrupted.load(Ordering::SeqCst) {
                        return;
                    }
                    info!("Submitting target {}/{}", i + 1, total);
                    orchestrator.submit(target.to_descriptor(Timestamp::now()));
                }
            });

            let mut last_activity = Instant::now();
            while received.len() < total && !interrupted.load(Ordering::SeqCst) {
                match reports.recv_timeout(POLL_INTERVAL) {
                    Ok(report) => {
                        self.print_report(&report)?;
                        received.push(report);
                        last_activity = Instant::now();
                    },
                    Err(RecvTimeoutError::Timeout) => {
                        if producer.is_finished() && last_activity.elapsed() > timeout {
                            warn!(
                                "No report within {:?}, giving up ({}/{} received)",
                                timeout,
                                received.len(),
                                total
                            );
                            break;
                        }
                    },
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            Ok(())
        })?;

        let metrics = orchestrator.metrics();
        orchestrator.shutdown();

        Ok(RunSummary {
            reports: received,
            metrics,
            interrupted: interrupted.load(Ordering::SeqCst),
        })
    }

    fn print_report(&self, report: &TaskReport) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(report).context("序列化报告失败")?);
            return Ok(());
        }
        match &report.outcome {
            TaskOutcome::Succeeded => println!(
                "✅ 任务 {} 完成 ({:.2} 秒, {} 次降级执行)",
                report.task_id,
                report.elapsed.as_secs_f64(),
                report.degraded_executions
            ),
            TaskOutcome::Failed { phase, message, .. } => println!(
                "❌ 任务 {} 在 {} 阶段失败 ({:.2} 秒): {}",
                report.task_id,
                phase,
                report.elapsed.as_secs_f64(),
                message
            ),
        }
        Ok(())
    }

    fn print_summary(&self, summary: &RunSummary) -> Result<()> {
        let m = &summary.metrics;
        if self.json {
            println!("{}", serde_json::to_string(m).context("序列化指标失败")?);
            return Ok(());
        }

        println!();
        if summary.interrupted {
            println!("⚠️  运行被中断");
        }
        println!("📊 运行结果:");
        println!("  提交目标: {}", m.targets_received);
        println!("  成功: {}", m.tasks_succeeded);
        println!("  失败: {}", m.tasks_failed);
        println!("    规划失败: {}", m.planning_failures);
        println!("    时间不可行: {}", m.timing_infeasible);
        println!("    吸附超时: {}", m.attachment_timeouts);
        println!("    吸附丢失: {}", m.attachment_lost);
        println!("    执行器失败: {}", m.actuator_failures);
        println!("  降级执行: {}", m.degraded_executions);
        println!("  成功率: {:.1}%", m.success_rate());
        Ok(())
    }
}
