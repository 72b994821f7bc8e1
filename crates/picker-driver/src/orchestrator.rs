//! 编排器
//!
//! 负责启动序列和后台 tick 线程：
//!
//! 1. 校验配置
//! 2. 等待规划、执行器、控制器切换三个端点就绪（每个最多 `service_timeout`）
//! 3. 确认两个运动组存在于机器人模型中
//! 4. 关闭执行器，同步移动到等待位姿
//! 5. 启动固定周期的 tick 线程
//!
//! 启动失败（配置错误、服务不可达）直接返回错误，不重试。

use crate::config::OrchestratorConfig;
use crate::context::TaskContext;
use crate::dispatcher::{Dispatcher, TickOutcome};
use crate::error::OrchestratorError;
use crate::metrics::{MetricsSnapshot, OrchestratorMetrics};
use crate::queue::TargetQueue;
use crate::report::{ReportHub, TaskReport};
use crossbeam_channel::Receiver;
use picker_protocol::TargetDescriptor;
use picker_services::{AttachmentFeedback, MoveMode, Services};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 编排器
///
/// # 示例
///
/// ```rust,no_run
/// use picker_driver::{Orchestrator, OrchestratorConfig};
/// use picker_services::{AttachmentFeedback, Services};
///
/// # fn example(services: Services, feedback: AttachmentFeedback) -> Result<(), picker_driver::OrchestratorError> {
/// let orchestrator = Orchestrator::start(OrchestratorConfig::default(), services, feedback)?;
/// let reports = orchestrator.subscribe();
/// // orchestrator.submit(target);
/// # let _ = reports;
/// orchestrator.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    dispatcher: Arc<Dispatcher>,
    queue: Arc<TargetQueue>,
    feedback: AttachmentFeedback,
    metrics: Arc<OrchestratorMetrics>,
    reports: Arc<ReportHub>,
    shutdown: Arc<AtomicBool>,
    tick_thread: Option<JoinHandle<()>>,
}

impl Orchestrator {
    /// 执行启动序列并启动 tick 线程
    ///
    /// # 错误
    ///
    /// - `OrchestratorError::Configuration`: 配置非法或运动组不存在
    /// - `OrchestratorError::ServiceUnavailable`: 端点在超时内未就绪
    pub fn start(
        config: OrchestratorConfig,
        services: Services,
        feedback: AttachmentFeedback,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;

        info!("Waiting for services (timeout {:?})", config.service_timeout());
        services.wait_until_ready(config.service_timeout()).inspect_err(|e| {
            error!("{}", e);
        })?;

        let known = services.groups.group_names();
        for group in [&config.rail, &config.arm] {
            if !known.contains(&group.group_name) {
                return Err(OrchestratorError::Configuration(format!(
                    "group '{}' not found in robot model (known: {:?})",
                    group.group_name, known
                )));
            }
        }

        let tick_period = config.tick_period();
        let ctx = TaskContext::new(&services, feedback.clone(), config);
        if !ctx.actuator.set_actuator(false) {
            warn!("Initial actuator release failed");
        }
        if !ctx.executor.move_to_wait_pose(&ctx.config.rail, &ctx.config.arm, MoveMode::Blocking) {
            warn!("Initial move to wait pose failed");
        }

        let queue = Arc::new(TargetQueue::new(ctx.config.queue_warn_threshold));
        let metrics = Arc::new(OrchestratorMetrics::new());
        let reports = Arc::new(ReportHub::new());
        let dispatcher = Arc::new(Dispatcher::new(
            ctx,
            queue.clone(),
            metrics.clone(),
            reports.clone(),
        ));

        let shutdown = Arc::new(AtomicBool::new(false));
        let tick_thread = {
            let dispatcher = dispatcher.clone();
            let shutdown = shutdown.clone();
            spawn(move || tick_loop(dispatcher, tick_period, shutdown))
        };

        info!("Orchestrator started, tick period {:?}", tick_period);
        Ok(Self {
            dispatcher,
            queue,
            feedback,
            metrics,
            reports,
            shutdown,
            tick_thread: Some(tick_thread),
        })
    }

    /// 提交目标（fire-and-forget）
    pub fn submit(&self, target: TargetDescriptor) {
        self.metrics.targets_received.fetch_add(1, Ordering::Relaxed);
        let len = self.queue.push(target);
        debug!("Target queued, {} pending", len);
    }

    /// 吸附反馈写入句柄
    pub fn attachment_feedback(&self) -> AttachmentFeedback {
        self.feedback.clone()
    }

    /// 订阅任务报告
    pub fn subscribe(&self) -> Receiver<TaskReport> {
        self.reports.subscribe()
    }

    pub fn last_report(&self) -> Option<Arc<TaskReport>> {
        self.reports.last()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.dispatcher.is_busy()
    }

    /// 尚未出队的目标数
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        self.dispatcher.context().config()
    }

    /// 停止 tick 线程
    ///
    /// 正在处理的任务会完整结束（包括清理）后再退出；队列中剩余目标被丢弃。
    pub fn shutdown(mut self) {
        self.stop_tick_thread();
    }

    fn stop_tick_thread(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.tick_thread.take() {
            if handle.join().is_err() {
                error!("Tick thread panicked");
            }
            info!("Orchestrator stopped, {} targets discarded", self.queue.len());
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.stop_tick_thread();
    }
}

/// tick 循环（锚点式定时，任务耗时超过周期时重置锚点）
fn tick_loop(dispatcher: Arc<Dispatcher>, period: std::time::Duration, shutdown: Arc<AtomicBool>) {
    let mut next_tick = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        next_tick += period;

        if let TickOutcome::Processed(report) = dispatcher.tick() {
            debug!("Tick processed task {}", report.task_id);
        }

        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }
}
