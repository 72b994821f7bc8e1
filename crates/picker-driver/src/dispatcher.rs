//! 控制循环调度器
//!
//! 每个 tick：
//!
//! 1. 队列为空或忙标志已置位 → 空操作（忙且队列非空时告警）
//! 2. 原子置位忙标志，弹出队首目标，安装 [`CleanupGuard`]
//! 3. 复位：停用两个控制器、关闭执行器、stop 两个运动组
//! 4. 依次执行 approach（导轨）→ pick（机械臂）→ retreat（机械臂）→ place（导轨）
//! 5. 任一致命失败提前返回，清理守卫照常执行
//!
//! 轨迹执行失败只记录为降级，不中止任务。规划失败、汇合不可行、执行器失败、
//! 吸附超时、抓取/撤离期间吸附丢失都是致命的。

use crate::cleanup::CleanupGuard;
use crate::context::TaskContext;
use crate::error::OrchestratorError;
use crate::metrics::OrchestratorMetrics;
use crate::monitor::{ContactMonitor, wait_for_attachment};
use crate::queue::TargetQueue;
use crate::rendezvous;
use crate::report::{Phase, ReportHub, TaskOutcome, TaskReport};
use crate::state::BusyFlag;
use picker_protocol::{ControlGroupInfo, MotionPlan, PoseStamped, TargetDescriptor, Timestamp};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{error, info, warn};

/// 单次 tick 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// 队列为空
    Idle,
    /// 已有任务在处理
    Busy,
    /// 处理了一个目标
    Processed(TaskReport),
}

/// 任务进度（用于报告失败阶段）
#[derive(Debug)]
struct TaskProgress {
    phase: Phase,
    degraded_executions: u32,
}

/// 调度器
pub struct Dispatcher {
    ctx: TaskContext,
    queue: Arc<TargetQueue>,
    busy: BusyFlag,
    metrics: Arc<OrchestratorMetrics>,
    reports: Arc<ReportHub>,
    next_task_id: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        ctx: TaskContext,
        queue: Arc<TargetQueue>,
        metrics: Arc<OrchestratorMetrics>,
        reports: Arc<ReportHub>,
    ) -> Self {
        Self {
            ctx,
            queue,
            busy: BusyFlag::new(),
            metrics,
            reports,
            next_task_id: AtomicU64::new(0),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    /// 执行一次 tick
    ///
    /// 处理目标时阻塞直到任务结束且清理完成。可从多个线程并发调用，
    /// 同一时刻只有一个调用会处理目标，其余返回 [`TickOutcome::Busy`]。
    pub fn tick(&self) -> TickOutcome {
        if self.queue.is_empty() {
            return TickOutcome::Idle;
        }
        if !self.busy.try_acquire() {
            self.metrics.busy_skips.fetch_add(1, Ordering::Relaxed);
            warn!("Orchestrator busy, {} targets waiting", self.queue.len());
            return TickOutcome::Busy;
        }
        let Some(target) = self.queue.pop() else {
            self.busy.release();
            return TickOutcome::Idle;
        };

        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics.tasks_started.fetch_add(1, Ordering::Relaxed);
        info!("Task {} started, {} targets remaining", task_id, self.queue.len());

        let started = Instant::now();
        let mut progress = TaskProgress {
            phase: Phase::Reset,
            degraded_executions: 0,
        };
        let (result, contact_lost) = {
            let mut guard = CleanupGuard::new(&self.ctx, &self.busy);
            let result = self.run_task(&mut guard, &target, &mut progress);
            if result.is_ok() {
                guard.complete();
            }
            (result, guard.contact_lost())
        };

        let outcome = match result {
            Ok(()) if contact_lost => {
                let e = OrchestratorError::AttachmentLost(Phase::Place);
                TaskOutcome::Failed {
                    phase: Phase::Place,
                    kind: e.kind(),
                    message: e.to_string(),
                }
            },
            Ok(()) => TaskOutcome::Succeeded,
            Err(e) => TaskOutcome::Failed {
                phase: progress.phase,
                kind: e.kind(),
                message: e.to_string(),
            },
        };

        let report = TaskReport {
            task_id,
            outcome,
            degraded_executions: progress.degraded_executions,
            elapsed: started.elapsed(),
        };
        match &report.outcome {
            TaskOutcome::Succeeded => info!(
                "Task {} succeeded in {:.2}s",
                task_id,
                report.elapsed.as_secs_f64()
            ),
            TaskOutcome::Failed { phase, message, .. } => {
                warn!("Task {} aborted in {} phase: {}", task_id, phase, message)
            },
        }

        self.metrics.record_report(&report);
        self.reports.publish(&report);
        TickOutcome::Processed(report)
    }

    fn run_task(
        &self,
        guard: &mut CleanupGuard<'_>,
        target: &TargetDescriptor,
        progress: &mut TaskProgress,
    ) -> Result<(), OrchestratorError> {
        let ctx = &self.ctx;
        let config = &ctx.config;
        let rail = &config.rail;
        let arm = &config.arm;

        self.reset();

        // ==================== Approach ====================
        progress.phase = Phase::Approach;
        let approach = target.approach.rotated(&ctx.rotations.pick);
        let plan = self.plan_phase(progress.phase, rail, &approach)?;
        self.execute_phase(progress, rail, &plan);

        // ==================== Pick ====================
        progress.phase = Phase::Pick;
        let pick = target.pick.rotated(&ctx.rotations.pick);
        let plan = self.plan_phase(progress.phase, arm, &pick)?;

        let wait = rendezvous::compute_wait(target.pick_time(), Timestamp::now(), plan.duration())
            .inspect_err(|e| error!("Robot won't make it in time, dismissing object: {}", e))?;
        rendezvous::wait_for_window(wait);

        if !ctx.actuator.set_actuator(true) {
            return Err(OrchestratorError::ActuatorFailure { engage: true });
        }

        guard.install_monitor(ContactMonitor::acquisition(
            ctx.feedback.clone(),
            ctx.groups.clone(),
            arm.group_name.clone(),
            config.monitor.acquisition_period(),
        ));
        let executed = ctx.executor.execute(arm, &plan);
        let stopped_on_contact = guard.stop_monitor();
        if !executed && !stopped_on_contact {
            warn!("Pick trajectory execution finished with errors");
            progress.degraded_executions += 1;
        }

        let timeout = config.monitor.attachment_timeout();
        if !wait_for_attachment(&ctx.feedback, timeout, config.monitor.attachment_poll()) {
            error!("Timed out waiting to grab object");
            return Err(OrchestratorError::AttachmentTimeout(timeout));
        }
        info!("Object attached to gripper");

        guard.install_monitor(ContactMonitor::retention(
            ctx.feedback.clone(),
            ctx.groups.clone(),
            rail.group_name.clone(),
            arm.group_name.clone(),
            config.monitor.retention_period(),
            guard.contact_lost_flag(),
        ));

        // ==================== Retreat ====================
        progress.phase = Phase::Retreat;
        let retreat = target.retreat.rotated(&ctx.rotations.pick);
        let plan = self.plan_phase(progress.phase, arm, &retreat)?;
        self.execute_phase(progress, arm, &plan);
        if guard.contact_lost() {
            return Err(OrchestratorError::AttachmentLost(Phase::Retreat));
        }

        // ==================== Place ====================
        progress.phase = Phase::Place;
        let place = target.place.rotated(&ctx.rotations.place);
        let plan = self.plan_phase(progress.phase, rail, &place)?;
        if guard.contact_lost() {
            return Err(OrchestratorError::AttachmentLost(Phase::Place));
        }
        self.execute_phase(progress, rail, &plan);

        guard.stop_monitor();
        if !ctx.actuator.set_actuator(false) {
            return Err(OrchestratorError::ActuatorFailure { engage: false });
        }
        Ok(())
    }

    /// 任务开始前复位（幂等）
    fn reset(&self) {
        let ctx = &self.ctx;
        let config = &ctx.config;
        ctx.executor.deactivate_controller(&config.arm.controller_name);
        ctx.executor.deactivate_controller(&config.rail.controller_name);
        ctx.actuator.set_actuator(false);
        ctx.executor.stop(&config.rail);
        ctx.executor.stop(&config.arm);
    }

    fn plan_phase(
        &self,
        phase: Phase,
        group: &ControlGroupInfo,
        target: &PoseStamped,
    ) -> Result<MotionPlan, OrchestratorError> {
        let ctx = &self.ctx;
        let start = ctx
            .groups
            .current_state(&group.group_name)
            .map_err(|e| OrchestratorError::planning(phase, e.into()))?;
        let yaw_tolerance = ctx.config.planning.yaw_tolerance.for_phase(phase);

        let plan = ctx
            .planner
            .plan(&start, &group.group_name, target, yaw_tolerance)
            .map_err(|e| OrchestratorError::planning(phase, e))?;
        info!("{} motion plan found", phase);
        Ok(plan)
    }

    fn execute_phase(&self, progress: &mut TaskProgress, group: &ControlGroupInfo, plan: &MotionPlan) {
        if !self.ctx.executor.execute(group, plan) {
            warn!("{} trajectory execution finished with errors", progress.phase);
            progress.degraded_executions += 1;
        }
    }
}
