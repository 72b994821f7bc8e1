//! 编排器运行指标
//!
//! 原子计数器，可在任何线程读取，不引入锁竞争。

use crate::report::{FailureKind, TaskReport};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// 编排器实时指标
///
/// # 使用示例
///
/// ```rust
/// use picker_driver::OrchestratorMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = OrchestratorMetrics::new();
/// metrics.targets_received.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.targets_received, 1);
/// ```
#[derive(Debug, Default)]
pub struct OrchestratorMetrics {
    /// 入队目标总数
    pub targets_received: AtomicU64,
    /// 开始处理的任务数
    pub tasks_started: AtomicU64,
    /// 完成放置的任务数
    pub tasks_succeeded: AtomicU64,
    /// 中止的任务数
    pub tasks_failed: AtomicU64,

    pub planning_failures: AtomicU64,
    pub timing_infeasible: AtomicU64,
    pub attachment_timeouts: AtomicU64,
    pub attachment_lost: AtomicU64,
    pub actuator_failures: AtomicU64,
    /// 任务期间的服务调用失败（未归入上述类别）
    pub service_failures: AtomicU64,

    /// 非致命的轨迹执行降级
    pub degraded_executions: AtomicU64,
    /// 因忙跳过的 tick（队列非空）
    pub busy_skips: AtomicU64,
}

impl OrchestratorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按任务报告累加
    pub fn record_report(&self, report: &TaskReport) {
        self.degraded_executions
            .fetch_add(u64::from(report.degraded_executions), Ordering::Relaxed);

        let Some(kind) = report.outcome.failure_kind() else {
            self.tasks_succeeded.fetch_add(1, Ordering::Relaxed);
            return;
        };

        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            FailureKind::Planning => &self.planning_failures,
            FailureKind::TimingInfeasible => &self.timing_infeasible,
            FailureKind::AttachmentTimeout => &self.attachment_timeouts,
            FailureKind::AttachmentLost => &self.attachment_lost,
            FailureKind::ActuatorFailure => &self.actuator_failures,
            FailureKind::Configuration | FailureKind::ServiceUnavailable => {
                &self.service_failures
            },
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 读取快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            targets_received: self.targets_received.load(Ordering::Relaxed),
            tasks_started: self.tasks_started.load(Ordering::Relaxed),
            tasks_succeeded: self.tasks_succeeded.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            planning_failures: self.planning_failures.load(Ordering::Relaxed),
            timing_infeasible: self.timing_infeasible.load(Ordering::Relaxed),
            attachment_timeouts: self.attachment_timeouts.load(Ordering::Relaxed),
            attachment_lost: self.attachment_lost.load(Ordering::Relaxed),
            actuator_failures: self.actuator_failures.load(Ordering::Relaxed),
            service_failures: self.service_failures.load(Ordering::Relaxed),
            degraded_executions: self.degraded_executions.load(Ordering::Relaxed),
            busy_skips: self.busy_skips.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub targets_received: u64,
    pub tasks_started: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub planning_failures: u64,
    pub timing_infeasible: u64,
    pub attachment_timeouts: u64,
    pub attachment_lost: u64,
    pub actuator_failures: u64,
    pub service_failures: u64,
    pub degraded_executions: u64,
    pub busy_skips: u64,
}

impl MetricsSnapshot {
    /// 成功率（百分比），无已结束任务时为 0.0
    pub fn success_rate(&self) -> f64 {
        let finished = self.tasks_succeeded + self.tasks_failed;
        if finished == 0 {
            return 0.0;
        }
        (self.tasks_succeeded as f64 / finished as f64) * 100.0
    }

    /// 尚未处理的目标数（入队 - 开始）
    pub fn pending(&self) -> u64 {
        self.targets_received.saturating_sub(self.tasks_started)
    }
}
