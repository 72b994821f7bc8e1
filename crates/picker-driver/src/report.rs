//! 任务报告
//!
//! 每个出队的目标在清理完成后产生一份 [`TaskReport`]，推送给进程内订阅者，
//! 并以无锁快照的形式保留最后一份。入口生产者不会收到任何回执。

use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 任务阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// 任务开始前的复位
    Reset,
    /// 接近（导轨）
    Approach,
    /// 抓取（机械臂）
    Pick,
    /// 撤离（机械臂）
    Retreat,
    /// 放置（导轨）
    Place,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Reset => "reset",
            Phase::Approach => "approach",
            Phase::Pick => "pick",
            Phase::Retreat => "retreat",
            Phase::Place => "place",
        };
        f.write_str(name)
    }
}

/// 失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    ServiceUnavailable,
    Planning,
    TimingInfeasible,
    AttachmentTimeout,
    AttachmentLost,
    ActuatorFailure,
}

/// 任务结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// 完成放置
    Succeeded,
    /// 在 `phase` 阶段中止
    Failed {
        phase: Phase,
        kind: FailureKind,
        message: String,
    },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TaskOutcome::Succeeded => None,
            TaskOutcome::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// 单个任务的报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    /// 任务序号（从 1 开始，按出队顺序递增）
    pub task_id: u64,
    pub outcome: TaskOutcome,
    /// 非致命的执行降级次数（轨迹执行返回非成功错误码）
    pub degraded_executions: u32,
    /// 从出队到清理完成的耗时
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// 报告发布器
///
/// - 订阅者使用有界通道，订阅者处理过慢时丢弃该订阅者的新报告（不阻塞编排线程）
/// - 订阅者断开后自动移除
/// - 最后一份报告通过 `ArcSwapOption` 无锁读取
pub struct ReportHub {
    subscribers: Mutex<Vec<Sender<TaskReport>>>,
    last: ArcSwapOption<TaskReport>,
}

/// 每个订阅者的通道容量
pub const SUBSCRIBER_CAPACITY: usize = 64;

impl ReportHub {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            last: ArcSwapOption::empty(),
        }
    }

    /// 新建订阅
    pub fn subscribe(&self) -> Receiver<TaskReport> {
        let (tx, rx) = crossbeam_channel::bounded(SUBSCRIBER_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }

    /// 最后一份报告
    pub fn last(&self) -> Option<Arc<TaskReport>> {
        self.last.load_full()
    }

    /// 发布报告
    pub fn publish(&self, report: &TaskReport) {
        self.last.store(Some(Arc::new(report.clone())));

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(report.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Report subscriber lagging, dropping task {}", report.task_id);
                true
            },
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for ReportHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(task_id: u64, outcome: TaskOutcome) -> TaskReport {
        TaskReport {
            task_id,
            outcome,
            degraded_executions: 0,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_publish_to_subscribers_and_last() {
        let hub = ReportHub::new();
        let rx = hub.subscribe();
        assert!(hub.last().is_none());

        hub.publish(&report(1, TaskOutcome::Succeeded));

        assert_eq!(rx.try_recv().unwrap().task_id, 1);
        assert_eq!(hub.last().unwrap().task_id, 1);
    }

    #[test]
    fn test_disconnected_subscriber_removed() {
        let hub = ReportHub::new();
        let rx = hub.subscribe();
        let _keep = hub.subscribe();
        drop(rx);

        hub.publish(&report(1, TaskOutcome::Succeeded));
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_lagging_subscriber_does_not_block() {
        let hub = ReportHub::new();
        let rx = hub.subscribe();
        for id in 0..(SUBSCRIBER_CAPACITY as u64 + 10) {
            hub.publish(&report(id, TaskOutcome::Succeeded));
        }
        assert_eq!(rx.len(), SUBSCRIBER_CAPACITY);
        assert_eq!(hub.last().unwrap().task_id, SUBSCRIBER_CAPACITY as u64 + 9);
    }

    #[test]
    fn test_outcome_json_shape() {
        let r = report(
            7,
            TaskOutcome::Failed {
                phase: Phase::Pick,
                kind: FailureKind::TimingInfeasible,
                message: "late".into(),
            },
        );
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["outcome"]["phase"], "pick");
        assert_eq!(json["outcome"]["kind"], "timing_infeasible");
        assert_eq!(json["elapsed"], 1500);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Retreat.to_string(), "retreat");
        assert!(TaskOutcome::Succeeded.is_success());
        assert_eq!(TaskOutcome::Succeeded.failure_kind(), None);
    }
}
