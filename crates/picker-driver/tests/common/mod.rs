//! 集成测试公共设施
//!
//! 所有时间参数按比例缩短（tick 10ms、机械臂轨迹 200ms、吸附超时 300ms），
//! 使单个任务在 1 秒内完成。

#![allow(dead_code)]

use picker_driver::{
    Dispatcher, MonitorConfig, OrchestratorConfig, OrchestratorMetrics, ReportHub, TargetQueue,
    TaskContext,
};
use picker_protocol::{Point, Pose, PoseStamped, Quaternion, TargetDescriptor, Timestamp};
use picker_services::mock::{GripperBehavior, MockWorld, ServiceCall};
use std::sync::Arc;
use std::time::Duration;

pub const RAIL: &str = "robot_rail";
pub const ARM: &str = "robot";

pub const RAIL_PLAN: Duration = Duration::from_millis(40);
pub const ARM_PLAN: Duration = Duration::from_millis(200);
pub const ATTACH_AFTER: Duration = Duration::from_millis(80);

/// 初始化日志（多次调用安全）
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        tick_period_ms: 10,
        service_timeout_ms: 10,
        settle_delay_ms: 0,
        monitor: MonitorConfig {
            acquisition_period_ms: 10,
            retention_period_ms: 10,
            attachment_poll_ms: 5,
            attachment_timeout_ms: 300,
        },
        ..Default::default()
    }
}

pub fn fast_world() -> MockWorld {
    init_tracing();
    let world = MockWorld::new();
    world.set_plan_duration(RAIL, RAIL_PLAN);
    world.set_plan_duration(ARM, ARM_PLAN);
    world.set_named_move_duration(Duration::from_millis(5));
    world.set_gripper(GripperBehavior::AttachOnContact {
        after: ATTACH_AFTER,
    });
    world
}

pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub queue: Arc<TargetQueue>,
    pub metrics: Arc<OrchestratorMetrics>,
    pub reports: Arc<ReportHub>,
}

/// 不带 tick 线程的调度器，测试中手动 tick
pub fn harness(world: &MockWorld, config: OrchestratorConfig) -> Harness {
    let queue = Arc::new(TargetQueue::new(config.queue_warn_threshold));
    let metrics = Arc::new(OrchestratorMetrics::new());
    let reports = Arc::new(ReportHub::new());
    let ctx = TaskContext::new(&world.services(), world.feedback(), config);
    Harness {
        dispatcher: Arc::new(Dispatcher::new(
            ctx,
            queue.clone(),
            metrics.clone(),
            reports.clone(),
        )),
        queue,
        metrics,
        reports,
    }
}

fn pose(frame: &str, stamp: Timestamp, x: f64, y: f64, z: f64) -> PoseStamped {
    PoseStamped::new(
        frame,
        stamp,
        Pose::new(Point::new(x, y, z), Quaternion::identity()),
    )
}

/// 物体在 `lead` 之后到达抓取点的目标
pub fn target_in(lead: Duration) -> TargetDescriptor {
    let now = Timestamp::now();
    let pick_time = now.saturating_add(lead);
    TargetDescriptor::new(
        pose("world", now, 1.0, 0.5, 1.2),
        pose("world", pick_time, 1.0, 0.5, 0.9),
        pose("world", now, 1.0, 0.5, 1.2),
        pose("world", now, -1.0, 0.0, 1.0),
    )
}

/// 抓取时刻已过去的目标
pub fn stale_target() -> TargetDescriptor {
    target_in(Duration::ZERO)
}

pub fn position_of(calls: &[ServiceCall], pred: impl Fn(&ServiceCall) -> bool) -> Option<usize> {
    calls.iter().position(pred)
}

/// 规划调用的运动组序列
pub fn planned_groups(calls: &[ServiceCall]) -> Vec<String> {
    calls
        .iter()
        .filter_map(|c| match c {
            ServiceCall::Plan { group, .. } => Some(group.clone()),
            _ => None,
        })
        .collect()
}

/// 断言安全终态：执行器关闭、控制器全部停用
pub fn assert_safe_terminal_state(world: &MockWorld) {
    let snapshot = world.snapshot();
    assert!(!snapshot.actuator_engaged, "actuator left engaged");
    assert!(
        snapshot.active_controllers.is_empty(),
        "controllers left active: {:?}",
        snapshot.active_controllers
    );
    assert!(snapshot.executing.is_none());
}
