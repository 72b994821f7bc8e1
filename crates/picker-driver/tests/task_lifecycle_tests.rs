//! 任务生命周期集成测试
//!
//! 使用模拟世界驱动完整任务，验证阶段顺序、失败路径和清理终态。

mod common;

use common::*;
use picker_driver::{FailureKind, Phase, TaskOutcome, TaskReport, TickOutcome};
use picker_protocol::ErrorCode;
use picker_services::MoveMode;
use picker_services::mock::{GripperBehavior, PlanBehavior, ServiceCall};
use serial_test::serial;
use std::time::{Duration, Instant};

fn processed(outcome: TickOutcome) -> TaskReport {
    match outcome {
        TickOutcome::Processed(report) => report,
        other => panic!("expected a processed task, got {:?}", other),
    }
}

fn failed_with(report: &TaskReport, phase: Phase, kind: FailureKind) {
    match &report.outcome {
        TaskOutcome::Failed {
            phase: p, kind: k, ..
        } => {
            assert_eq!((*p, *k), (phase, kind), "unexpected failure: {:?}", report);
        },
        TaskOutcome::Succeeded => panic!("expected failure in {} phase", phase),
    }
}

#[test]
#[serial]
fn test_successful_task() {
    let world = fast_world();
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));

    let report = processed(h.dispatcher.tick());

    assert_eq!(report.outcome, TaskOutcome::Succeeded);
    assert_eq!(report.degraded_executions, 0);

    let calls = world.calls();
    assert_eq!(planned_groups(&calls), vec![RAIL, ARM, ARM, RAIL]);

    // 放置阶段使用宽松偏航容差
    let yaw: Vec<f64> = calls
        .iter()
        .filter_map(|c| match c {
            ServiceCall::Plan { yaw_tolerance, .. } => Some(*yaw_tolerance),
            _ => None,
        })
        .collect();
    assert_eq!(yaw[..3], [0.1, 0.1, 0.1]);
    assert!(yaw[3] > 3.0);

    // 所有执行的首航点都经过修正
    for call in &calls {
        if let ServiceCall::Execute { first_waypoint, .. } = call {
            assert_eq!(*first_waypoint, Duration::from_millis(10));
        }
    }

    // 成功路径异步回等待位姿
    assert!(calls.contains(&ServiceCall::MoveNamed {
        group: RAIL.into(),
        pose: "RAIL_ARM_WAIT".into(),
        mode: MoveMode::Async,
    }));

    assert_safe_terminal_state(&world);
    assert!(!world.snapshot().concurrent_execution_detected);
    assert!(!world.feedback().is_attached());
    assert!(!h.dispatcher.is_busy());
    assert_eq!(h.metrics.snapshot().tasks_succeeded, 1);
}

#[test]
#[serial]
fn test_pick_waits_for_rendezvous() {
    let world = fast_world();
    // 吸附发生在抓取轨迹末尾，轨迹不会被提前 stop
    world.set_gripper(GripperBehavior::AttachOnContact {
        after: Duration::from_secs(1),
    });
    let h = harness(&world, fast_config());
    let lead = Duration::from_millis(700);
    let target = target_in(lead);
    let pick_time = target.pick_time();
    h.queue.push(target);

    let start = Instant::now();
    let report = processed(h.dispatcher.tick());
    assert!(report.outcome.is_success());
    // 抓取轨迹在物体到达之前不会结束
    assert!(start.elapsed() >= lead);
    assert_eq!(report.degraded_executions, 0);
    assert!(picker_protocol::Timestamp::now() >= pick_time);
}

#[test]
#[serial]
fn test_timing_infeasible_skips_actuator() {
    let world = fast_world();
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(50)));

    let report = processed(h.dispatcher.tick());
    failed_with(&report, Phase::Pick, FailureKind::TimingInfeasible);

    let calls = world.calls();
    assert!(!calls.contains(&ServiceCall::Actuator { enable: true }));
    assert!(
        !calls
            .iter()
            .any(|c| matches!(c, ServiceCall::Execute { group, .. } if group == ARM)),
        "pick motion must not start"
    );
    // 目标被丢弃，不重新入队
    assert!(h.queue.is_empty());
    assert_safe_terminal_state(&world);
}

#[test]
#[serial]
fn test_approach_planning_failure_returns_rail_to_safe_pose() {
    let world = fast_world();
    world.script_plan(PlanBehavior::Fail(ErrorCode::PlanningFailed));
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));

    let report = processed(h.dispatcher.tick());
    failed_with(&report, Phase::Approach, FailureKind::Planning);

    let calls = world.calls();
    assert_eq!(planned_groups(&calls), vec![RAIL]);
    assert!(!calls.iter().any(|c| matches!(c, ServiceCall::Execute { .. })));
    assert!(calls.contains(&ServiceCall::MoveNamed {
        group: RAIL.into(),
        pose: "RAIL_ARM_WAIT".into(),
        mode: MoveMode::Blocking,
    }));
    assert_safe_terminal_state(&world);
}

#[test]
#[serial]
fn test_planning_service_unreachable_aborts_task_only() {
    let world = fast_world();
    world.script_plan(PlanBehavior::Succeed);
    world.script_plan(PlanBehavior::Unreachable);
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));
    h.queue.push(target_in(Duration::from_millis(2500)));

    let first = processed(h.dispatcher.tick());
    failed_with(&first, Phase::Pick, FailureKind::Planning);

    // 下一个目标照常处理
    let second = processed(h.dispatcher.tick());
    assert!(second.outcome.is_success(), "{:?}", second);
}

#[test]
#[serial]
fn test_empty_trajectory_is_planning_failure() {
    let world = fast_world();
    world.script_plan(PlanBehavior::EmptyTrajectory);
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));

    let report = processed(h.dispatcher.tick());
    failed_with(&report, Phase::Approach, FailureKind::Planning);
    assert!(!world.calls().iter().any(|c| matches!(c, ServiceCall::Execute { .. })));
}

#[test]
#[serial]
fn test_execution_failure_is_not_fatal() {
    let world = fast_world();
    world.script_execution(picker_services::mock::ExecBehavior::Fail(ErrorCode::ControlFailed));
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));

    let report = processed(h.dispatcher.tick());
    assert!(report.outcome.is_success());
    assert_eq!(report.degraded_executions, 1);
    assert_eq!(h.metrics.snapshot().degraded_executions, 1);
}

#[test]
#[serial]
fn test_actuator_engage_failure() {
    let world = fast_world();
    world.set_actuator_fails(true);
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));

    let report = processed(h.dispatcher.tick());
    failed_with(&report, Phase::Pick, FailureKind::ActuatorFailure);
    assert!(
        !world
            .calls()
            .iter()
            .any(|c| matches!(c, ServiceCall::Execute { group, .. } if group == ARM))
    );
    assert!(world.snapshot().active_controllers.is_empty());
}

#[test]
#[serial]
fn test_attachment_timeout() {
    let world = fast_world();
    world.set_gripper(GripperBehavior::Never);
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));

    let report = processed(h.dispatcher.tick());
    failed_with(&report, Phase::Pick, FailureKind::AttachmentTimeout);

    // 未进入撤离阶段
    assert_eq!(planned_groups(&world.calls()), vec![RAIL, ARM]);
    assert_safe_terminal_state(&world);
}

#[test]
#[serial]
fn test_cleanup_postcondition_on_every_exit_path() {
    type Setup = fn(&picker_services::mock::MockWorld);
    let scenarios: [(&str, Setup); 5] = [
        ("success", |_| {}),
        ("approach planning", |w| {
            w.script_plan(PlanBehavior::Fail(ErrorCode::NoIkSolution))
        }),
        ("retreat planning", |w| {
            w.script_plan(PlanBehavior::Succeed);
            w.script_plan(PlanBehavior::Succeed);
            w.script_plan(PlanBehavior::Fail(ErrorCode::GoalInCollision));
        }),
        ("attachment timeout", |w| w.set_gripper(GripperBehavior::Never)),
        ("contact loss", |w| {
            w.set_gripper(GripperBehavior::DropDuringTransfer {
                attach_after: ATTACH_AFTER,
                drop_after: Duration::from_millis(50),
            })
        }),
    ];

    for (name, setup) in scenarios {
        let world = fast_world();
        setup(&world);
        let h = harness(&world, fast_config());
        h.queue.push(target_in(Duration::from_millis(600)));

        assert!(!h.dispatcher.is_busy(), "{}: busy before", name);
        let report = processed(h.dispatcher.tick());
        assert!(!h.dispatcher.is_busy(), "{}: busy after", name);

        assert_safe_terminal_state(&world);
        assert!(!world.feedback().is_attached(), "{}", name);

        // 监视器已停止：之后的反馈变化不再触发 stop
        let stops_before = world
            .calls()
            .iter()
            .filter(|c| matches!(c, ServiceCall::Stop { .. }))
            .count();
        world.feedback().set(true);
        std::thread::sleep(Duration::from_millis(40));
        world.feedback().set(false);
        std::thread::sleep(Duration::from_millis(40));
        let stops_after = world
            .calls()
            .iter()
            .filter(|c| matches!(c, ServiceCall::Stop { .. }))
            .count();
        assert_eq!(stops_before, stops_after, "{}: monitor still running", name);

        // 失败路径同步回等待位姿，成功路径异步
        let expected_mode = if report.outcome.is_success() {
            MoveMode::Async
        } else {
            MoveMode::Blocking
        };
        let last_move = world.calls().into_iter().rev().find_map(|c| match c {
            ServiceCall::MoveNamed { mode, .. } => Some(mode),
            _ => None,
        });
        assert_eq!(last_move, Some(expected_mode), "{}", name);
    }
}

#[test]
#[serial]
fn test_reset_and_release_are_idempotent() {
    let world = fast_world();
    let h = harness(&world, fast_config());

    h.queue.push(stale_target());
    h.queue.push(stale_target());
    processed(h.dispatcher.tick());
    let first = world.snapshot();
    processed(h.dispatcher.tick());
    let second = world.snapshot();

    assert_eq!(first.actuator_engaged, second.actuator_engaged);
    assert_eq!(first.active_controllers, second.active_controllers);
    assert_safe_terminal_state(&world);

    // 每个任务开头都先停用控制器、关闭执行器、stop 两个运动组
    let calls = world.calls();
    let resets = calls
        .windows(5)
        .filter(|w| {
            matches!(&w[2], ServiceCall::Actuator { enable: false })
                && w[3] == ServiceCall::Stop { group: RAIL.into() }
                && w[4] == ServiceCall::Stop { group: ARM.into() }
        })
        .count();
    assert_eq!(resets, 2);
}
