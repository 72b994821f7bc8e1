//! 吸附检测与保持监视集成测试

mod common;

use common::*;
use picker_driver::{FailureKind, Phase, TaskOutcome, TaskReport, TickOutcome};
use picker_protocol::ErrorCode;
use picker_services::MoveMode;
use picker_services::mock::{GripperBehavior, MockWorld, PlanBehavior, ServiceCall};
use serial_test::serial;
use std::time::Duration;

fn is_arm_execute(c: &ServiceCall) -> bool {
    matches!(c, ServiceCall::Execute { group, .. } if group == ARM)
}

fn rail_executions(calls: &[ServiceCall]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, ServiceCall::Execute { group, .. } if group == RAIL))
        .count()
}

/// 放置阶段吸附丢失的共同断言：任务失败、同步回等待位姿、安全终态
fn assert_lost_during_place(world: &MockWorld, report: &TaskReport) {
    assert_eq!(
        report.outcome.failure_kind(),
        Some(FailureKind::AttachmentLost),
        "{:?}",
        report
    );
    assert!(matches!(
        report.outcome,
        TaskOutcome::Failed {
            phase: Phase::Place,
            ..
        }
    ));
    assert!(world.calls().contains(&ServiceCall::MoveNamed {
        group: RAIL.into(),
        pose: "RAIL_ARM_WAIT".into(),
        mode: MoveMode::Blocking,
    }));
    assert_safe_terminal_state(world);
}

#[test]
#[serial]
fn test_acquisition_stops_pick_on_contact() {
    let world = fast_world();
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));

    let TickOutcome::Processed(report) = h.dispatcher.tick() else {
        panic!("expected a processed task");
    };
    assert!(report.outcome.is_success(), "{:?}", report);
    // 因接触被 stop 的抓取执行不算降级
    assert_eq!(report.degraded_executions, 0);

    let calls = world.calls();
    let pick_exec = position_of(&calls, is_arm_execute).expect("pick executed");
    let stop = calls
        .iter()
        .enumerate()
        .skip(pick_exec)
        .find(|(_, c)| **c == ServiceCall::Stop { group: ARM.into() })
        .map(|(i, _)| i)
        .expect("arm stopped after contact");
    let retreat_plan = calls
        .iter()
        .enumerate()
        .skip(pick_exec)
        .find(|(_, c)| matches!(c, ServiceCall::Plan { group, .. } if group == ARM))
        .map(|(i, _)| i)
        .expect("retreat planned");
    assert!(stop < retreat_plan);

    let finished = calls
        .iter()
        .skip(pick_exec)
        .find_map(|c| match c {
            ServiceCall::ExecuteFinished { group, code } if group == ARM => Some(*code),
            _ => None,
        });
    assert_eq!(finished, Some(ErrorCode::Preempted));
}

#[test]
#[serial]
fn test_contact_loss_during_retreat() {
    let world = fast_world();
    world.set_gripper(GripperBehavior::DropDuringTransfer {
        attach_after: ATTACH_AFTER,
        drop_after: Duration::from_millis(50),
    });
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));

    let TickOutcome::Processed(report) = h.dispatcher.tick() else {
        panic!("expected a processed task");
    };
    assert_eq!(report.outcome.failure_kind(), Some(FailureKind::AttachmentLost));
    assert!(matches!(
        report.outcome,
        TaskOutcome::Failed {
            phase: Phase::Retreat,
            ..
        }
    ));

    let calls = world.calls();
    let pick_exec = position_of(&calls, is_arm_execute).expect("pick executed");
    let after_pick = &calls[pick_exec..];
    // 保持监视器同时 stop 两个运动组
    assert!(after_pick.contains(&ServiceCall::Stop { group: RAIL.into() }));
    assert!(after_pick.contains(&ServiceCall::Stop { group: ARM.into() }));

    // 撤离后不再规划放置
    assert_eq!(planned_groups(&calls), vec![RAIL, ARM, ARM]);
    assert!(calls.contains(&ServiceCall::MoveNamed {
        group: RAIL.into(),
        pose: "RAIL_ARM_WAIT".into(),
        mode: MoveMode::Blocking,
    }));
    assert_safe_terminal_state(&world);
    assert_eq!(h.metrics.snapshot().attachment_lost, 1);
}

#[test]
#[serial]
fn test_retention_monitor_not_armed_before_attachment() {
    let world = fast_world();
    world.set_gripper(GripperBehavior::Never);
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));

    let TickOutcome::Processed(report) = h.dispatcher.tick() else {
        panic!("expected a processed task");
    };
    assert_eq!(report.outcome.failure_kind(), Some(FailureKind::AttachmentTimeout));

    // 未吸附时不应出现由保持监视器发出的导轨 stop（复位时的那次除外）
    let rail_stops = world
        .calls()
        .iter()
        .filter(|c| **c == ServiceCall::Stop { group: RAIL.into() })
        .count();
    assert_eq!(rail_stops, 1);
}

#[test]
#[serial]
fn test_contact_loss_while_planning_place() {
    let world = fast_world();
    world.script_plan(PlanBehavior::Succeed);
    world.script_plan(PlanBehavior::Succeed);
    world.script_plan(PlanBehavior::Succeed);
    world.script_plan(PlanBehavior::DetachDuring(Duration::from_millis(60)));
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(600)));

    let TickOutcome::Processed(report) = h.dispatcher.tick() else {
        panic!("expected a processed task");
    };
    assert_lost_during_place(&world, &report);

    let calls = world.calls();
    assert_eq!(planned_groups(&calls), vec![RAIL, ARM, ARM, RAIL]);
    // 放置轨迹未执行
    assert_eq!(rail_executions(&calls), 1);
    assert_eq!(h.metrics.snapshot().attachment_lost, 1);
}

#[test]
#[serial]
fn test_contact_loss_during_place_execution() {
    let world = fast_world();
    world.set_plan_duration(RAIL, Duration::from_millis(150));
    world.set_gripper(GripperBehavior::DropDuringPlace {
        attach_after: ATTACH_AFTER,
        drop_after: Duration::from_millis(20),
    });
    let h = harness(&world, fast_config());
    h.queue.push(target_in(Duration::from_millis(800)));

    let TickOutcome::Processed(report) = h.dispatcher.tick() else {
        panic!("expected a processed task");
    };
    // 放置阶段走完，但保持监视器已标记脱落
    assert_lost_during_place(&world, &report);

    let calls = world.calls();
    assert_eq!(rail_executions(&calls), 2);
    let place_exec = calls
        .iter()
        .rposition(|c| matches!(c, ServiceCall::Execute { group, .. } if group == RAIL))
        .unwrap();
    let after_place = &calls[place_exec..];
    assert!(after_place.contains(&ServiceCall::Stop { group: RAIL.into() }));
    assert!(after_place.contains(&ServiceCall::ExecuteFinished {
        group: RAIL.into(),
        code: ErrorCode::Preempted,
    }));
    assert_eq!(h.metrics.snapshot().attachment_lost, 1);
}
