//! 关节轨迹与运动规划结果
//!
//! # 首航点时间修正
//!
//! 下游轨迹控制器无法执行首段时长为零的轨迹。规划器返回的轨迹首航点
//! `time_from_start` 通常为 0，因此每条轨迹在执行前都必须经过
//! [`JointTrajectory::curate`] 修正为一个小的正值（默认 10ms）。

use crate::error::ProtocolError;
use std::time::Duration;

/// 首航点修正的默认时间（10ms）
pub const FIRST_WAYPOINT_EPSILON: Duration = Duration::from_millis(10);

/// 轨迹航点
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointTrajectoryPoint {
    /// 关节位置（rad 或 m，与 `joint_names` 一一对应）
    pub positions: Vec<f64>,
    /// 相对轨迹起点的时间
    pub time_from_start: Duration,
}

impl JointTrajectoryPoint {
    pub fn new(positions: Vec<f64>, time_from_start: Duration) -> Self {
        Self {
            positions,
            time_from_start,
        }
    }
}

/// 关节轨迹
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointTrajectory {
    pub joint_names: Vec<String>,
    pub points: Vec<JointTrajectoryPoint>,
}

impl JointTrajectory {
    pub fn new(joint_names: Vec<String>, points: Vec<JointTrajectoryPoint>) -> Self {
        Self {
            joint_names,
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 轨迹总时长（末航点的 `time_from_start`），空轨迹为零
    pub fn duration(&self) -> Duration {
        self.points.last().map(|p| p.time_from_start).unwrap_or_default()
    }

    /// 首航点时间修正
    ///
    /// 若首航点 `time_from_start` 为零，则改为 `epsilon`；否则保持不变。
    ///
    /// # 错误
    ///
    /// 空轨迹返回 `ProtocolError::EmptyTrajectory`。
    ///
    /// # 示例
    ///
    /// ```rust
    /// use picker_protocol::{JointTrajectory, JointTrajectoryPoint, FIRST_WAYPOINT_EPSILON};
    /// use std::time::Duration;
    ///
    /// let mut traj = JointTrajectory::new(
    ///     vec!["j1".into()],
    ///     vec![
    ///         JointTrajectoryPoint::new(vec![0.0], Duration::ZERO),
    ///         JointTrajectoryPoint::new(vec![1.0], Duration::from_secs(2)),
    ///     ],
    /// );
    /// traj.curate(FIRST_WAYPOINT_EPSILON).unwrap();
    /// assert_eq!(traj.points[0].time_from_start, Duration::from_millis(10));
    /// ```
    pub fn curate(&mut self, epsilon: Duration) -> Result<(), ProtocolError> {
        let first = self.points.first_mut().ok_or(ProtocolError::EmptyTrajectory)?;
        if first.time_from_start.is_zero() {
            first.time_from_start = epsilon;
        }
        Ok(())
    }
}

/// 机器人状态快照（关节名 + 位置）
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotState {
    pub joint_names: Vec<String>,
    pub positions: Vec<f64>,
}

impl RobotState {
    pub fn new(joint_names: Vec<String>, positions: Vec<f64>) -> Self {
        Self {
            joint_names,
            positions,
        }
    }

    /// 按关节名查询位置
    pub fn position_of(&self, joint: &str) -> Option<f64> {
        self.joint_names
            .iter()
            .position(|name| name == joint)
            .and_then(|idx| self.positions.get(idx).copied())
    }
}

/// 运动规划结果
///
/// 由请求它的任务阶段独占，执行器消费一次，不重试、不修改。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionPlan {
    pub trajectory: JointTrajectory,
    pub start_state: RobotState,
    /// 规划耗时（秒，仅作记录）
    pub planning_time: f64,
}

impl MotionPlan {
    /// 计划执行时长
    pub fn duration(&self) -> Duration {
        self.trajectory.duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traj(times_ms: &[u64]) -> JointTrajectory {
        JointTrajectory::new(
            vec!["rail".into(), "shoulder".into()],
            times_ms
                .iter()
                .map(|&t| JointTrajectoryPoint::new(vec![0.0, 0.0], Duration::from_millis(t)))
                .collect(),
        )
    }

    #[test]
    fn test_curate_zero_first_waypoint() {
        let mut t = traj(&[0, 500, 1200]);
        t.curate(FIRST_WAYPOINT_EPSILON).unwrap();
        assert_eq!(t.points[0].time_from_start, Duration::from_millis(10));
        // 其余航点不变
        assert_eq!(t.points[1].time_from_start, Duration::from_millis(500));
        assert_eq!(t.duration(), Duration::from_millis(1200));
    }

    #[test]
    fn test_curate_keeps_positive_first_waypoint() {
        let mut t = traj(&[40, 500]);
        t.curate(FIRST_WAYPOINT_EPSILON).unwrap();
        assert_eq!(t.points[0].time_from_start, Duration::from_millis(40));
    }

    #[test]
    fn test_curate_empty_trajectory() {
        let mut t = JointTrajectory::default();
        assert_eq!(
            t.curate(FIRST_WAYPOINT_EPSILON),
            Err(ProtocolError::EmptyTrajectory)
        );
        assert_eq!(t.duration(), Duration::ZERO);
    }

    #[test]
    fn test_robot_state_lookup() {
        let state = RobotState::new(vec!["a".into(), "b".into()], vec![0.1, 0.2]);
        assert_eq!(state.position_of("b"), Some(0.2));
        assert_eq!(state.position_of("c"), None);
    }
}
