//! 几何类型与朝向组合
//!
//! 提供位姿（`Pose`）、带时间戳位姿（`PoseStamped`）、绝对时间戳（`Timestamp`），
//! 以及抓取/放置时对末端朝向施加的固定偏航旋转。
//!
//! 朝向组合是纯函数：`q' = q · r`，其中 `r` 为绕 Z 轴的旋转。
//! 放置旋转 = 抓取旋转再绕同一轴旋转 π。
//!
//! # 示例
//!
//! ```rust
//! use picker_protocol::{GraspRotations, Pose};
//!
//! let rotations = GraspRotations::from_pick_angle(std::f64::consts::FRAC_PI_2);
//! let pose = Pose::default();
//! let pick = rotations.apply_pick(&pose);
//! let place = rotations.apply_place(&pose);
//! assert!((pick.orientation.yaw() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
//! assert!((place.orientation.yaw() + std::f64::consts::FRAC_PI_2).abs() < 1e-9);
//! ```

use crate::error::ProtocolError;
use nalgebra::{Quaternion as NaQuaternion, Unit, UnitQuaternion, Vector3};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 三维点（米）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 四元数（x, y, z, w 顺序，与消息格式一致）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// 单位四元数（无旋转）
    pub const fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    /// 绕 Z 轴旋转 `yaw` 弧度
    pub fn from_yaw(yaw: f64) -> Self {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw).into()
    }

    /// 转换为 nalgebra 单位四元数
    ///
    /// # 错误
    ///
    /// 范数为零或包含非有限值时返回 `ProtocolError::DegenerateQuaternion`。
    pub fn to_unit(&self) -> Result<UnitQuaternion<f64>, ProtocolError> {
        let q = NaQuaternion::new(self.w, self.x, self.y, self.z);
        let finite = [self.x, self.y, self.z, self.w].iter().all(|v| v.is_finite());
        if !finite || q.norm() <= f64::EPSILON {
            return Err(ProtocolError::DegenerateQuaternion {
                x: self.x,
                y: self.y,
                z: self.z,
                w: self.w,
            });
        }
        Ok(Unit::new_normalize(q))
    }

    /// 偏航角（弧度，范围 [-π, π]）
    ///
    /// 退化四元数返回 0。
    pub fn yaw(&self) -> f64 {
        self.to_unit().map(|q| q.euler_angles().2).unwrap_or(0.0)
    }
}

impl From<UnitQuaternion<f64>> for Quaternion {
    fn from(q: UnitQuaternion<f64>) -> Self {
        let q = q.quaternion();
        Self {
            x: q.i,
            y: q.j,
            z: q.k,
            w: q.w,
        }
    }
}

/// 位姿：位置 + 朝向
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

impl Pose {
    pub const fn new(position: Point, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// 将朝向右乘 `rotation`（位置不变）
    ///
    /// 退化朝向视为单位四元数。
    pub fn rotated(&self, rotation: &UnitQuaternion<f64>) -> Self {
        let current = self.orientation.to_unit().unwrap_or_else(|_| UnitQuaternion::identity());
        Self {
            position: self.position,
            orientation: (current * *rotation).into(),
        }
    }
}

/// 绝对时间戳（自 UNIX 纪元起）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(Duration);

impl Timestamp {
    /// 当前系统时间
    pub fn now() -> Self {
        Self(SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default())
    }

    pub const fn from_duration(since_epoch: Duration) -> Self {
        Self(since_epoch)
    }

    /// 负数和 NaN 取零，超出 `Duration` 范围时饱和
    pub fn from_secs_f64(secs: f64) -> Self {
        let since_epoch = Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        });
        Self(since_epoch)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    pub const fn since_epoch(&self) -> Duration {
        self.0
    }

    /// `self + duration`（溢出时饱和）
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration))
    }

    /// `self - earlier`，若 `earlier` 更晚则为零
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// 带参考坐标系和时间戳的位姿
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseStamped {
    /// 参考坐标系
    pub frame_id: String,
    /// 时间戳（抓取位姿上表示物体到达抓取点的绝对时刻）
    pub stamp: Timestamp,
    pub pose: Pose,
}

impl PoseStamped {
    pub fn new(frame_id: impl Into<String>, stamp: Timestamp, pose: Pose) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp,
            pose,
        }
    }

    /// 返回朝向旋转后的副本（坐标系和时间戳不变）
    pub fn rotated(&self, rotation: &UnitQuaternion<f64>) -> Self {
        Self {
            frame_id: self.frame_id.clone(),
            stamp: self.stamp,
            pose: self.pose.rotated(rotation),
        }
    }
}

/// 抓取/放置朝向旋转
///
/// - 抓取：绕 Z 轴旋转首选抓取角
/// - 放置：抓取旋转再绕 Z 轴旋转 π
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraspRotations {
    pub pick: UnitQuaternion<f64>,
    pub place: UnitQuaternion<f64>,
}

impl GraspRotations {
    pub fn from_pick_angle(pick_angle: f64) -> Self {
        let pick = UnitQuaternion::identity()
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), pick_angle);
        let place = pick * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::PI);
        Self { pick, place }
    }

    pub fn apply_pick(&self, pose: &Pose) -> Pose {
        pose.rotated(&self.pick)
    }

    pub fn apply_place(&self, pose: &Pose) -> Pose {
        pose.rotated(&self.place)
    }
}
