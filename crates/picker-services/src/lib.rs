//! 外部服务抽象层
//!
//! 编排器通过本 crate 定义的窄接口与外部系统交互：
//!
//! - [`MotionPlanningService`]：运动规划（IK/碰撞检测在服务内完成）
//! - [`TrajectoryExecutionService`]：同步轨迹执行，直到完成或被 stop
//! - [`ActuatorService`]：末端执行器（真空吸盘）开关
//! - [`ControllerSwitchService`]：运动控制器激活/停用
//! - [`MotionGroupInterface`]：运动组查询、stop、移动到命名位姿
//! - [`AttachmentFeedback`]：异步写入的"物体是否吸附"信号
//!
//! 传输层（节点启动、话题/服务绑定）不在本 crate 范围内，由具体实现负责。
//!
//! # Feature Flags
//!
//! - `mock`：启用 [`mock::MockWorld`]，在进程内模拟全部服务（测试与 CLI 仿真）
//! - `serde`：转发到 `picker-protocol/serde`，为协议类型启用序列化

mod error;
mod feedback;
mod service;

#[cfg(feature = "mock")]
pub mod mock;

pub use error::ServiceError;
pub use feedback::AttachmentFeedback;
pub use service::{
    ActuatorService, ControllerSwitchService, MotionGroupInterface, MotionPlanningService,
    MoveMode, ServiceEndpoint, Services, TrajectoryExecutionService,
};
