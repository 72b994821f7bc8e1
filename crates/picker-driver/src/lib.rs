//! # Picker Driver
//!
//! 单机抓放任务编排器：从目标队列逐个取出目标，按 approach → pick → retreat → place
//! 顺序规划并执行轨迹，在抓取阶段协调吸盘与吸附反馈，任何退出路径都收敛到同一个安全终态
//! （等待位姿、吸盘关闭、控制器停用、监视器停止）。
//!
//! ## 模块
//!
//! - `queue`: FIFO 目标队列
//! - `dispatcher`: tick 驱动的单飞调度与任务阶段
//! - `planner` / `executor` / `actuator`: 外部服务的窄封装
//! - `rendezvous`: 抓取时刻汇合计算
//! - `monitor`: 吸附检测/保持监视线程
//! - `cleanup`: 作用域清理守卫
//! - `orchestrator` / `builder`: 启动序列与后台 tick 线程
//!
//! # 示例
//!
//! ```rust,no_run
//! use picker_driver::OrchestratorBuilder;
//! # fn example(services: picker_services::Services) -> Result<(), picker_driver::OrchestratorError> {
//! let orchestrator = OrchestratorBuilder::new().services(services).build()?;
//! let reports = orchestrator.subscribe();
//! for report in reports.iter().take(1) {
//!     println!("task {} -> {:?}", report.task_id, report.outcome);
//! }
//! # Ok(())
//! # }
//! ```

mod actuator;
mod builder;
mod cleanup;
mod config;
mod context;
mod dispatcher;
mod error;
mod executor;
mod metrics;
pub mod monitor;
mod orchestrator;
mod planner;
mod queue;
pub mod rendezvous;
mod report;
mod state;

pub use actuator::ActuatorController;
pub use builder::OrchestratorBuilder;
pub use cleanup::CleanupGuard;
pub use config::{MonitorConfig, OrchestratorConfig, PlanningConfig, YawTolerances};
pub use context::TaskContext;
pub use dispatcher::{Dispatcher, TickOutcome};
pub use error::{OrchestratorError, PlanningError, TimingInfeasible};
pub use executor::TrajectoryExecutor;
pub use metrics::{MetricsSnapshot, OrchestratorMetrics};
pub use monitor::{ContactMonitor, MonitorKind, wait_for_attachment};
pub use orchestrator::Orchestrator;
pub use planner::MotionPlanClient;
pub use queue::TargetQueue;
pub use report::{FailureKind, Phase, ReportHub, TaskOutcome, TaskReport};
pub use state::BusyFlag;
