//! 清理守卫
//!
//! 包裹整个任务流程的作用域守卫。无论任务从哪条路径退出（成功、提前返回、
//! 失败），`Drop` 都按固定顺序恰好执行一次：
//!
//! 1. 任务失败：同步移动粗运动组到等待位姿；成功：异步移动并等待沉降时间
//! 2. 关闭执行器
//! 3. 停用两个控制器（尽力而为）
//! 4. 停止活动中的接触监视器
//! 5. 清除忙标志
//!
//! 任务失败指：未调用 [`CleanupGuard::complete`]，或吸附保持监视器报告了脱落。

use crate::context::TaskContext;
use crate::monitor::ContactMonitor;
use crate::state::BusyFlag;
use picker_services::MoveMode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// 清理守卫
pub struct CleanupGuard<'a> {
    ctx: &'a TaskContext,
    busy: &'a BusyFlag,
    monitor: Option<ContactMonitor>,
    contact_lost: Arc<AtomicBool>,
    completed: bool,
}

impl<'a> CleanupGuard<'a> {
    /// 安装守卫（调用方已置位 `busy`）
    pub fn new(ctx: &'a TaskContext, busy: &'a BusyFlag) -> Self {
        Self {
            ctx,
            busy,
            monitor: None,
            contact_lost: Arc::new(AtomicBool::new(false)),
            completed: false,
        }
    }

    /// 安装接触监视器，先停止已有的监视器
    pub fn install_monitor(&mut self, monitor: ContactMonitor) {
        self.stop_monitor();
        debug!("{:?} monitor installed", monitor.kind());
        self.monitor = Some(monitor);
    }

    /// 停止当前监视器（无监视器时为空操作），返回其是否触发过
    ///
    /// 在线程 join 之后读取触发标志，不会漏掉停止前刚发生的触发。
    pub fn stop_monitor(&mut self) -> bool {
        match self.monitor.take() {
            Some(mut monitor) => {
                monitor.stop();
                monitor.triggered()
            },
            None => false,
        }
    }

    pub fn has_active_monitor(&self) -> bool {
        self.monitor.as_ref().is_some_and(|m| m.is_running())
    }

    /// 交给吸附保持监视器的脱落标志
    pub fn contact_lost_flag(&self) -> Arc<AtomicBool> {
        self.contact_lost.clone()
    }

    pub fn contact_lost(&self) -> bool {
        self.contact_lost.load(Ordering::Acquire)
    }

    /// 标记任务到达放置阶段末尾
    pub fn complete(&mut self) {
        self.completed = true;
    }

    pub fn task_failed(&self) -> bool {
        !self.completed || self.contact_lost()
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        let config = &self.ctx.config;
        let executor = &self.ctx.executor;

        if self.task_failed() {
            warn!("Task failed, returning '{}' to wait pose", config.rail.group_name);
            executor.move_to_wait_pose(&config.rail, &config.arm, MoveMode::Blocking);
        } else {
            executor.move_to_wait_pose(&config.rail, &config.arm, MoveMode::Async);
            spin_sleep::sleep(config.settle_delay());
        }

        if !self.ctx.actuator.set_actuator(false) {
            warn!("Actuator release failed during cleanup");
        }
        executor.deactivate_controller(&config.arm.controller_name);
        executor.deactivate_controller(&config.rail.controller_name);
        self.stop_monitor();
        self.busy.release();
        info!("Task cleanup finished");
    }
}
