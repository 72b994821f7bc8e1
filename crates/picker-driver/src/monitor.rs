//! 接触监视器 - 后台轮询吸附状态
//!
//! 两种监视器在任务的不同阶段运行，任一时刻最多一个处于活动状态：
//!
//! - **吸附检测**（抓取轨迹执行期间）：检测到吸附后立即 stop 机械臂上正在执行的轨迹，然后退出
//! - **吸附保持**（确认吸附后直到放置释放）：检测到脱落后标记任务失败、stop 两个运动组，然后退出
//!
//! 监视线程通过 stop 通道协调退出：`recv_timeout(period)` 既是轮询节拍，
//! 也是退出信号。`Drop` 时发送 stop 并 join 线程。

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use picker_services::{AttachmentFeedback, MotionGroupInterface};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

/// 监视器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorKind {
    /// 吸附检测
    Acquisition,
    /// 吸附保持
    Retention,
}

/// 接触监视器
pub struct ContactMonitor {
    kind: MonitorKind,
    stop_tx: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
    triggered: Arc<AtomicBool>,
}

impl ContactMonitor {
    /// 启动吸附检测监视器
    ///
    /// 吸附状态变为 `true` 时 stop `arm_group` 并退出。
    pub fn acquisition(
        feedback: AttachmentFeedback,
        groups: Arc<dyn MotionGroupInterface>,
        arm_group: String,
        period: Duration,
    ) -> Self {
        Self::spawn(MonitorKind::Acquisition, period, move || {
            if !feedback.is_attached() {
                return false;
            }
            info!("Object attached, stopping '{}'", arm_group);
            groups.stop(&arm_group);
            true
        })
    }

    /// 启动吸附保持监视器
    ///
    /// 吸附状态变为 `false` 时置位 `contact_lost`，stop 两个运动组并退出。
    pub fn retention(
        feedback: AttachmentFeedback,
        groups: Arc<dyn MotionGroupInterface>,
        rail_group: String,
        arm_group: String,
        period: Duration,
        contact_lost: Arc<AtomicBool>,
    ) -> Self {
        Self::spawn(MonitorKind::Retention, period, move || {
            if feedback.is_attached() {
                return false;
            }
            contact_lost.store(true, Ordering::Release);
            error!("Object became detached, stopping '{}' and '{}'", rail_group, arm_group);
            groups.stop(&rail_group);
            groups.stop(&arm_group);
            true
        })
    }

    /// 启动监视线程
    ///
    /// `check` 返回 `true` 表示已触发，线程随即退出。
    fn spawn<F>(kind: MonitorKind, period: Duration, mut check: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let triggered = Arc::new(AtomicBool::new(false));
        let triggered_clone = triggered.clone();

        let handle = thread::spawn(move || {
            Self::monitor_loop(kind, period, stop_rx, triggered_clone, &mut check);
        });

        Self {
            kind,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            triggered,
        }
    }

    /// 监控循环
    fn monitor_loop(
        kind: MonitorKind,
        period: Duration,
        stop_rx: Receiver<()>,
        triggered: Arc<AtomicBool>,
        check: &mut dyn FnMut() -> bool,
    ) {
        trace!("{:?} monitor started, period {:?}", kind, period);
        loop {
            match stop_rx.recv_timeout(period) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {},
            }
            if check() {
                triggered.store(true, Ordering::Release);
                break;
            }
        }
        trace!("{:?} monitor exited", kind);
    }

    pub fn kind(&self) -> MonitorKind {
        self.kind
    }

    /// 监视条件是否已触发
    pub fn triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// 检查监视线程是否在运行
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 停止监视线程并等待其退出（幂等）
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // 线程已退出时发送失败，忽略
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ContactMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ContactMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactMonitor")
            .field("kind", &self.kind)
            .field("running", &self.is_running())
            .field("triggered", &self.triggered())
            .finish()
    }
}

/// 阻塞等待吸附
///
/// 每 `poll` 检查一次，最长 `timeout`。吸附返回 `true`，超时返回 `false`。
pub fn wait_for_attachment(feedback: &AttachmentFeedback, timeout: Duration, poll: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if feedback.is_attached() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(poll.min(deadline - now));
    }
}
