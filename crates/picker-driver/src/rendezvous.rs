//! 抓取时刻汇合计算
//!
//! 物体随传送带运动，抓取位姿的时间戳是物体到达抓取点的绝对时刻。
//! 抓取轨迹必须恰好在该时刻结束：
//!
//! ```text
//! wait = (pick_time - now) - duration
//! ```
//!
//! 若 `now + duration > pick_time` 则无法赶上，目标直接丢弃。

use crate::error::TimingInfeasible;
use picker_protocol::Timestamp;
use std::time::Duration;
use tracing::debug;

/// 计算开始执行抓取轨迹前需要等待的时间
///
/// # 示例
///
/// ```rust
/// use picker_driver::rendezvous::compute_wait;
/// use picker_protocol::Timestamp;
/// use std::time::Duration;
///
/// let now = Timestamp::from_secs_f64(100.0);
/// let pick_time = Timestamp::from_secs_f64(110.0);
/// let wait = compute_wait(pick_time, now, Duration::from_secs(4)).unwrap();
/// assert_eq!(wait, Duration::from_secs(6));
/// ```
///
/// # 错误
///
/// `now + duration > pick_time` 时返回 [`TimingInfeasible`]。
pub fn compute_wait(
    pick_time: Timestamp,
    now: Timestamp,
    duration: Duration,
) -> Result<Duration, TimingInfeasible> {
    let arrival = now.saturating_add(duration);
    if arrival > pick_time {
        return Err(TimingInfeasible {
            pick_time,
            now,
            duration,
        });
    }
    Ok(pick_time.saturating_duration_since(arrival))
}

/// 挂起当前线程直到汇合窗口开始
pub fn wait_for_window(wait: Duration) {
    if wait.is_zero() {
        return;
    }
    debug!("Waiting {:.3}s for pick window", wait.as_secs_f64());
    spin_sleep::sleep(wait);
}
