//! 单飞门控标志
//!
//! 进程内唯一：控制循环在任务入口原子置位，清理守卫无条件清除。

use std::sync::atomic::{AtomicBool, Ordering};

/// 忙标志
#[derive(Debug, Default)]
pub struct BusyFlag {
    busy: AtomicBool,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试置位，已置位时返回 `false`
    #[inline]
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 清除（幂等）
    #[inline]
    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}
