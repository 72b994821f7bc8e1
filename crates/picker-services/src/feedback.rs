//! 吸附反馈信号
//!
//! 单写多读的原子布尔量：反馈接收路径写入，编排器内部（接触监视器、
//! 吸附等待）读取。无复合不变量跨越它，因此不需要锁。
//!
//! # 内存序
//!
//! 写入使用 Release，读取使用 Acquire，保证监视线程能看到最新写入。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 吸附状态（可克隆的共享句柄）
#[derive(Debug, Clone, Default)]
pub struct AttachmentFeedback {
    attached: Arc<AtomicBool>,
}

impl AttachmentFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// 反馈通道写入
    #[inline]
    pub fn set(&self, attached: bool) {
        self.attached.store(attached, Ordering::Release);
    }

    /// 当前是否吸附
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}
