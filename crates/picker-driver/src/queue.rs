//! 目标队列
//!
//! 严格 FIFO、无上界。入口追加，控制循环在空闲时弹出队首。
//! 入口速率持续高于处理速率时队列会无限增长，这是已知限制；
//! 超过告警阈值时只记录日志，不丢弃也不阻塞。

use parking_lot::Mutex;
use picker_protocol::TargetDescriptor;
use std::collections::VecDeque;
use tracing::warn;

/// 目标队列（互斥锁保护的追加/弹出）
#[derive(Debug)]
pub struct TargetQueue {
    inner: Mutex<VecDeque<TargetDescriptor>>,
    warn_threshold: usize,
}

impl TargetQueue {
    /// 创建队列，`warn_threshold` 为积压告警阈值（0 表示不告警）
    pub fn new(warn_threshold: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            warn_threshold,
        }
    }

    /// 追加到队尾，返回追加后的长度
    pub fn push(&self, target: TargetDescriptor) -> usize {
        let len = {
            let mut queue = self.inner.lock();
            queue.push_back(target);
            queue.len()
        };
        if self.warn_threshold > 0 && len > self.warn_threshold {
            warn!(
                "Target queue backlog {} exceeds threshold {}",
                len, self.warn_threshold
            );
        }
        len
    }

    /// 弹出队首
    pub fn pop(&self) -> Option<TargetDescriptor> {
        self.inner.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for TargetQueue {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picker_protocol::Timestamp;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    fn target(id: u64) -> TargetDescriptor {
        let mut t = TargetDescriptor::default();
        t.pick.stamp = Timestamp::from_secs_f64(id as f64);
        t
    }

    fn id_of(t: &TargetDescriptor) -> u64 {
        t.pick_time().as_secs_f64() as u64
    }

    #[test]
    fn test_fifo() {
        let queue = TargetQueue::new(0);
        assert!(queue.is_empty());
        assert_eq!(queue.push(target(1)), 1);
        assert_eq!(queue.push(target(2)), 2);

        assert_eq!(id_of(&queue.pop().unwrap()), 1);
        assert_eq!(id_of(&queue.pop().unwrap()), 2);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_unbounded_backlog() {
        // 超过告警阈值不丢弃
        let queue = TargetQueue::new(4);
        for id in 0..1000 {
            queue.push(target(id));
        }
        assert_eq!(queue.len(), 1000);
    }

    #[test]
    fn test_concurrent_producers_keep_per_producer_order() {
        let queue = Arc::new(TargetQueue::new(0));
        let handles: Vec<_> = (0..4u64)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        queue.push(target(p * 1000 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut last = [None::<u64>; 4];
        while let Some(t) = queue.pop() {
            let id = id_of(&t);
            let producer = (id / 1000) as usize;
            if let Some(prev) = last[producer] {
                assert!(id > prev);
            }
            last[producer] = Some(id);
        }
    }

    proptest! {
        #[test]
        fn prop_pop_order_matches_push_order(ids in proptest::collection::vec(0u64..10_000, 0..64)) {
            let queue = TargetQueue::new(0);
            for &id in &ids {
                queue.push(target(id));
            }
            let popped: Vec<u64> = std::iter::from_fn(|| queue.pop()).map(|t| id_of(&t)).collect();
            prop_assert_eq!(popped, ids);
        }
    }
}
