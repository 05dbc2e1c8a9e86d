//! 延迟任务调度
//! 引擎内部的虚拟时钟，只在 `advance` 时前进，不创建线程也不阻塞

use std::time::Duration;

use crate::dom::Selector;

/// 一次性延迟任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    /// 对 locator 的第一个匹配元素禁止翻译
    StopSearch { locator: Selector },
}

#[derive(Debug, Clone)]
struct Scheduled {
    due: Duration,
    seq: u64,
    task: DeferredTask,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    now: Duration,
    next_seq: u64,
    queue: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前虚拟时间
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn schedule(&mut self, delay: Duration, task: DeferredTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled {
            due: self.now + delay,
            seq,
            task,
        });
    }

    /// 推进时钟，按到期时间和登记顺序取出到期任务
    pub fn advance(&mut self, elapsed: Duration) -> Vec<DeferredTask> {
        self.now += elapsed;
        let now = self.now;
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.queue).into_iter().partition(|item| item.due <= now);
        self.queue = pending;
        due.sort_by_key(|item| (item.due, item.seq));
        due.into_iter().map(|item| item.task).collect()
    }
}
