//! 引擎状态
//! 当前路由的规则、缓存与各个侧表统一归 `EngineState` 所有，通过 `&mut` 显式传递

use std::sync::Arc;

use super::cache::MatchCache;
use super::flags::NodeFlags;
use super::mirror::MirrorTable;
use super::scheduler::Scheduler;
use crate::compiler::{ScopedRule, UnscopedRule};

/// 当前路由生效的规则
#[derive(Debug, Clone, Default)]
pub struct ActiveContent {
    /// 上次解析的路由（已去除查询串），启动时为 None 以保证首次必定重建
    pub route_key: Option<String>,
    pub unscoped: Vec<Arc<UnscopedRule>>,
    pub scoped: Vec<Arc<ScopedRule>>,
}

impl ActiveContent {
    pub fn is_empty(&self) -> bool {
        self.unscoped.is_empty() && self.scoped.is_empty()
    }
}

/// 累计计数，用于生成 flush 报告
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub substitutions: usize,
    pub cache_writes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub active: ActiveContent,
    pub cache: MatchCache,
    pub flags: NodeFlags,
    pub mirrors: MirrorTable,
    pub scheduler: Scheduler,
    pub stats: PassStats,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }
}
