//! 变更监听
//! 引擎的唯一入口：根据变更记录计算待翻译节点，检测路由变化，再依次执行选择器规则与文本规则

use tracing::debug;

use super::route::{strip_query, RouteResolver};
use super::scoped::ScopedApplier;
use super::state::EngineState;
use super::text_matcher::TextMatcher;
use crate::compiler::DictionaryStore;
use crate::config::GlobalConfig;
use crate::dom::{Document, MutationKind, MutationRecord, NodeId};

/// 监听状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListenerState {
    #[default]
    Idle,
    Observing,
}

/// 变更监听器
pub struct MutationListener;

impl MutationListener {
    /// 由变更记录得到需要翻译的节点
    ///
    /// 目标被禁止翻译的记录直接丢弃；子节点变更取新增节点，文本变更取目标节点，属性变更不产生节点。
    pub fn changed_nodes(doc: &Document, state: &EngineState, records: &[MutationRecord]) -> Vec<NodeId> {
        let mut changed = Vec::new();
        for record in records {
            if state.flags.is_excluded(doc, record.target) {
                continue;
            }
            match &record.kind {
                MutationKind::ChildList { added, .. } => changed.extend_from_slice(added),
                MutationKind::CharacterData => changed.push(record.target),
                MutationKind::Attributes { .. } => {}
            }
        }
        changed
    }

    /// 处理一批变更记录，返回该批次是否触发了翻译
    pub fn on_batch(
        doc: &mut Document,
        state: &mut EngineState,
        store: &DictionaryStore,
        config: &GlobalConfig,
        records: &[MutationRecord],
    ) -> bool {
        let changed = Self::changed_nodes(doc, state, records);
        if changed.is_empty() {
            return false;
        }

        let route = strip_query(doc.location()).to_string();
        if RouteResolver::resolve(&route, store, &mut state.active, &mut state.cache) {
            debug!("路由切换到 {:?}，已重新加载规则", route);
        }

        Self::translate(doc, state, config, &changed);
        true
    }

    /// 先对整个文档应用选择器规则，再逐个翻译变更节点
    pub fn translate(doc: &mut Document, state: &mut EngineState, config: &GlobalConfig, changed: &[NodeId]) {
        let scoped = std::mem::take(&mut state.active.scoped);
        state.active.scoped = ScopedApplier::apply(doc, state, scoped);

        for &node in changed {
            let unscoped = std::mem::take(&mut state.active.unscoped);
            state.active.unscoped = TextMatcher::apply(doc, state, node, unscoped, config.warn_unmatched);
        }
    }
}
