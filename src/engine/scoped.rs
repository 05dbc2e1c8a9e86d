//! 选择器规则应用
//! 每个处理批次都会对整个文档重新应用所有选择器规则，由内容缓存避免重复替换

use std::sync::Arc;
use tracing::trace;

use super::state::EngineState;
use super::substitute::Substitution;
use crate::compiler::ScopedRule;
use crate::dom::Document;

/// 选择器规则应用器
pub struct ScopedApplier;

impl ScopedApplier {
    /// 应用全部选择器规则，返回保留下来的规则
    ///
    /// 没有匹配到任何元素的规则总会保留，其余规则只有设置了 reuse 才会保留。
    pub fn apply(doc: &mut Document, state: &mut EngineState, rules: Vec<Arc<ScopedRule>>) -> Vec<Arc<ScopedRule>> {
        rules
            .into_iter()
            .filter(|rule| Self::apply_rule(doc, state, rule))
            .collect()
    }

    /// 应用单条规则，返回规则是否保留
    fn apply_rule(doc: &mut Document, state: &mut EngineState, rule: &ScopedRule) -> bool {
        let targets = rule.locator.select_all(doc);
        if targets.is_empty() {
            return true;
        }

        let locator = rule.locator.as_str();
        for (index, element) in targets.into_iter().enumerate() {
            // 前面的替换可能已经移除或禁止了后面的目标
            if !doc.is_element(element) || !doc.is_connected(element) || state.flags.is_excluded(doc, element) {
                continue;
            }

            // 替身由受保护替换自行维护，不参与缓存比较
            if rule.protect && state.flags.is_mirror(element) {
                continue;
            }

            if rule.skip_repeat_check {
                Self::substitute(doc, state, rule, element);
                continue;
            }

            if state.cache.is_fresh(locator, index, &doc.inner_html(element)) {
                trace!("选择器 {} 第 {} 个元素内容未变化，跳过", locator, index);
                continue;
            }
            if let Some(content) = Self::substitute(doc, state, rule, element) {
                state.cache.insert(locator, index, content);
                state.stats.cache_writes += 1;
            }
        }
        rule.reuse
    }

    fn substitute(
        doc: &mut Document,
        state: &mut EngineState,
        rule: &ScopedRule,
        element: crate::dom::NodeId,
    ) -> Option<String> {
        if rule.protect {
            Substitution::substitute_protected(doc, state, element, &rule.replacement)
        } else {
            Substitution::substitute_element(doc, state, element, &rule.replacement)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Replacement;
    use crate::dom::Selector;
    use crate::engine::NodeFlag;

    fn title_rule() -> ScopedRule {
        ScopedRule::new(Selector::parse("div.title").unwrap(), Replacement::literal("标题")).reusable()
    }

    #[test]
    fn test_cache_hit_skips_and_revert_is_retranslated() {
        let mut doc = Document::parse_html("<div class=\"title\">Title</div>");
        let title = doc.children(doc.body())[0];
        let mut state = EngineState::new();
        let rules = vec![Arc::new(title_rule())];

        let rules = ScopedApplier::apply(&mut doc, &mut state, rules);
        assert_eq!(rules.len(), 1);
        assert_eq!(doc.inner_html(title), "标题");
        assert_eq!(state.cache.get("div.title", 0), Some("标题"));

        let before = state.stats;
        let rules = ScopedApplier::apply(&mut doc, &mut state, rules);
        assert_eq!(state.stats, before);

        // 宿主把内容改回原文
        doc.set_inner_html(title, "Title");
        ScopedApplier::apply(&mut doc, &mut state, rules);
        assert_eq!(doc.inner_html(title), "标题");
        assert_eq!(state.stats.cache_writes, 2);
    }

    #[test]
    fn test_zero_matches_survive_and_consumed_otherwise() {
        let mut doc = Document::parse_html("<p>x</p>");
        let mut state = EngineState::new();
        let missing = ScopedRule::new(Selector::parse(".missing").unwrap(), Replacement::literal("y"));
        let once = ScopedRule::new(Selector::parse("p").unwrap(), Replacement::literal("y"));

        let rules = ScopedApplier::apply(&mut doc, &mut state, vec![Arc::new(missing), Arc::new(once)]);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].locator.as_str(), ".missing");
    }

    #[test]
    fn test_skip_repeat_check_always_substitutes() {
        let mut doc = Document::parse_html("<span class=\"n\">1</span>");
        let mut state = EngineState::new();
        let rule = ScopedRule::new(
            Selector::parse("span.n").unwrap(),
            Replacement::element_fn(|ctx| {
                let next = ctx.text_content().parse::<u32>().unwrap_or(0) + 1;
                ctx.set_inner_html(&next.to_string());
            }),
        )
        .reusable()
        .skip_repeat_check();

        let rules = ScopedApplier::apply(&mut doc, &mut state, vec![Arc::new(rule)]);
        ScopedApplier::apply(&mut doc, &mut state, rules);
        let span = doc.children(doc.body())[0];
        assert_eq!(doc.inner_html(span), "3");
        assert!(state.cache.is_empty());
    }

    #[test]
    fn test_protected_steady_state_writes_nothing() {
        let mut doc = Document::parse_html("<div class=\"stat\">Energy</div>");
        let original = doc.children(doc.body())[0];
        let mut state = EngineState::new();
        let rule = ScopedRule::new(Selector::parse("div.stat").unwrap(), Replacement::literal("能量"))
            .reusable()
            .protected();

        // 首次替换返回空内容，第二轮刷新替身后缓存原节点内容
        let rules = ScopedApplier::apply(&mut doc, &mut state, vec![Arc::new(rule)]);
        let rules = ScopedApplier::apply(&mut doc, &mut state, rules);
        assert_eq!(state.cache.get("div.stat", 0), Some("Energy"));
        assert_eq!(state.cache.get("div.stat", 1), None);

        let before = state.stats;
        let rules = ScopedApplier::apply(&mut doc, &mut state, rules);
        ScopedApplier::apply(&mut doc, &mut state, rules);
        assert_eq!(state.stats, before);
        assert_eq!(doc.inner_html(original), "Energy");
        assert_eq!(state.mirrors.len(), 1);
    }

    #[test]
    fn test_excluded_targets_are_skipped() {
        let mut doc = Document::parse_html("<div class=\"ace_editor\"><div class=\"title\">Title</div></div>");
        let editor = doc.children(doc.body())[0];
        let mut state = EngineState::new();
        state.flags.insert(editor, NodeFlag::STOP_SEARCH);

        let rules = ScopedApplier::apply(&mut doc, &mut state, vec![Arc::new(title_rule())]);
        assert_eq!(rules.len(), 1);
        assert_eq!(doc.inner_html(editor), "<div class=\"title\">Title</div>");
        assert!(state.cache.is_empty());
    }
}
