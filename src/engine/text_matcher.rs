//! 文本规则匹配
//! 收集子树中的待翻译文本节点，逐个寻找第一条匹配的文本规则

use std::sync::Arc;
use tracing::{trace, warn};

use super::flags::{NodeFlag, NodeFlags};
use super::state::EngineState;
use super::substitute::{Substitution, TextOutcome};
use crate::compiler::UnscopedRule;
use crate::dom::{Document, NodeId, NodeKind};
use crate::utils::TextUtils;

/// 文本匹配器
pub struct TextMatcher;

impl TextMatcher {
    /// 收集 root 下所有包含内容的文本节点
    ///
    /// 跳过被禁止翻译的子树、script 元素以及只包含换行/空格的文本；root 本身是文本节点时直接返回。
    pub fn collect_leaves(doc: &Document, flags: &NodeFlags, root: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        match doc.kind(root) {
            NodeKind::Text(_) => leaves.push(root),
            NodeKind::Element(_) => Self::collect_into(doc, flags, root, &mut leaves),
            _ => {}
        }
        leaves
    }

    fn collect_into(doc: &Document, flags: &NodeFlags, element: NodeId, leaves: &mut Vec<NodeId>) {
        if flags.has(element, NodeFlag::STOP_SEARCH) {
            return;
        }
        for &child in doc.children(element) {
            match doc.kind(child) {
                NodeKind::Text(_) => {
                    let blank = doc
                        .whole_text(child)
                        .map(|text| TextUtils::is_blank(&text))
                        .unwrap_or(true);
                    if !blank {
                        leaves.push(child);
                    }
                }
                NodeKind::Element(data) if data.name != "script" => {
                    Self::collect_into(doc, flags, child, leaves);
                }
                _ => {}
            }
        }
    }

    /// 第一条匹配修剪后文本的规则下标
    pub fn find_rule(rules: &[Arc<UnscopedRule>], text: &str) -> Option<usize> {
        let target = TextUtils::trim(text);
        rules.iter().position(|rule| rule.source.is_match(target))
    }

    /// 翻译 root 下的文本，返回剩余的文本规则
    pub fn apply(
        doc: &mut Document,
        state: &mut EngineState,
        root: NodeId,
        mut rules: Vec<Arc<UnscopedRule>>,
        warn_unmatched: bool,
    ) -> Vec<Arc<UnscopedRule>> {
        if state.flags.is_excluded(doc, root) {
            return rules;
        }

        // 先取快照，替换过程中新建的文本节点不会在本轮再次处理
        let leaves = Self::collect_leaves(doc, &state.flags, root);
        for leaf in leaves {
            // 可能已在前面的替换中被移出文档
            if doc.parent_element(leaf).is_none() {
                continue;
            }
            let Some(whole_text) = doc.whole_text(leaf) else {
                continue;
            };

            let Some(index) = Self::find_rule(&rules, &whole_text) else {
                if warn_unmatched {
                    warn!("文本 {:?} 未翻译", TextUtils::preview(&whole_text, 80));
                } else {
                    trace!("文本 {:?} 未翻译", TextUtils::preview(&whole_text, 80));
                }
                continue;
            };

            let rule = Arc::clone(&rules[index]);
            let outcome = Substitution::substitute_text(doc, state, leaf, &rule, &whole_text);
            if outcome != TextOutcome::Failed && !rule.reuse {
                rules.remove(index);
            }
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Replacement, SourcePattern};
    use regex::Regex;

    #[test]
    fn test_collect_skips_blank_script_and_stopped() {
        let mut doc = Document::parse_html(
            "<div>\n  <span>Overview</span>\n  <script>var a = 1;</script><p class=\"code\"><b>x</b></p>\ttab</div>",
        );
        let body = doc.body();
        let div = doc.children(body)[0];
        let code = doc
            .descendants(div)
            .into_iter()
            .find(|&id| doc.has_class(id, "code"))
            .unwrap();

        let mut flags = NodeFlags::new();
        let texts: Vec<_> = TextMatcher::collect_leaves(&doc, &flags, div)
            .into_iter()
            .map(|id| doc.text(id).unwrap().to_string())
            .collect();
        assert_eq!(texts, vec!["Overview", "x", "\ttab"]);

        flags.insert(code, NodeFlag::STOP_SEARCH);
        assert_eq!(TextMatcher::collect_leaves(&doc, &flags, div).len(), 2);

        let leaf = doc.create_text("  ");
        doc.append_child(body, leaf);
        assert_eq!(TextMatcher::collect_leaves(&doc, &flags, leaf), vec![leaf]);
    }

    #[test]
    fn test_first_match_wins_and_consumes() {
        let mut doc = Document::parse_html("<p>Overview</p><p>Overview</p><p> 12 rooms </p>");
        let body = doc.body();
        let mut state = EngineState::new();
        let rules = vec![
            Arc::new(UnscopedRule::exact("Overview", "总览")),
            Arc::new(UnscopedRule::new(
                SourcePattern::Regex(Regex::new(r"\d+ rooms").unwrap()),
                Replacement::text_fn(|text| Some(text.replacen("rooms", "个房间", 1))),
            )),
        ];

        let remaining = TextMatcher::apply(&mut doc, &mut state, body, rules, false);
        assert!(remaining.is_empty());
        assert_eq!(doc.inner_html(body), "<p>总览</p><p>Overview</p><p> 12 个房间 </p>");
        assert_eq!(state.stats.substitutions, 2);
    }

    #[test]
    fn test_reusable_rule_survives() {
        let mut doc = Document::parse_html("<p>OK</p><p>OK</p>");
        let body = doc.body();
        let mut state = EngineState::new();
        let rules = vec![Arc::new(UnscopedRule::exact("OK", "确定").reusable())];

        let remaining = TextMatcher::apply(&mut doc, &mut state, body, rules, false);
        assert_eq!(remaining.len(), 1);
        assert_eq!(doc.inner_html(body), "<p>确定</p><p>确定</p>");
    }

    #[test]
    fn test_excluded_root_returns_rules_unchanged() {
        let mut doc = Document::parse_html("<div><p>OK</p></div>");
        let body = doc.body();
        let div = doc.children(body)[0];
        let p = doc.children(div)[0];
        let mut state = EngineState::new();
        state.flags.insert(div, NodeFlag::STOP_SEARCH);

        let rules = vec![Arc::new(UnscopedRule::exact("OK", "确定"))];
        let remaining = TextMatcher::apply(&mut doc, &mut state, p, rules, true);
        assert_eq!(remaining.len(), 1);
        assert_eq!(doc.inner_html(p), "OK");
    }
}
