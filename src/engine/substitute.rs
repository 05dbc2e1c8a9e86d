//! 替换执行
//! 普通替换直接修改目标；受保护替换隐藏原节点，改为翻译并展示一个替身节点

use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, trace, warn};

use super::context::ElementContext;
use super::flags::NodeFlag;
use super::state::EngineState;
use crate::compiler::{ElementFn, Replacement, UnscopedRule};
use crate::dom::{Document, NodeId};

/// 文本替换结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOutcome {
    /// 叶子节点已被新文本节点替换
    Replaced,
    /// 规则命中但计算函数选择不修改
    Unchanged,
    /// 计算函数执行失败，视为规则未生效
    Failed,
}

/// 替换引擎
pub struct Substitution;

impl Substitution {
    /// 用替换结果生成新文本节点并替换叶子节点
    pub fn substitute_text(
        doc: &mut Document,
        state: &mut EngineState,
        leaf: NodeId,
        rule: &UnscopedRule,
        whole_text: &str,
    ) -> TextOutcome {
        let new_text = match &rule.replacement {
            Replacement::Literal(text) => text.clone(),
            Replacement::Computed(f) => match catch_unwind(AssertUnwindSafe(|| f(whole_text))) {
                Ok(Some(text)) => text,
                Ok(None) => return TextOutcome::Unchanged,
                Err(_) => {
                    error!("文本规则 {:?} 的替换函数执行失败", rule.source.describe());
                    return TextOutcome::Failed;
                }
            },
        };

        let Some(parent) = doc.parent_element(leaf) else {
            return TextOutcome::Unchanged;
        };
        let replacement = doc.create_text(new_text);
        doc.replace_child(parent, replacement, leaf);
        state.stats.substitutions += 1;
        TextOutcome::Replaced
    }

    /// 普通替换，返回替换后的 inner HTML；替换函数执行失败时返回 None
    pub fn substitute_element(
        doc: &mut Document,
        state: &mut EngineState,
        element: NodeId,
        replacement: &Replacement<ElementFn>,
    ) -> Option<String> {
        match replacement {
            Replacement::Literal(html) => doc.set_inner_html(element, html),
            Replacement::Computed(f) => {
                let result = {
                    let mut ctx = ElementContext::new(doc, element, &mut state.flags, &mut state.scheduler);
                    catch_unwind(AssertUnwindSafe(|| f(&mut ctx)))
                };
                if result.is_err() {
                    error!("元素 {} 的替换函数执行失败", element);
                    return None;
                }
            }
        }
        state.stats.substitutions += 1;
        Some(doc.inner_html(element))
    }

    /// 受保护替换
    ///
    /// 替身节点本身返回空字符串且不做任何修改；原节点首次替换同样返回空字符串，
    /// 使下一轮缓存比较必定失败并再刷新一次替身，之后返回原节点的内容。
    pub fn substitute_protected(
        doc: &mut Document,
        state: &mut EngineState,
        original: NodeId,
        replacement: &Replacement<ElementFn>,
    ) -> Option<String> {
        if state.flags.is_mirror(original) {
            return Some(String::new());
        }
        let Some(parent) = doc.parent_element(original) else {
            warn!("受保护元素 {} 没有父元素，无法创建替身", original);
            return Some(doc.inner_html(original));
        };

        let mirror = doc.deep_clone(original);
        doc.set_style_property(mirror, "display", None);
        state.flags.insert(mirror, NodeFlag::IS_MIRROR);
        Self::substitute_element(doc, state, mirror, replacement)?;

        doc.set_style_property(original, "display", Some("none"));
        let previous = state.mirrors.get(original);
        match previous {
            Some(old) if doc.parent(old) == Some(parent) => {
                doc.replace_child(parent, mirror, old);
            }
            Some(old) => {
                // 原节点被移动到其他父元素下，旧替身必须摘除
                if let Some(old_parent) = doc.parent(old) {
                    doc.remove_child(old_parent, old);
                }
                doc.append_child(parent, mirror);
            }
            None => doc.append_child(parent, mirror),
        }
        state.mirrors.set(original, mirror);
        trace!("受保护元素 {} 的替身已更新为 {}", original, mirror);

        if previous.is_none() {
            Some(String::new())
        } else {
            Some(doc.inner_html(original))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(html: &str) -> (Document, EngineState, NodeId) {
        let doc = Document::parse_html(html);
        let element = doc.children(doc.body())[0];
        (doc, EngineState::new(), element)
    }

    #[test]
    fn test_text_literal_replaces_leaf() {
        let (mut doc, mut state, element) = setup("<span>Overview</span>");
        let leaf = doc.children(element)[0];
        let rule = UnscopedRule::exact("Overview", "总览");

        assert_eq!(Substitution::substitute_text(&mut doc, &mut state, leaf, &rule, "Overview"), TextOutcome::Replaced);
        assert_eq!(doc.inner_html(element), "总览");
        assert_eq!(doc.parent(leaf), None);
        assert_eq!(state.stats.substitutions, 1);
    }

    #[test]
    fn test_text_computed_none_and_panic() {
        let (mut doc, mut state, element) = setup("<span>12 rooms</span>");
        let leaf = doc.children(element)[0];

        let keep = UnscopedRule::new(
            crate::compiler::SourcePattern::Exact("12 rooms".into()),
            Replacement::text_fn(|_| None),
        );
        assert_eq!(Substitution::substitute_text(&mut doc, &mut state, leaf, &keep, "12 rooms"), TextOutcome::Unchanged);

        let broken = UnscopedRule::new(
            crate::compiler::SourcePattern::Exact("12 rooms".into()),
            Replacement::text_fn(|_| panic!("broken rule")),
        );
        assert_eq!(Substitution::substitute_text(&mut doc, &mut state, leaf, &broken, "12 rooms"), TextOutcome::Failed);
        assert_eq!(doc.inner_html(element), "12 rooms");
        assert_eq!(state.stats.substitutions, 0);
    }

    #[test]
    fn test_element_literal_parses_html() {
        let (mut doc, mut state, element) = setup("<div class=\"title\">Title</div>");
        let content = Substitution::substitute_element(&mut doc, &mut state, element, &Replacement::literal("<b>标题</b>"));
        assert_eq!(content.as_deref(), Some("<b>标题</b>"));
        assert!(doc.is_element(doc.children(element)[0]));
    }

    #[test]
    fn test_protected_keeps_single_mirror() {
        let (mut doc, mut state, original) = setup("<div class=\"stat\">Energy</div>");
        let body = doc.body();
        let replacement = Replacement::literal("能量");

        let first = Substitution::substitute_protected(&mut doc, &mut state, original, &replacement);
        assert_eq!(first.as_deref(), Some(""));
        assert_eq!(doc.style_property(original, "display").as_deref(), Some("none"));
        assert_eq!(doc.inner_html(original), "Energy");

        let mirror = state.mirrors.get(original).unwrap();
        assert!(state.flags.is_mirror(mirror));
        assert_eq!(doc.style_property(mirror, "display"), None);
        assert_eq!(doc.inner_html(mirror), "能量");

        let second = Substitution::substitute_protected(&mut doc, &mut state, original, &replacement);
        assert_eq!(second.as_deref(), Some("Energy"));
        assert_eq!(doc.children(body).len(), 2);
        assert_ne!(state.mirrors.get(original), Some(mirror));

        // 替身本身不会被再次处理
        let current = state.mirrors.get(original).unwrap();
        assert_eq!(Substitution::substitute_protected(&mut doc, &mut state, current, &replacement).as_deref(), Some(""));
        assert_eq!(doc.children(body).len(), 2);
    }

    #[test]
    fn test_protected_original_moved_to_other_parent() {
        let (mut doc, mut state, _) = setup("<div id=\"a\"><span class=\"e\">Energy</span></div><div id=\"b\"></div>");
        let body = doc.body();
        let (a, b) = (doc.children(body)[0], doc.children(body)[1]);
        let original = doc.children(a)[0];
        let replacement = Replacement::literal("能量");

        Substitution::substitute_protected(&mut doc, &mut state, original, &replacement);
        let old_mirror = state.mirrors.get(original).unwrap();
        assert_eq!(doc.parent(old_mirror), Some(a));

        doc.append_child(b, original);
        Substitution::substitute_protected(&mut doc, &mut state, original, &replacement);
        let new_mirror = state.mirrors.get(original).unwrap();
        assert_eq!(doc.parent(old_mirror), None);
        assert_eq!(doc.parent(new_mirror), Some(b));
        assert!(doc.children(a).is_empty());

        let connected = doc
            .descendants(body)
            .into_iter()
            .filter(|&id| state.flags.is_mirror(id) && doc.is_connected(id))
            .count();
        assert_eq!(connected, 1);
    }

    #[test]
    fn test_protected_without_parent() {
        let mut doc = Document::new();
        let mut state = EngineState::new();
        let detached = doc.create_element("div");
        let text = doc.create_text("Energy");
        doc.append_child(detached, text);

        let content = Substitution::substitute_protected(&mut doc, &mut state, detached, &Replacement::literal("能量"));
        assert_eq!(content.as_deref(), Some("Energy"));
        assert!(state.mirrors.is_empty());
    }
}
