//! 编译后规则模型
//! 源模式、替换内容以及按路由分组的规则集合

use std::fmt;
use std::sync::Arc;
use regex::Regex;

use crate::dom::Selector;
use crate::engine::ElementContext;

/// 文本替换函数：输入叶子节点的完整文本，返回 None 表示不修改
pub type TextFn = dyn Fn(&str) -> Option<String> + Send + Sync;
/// 元素替换函数：通过上下文直接操作目标元素
pub type ElementFn = dyn Fn(&mut ElementContext<'_>) + Send + Sync;

/// 源文本匹配模式
#[derive(Debug, Clone)]
pub enum SourcePattern {
    Exact(String), // 与修剪后的文本完全相等
    Regex(Regex),  // 正则搜索
}

impl SourcePattern {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            SourcePattern::Exact(s) => s == text,
            SourcePattern::Regex(regex) => regex.is_match(text),
        }
    }

    /// 规则描述
    pub fn describe(&self) -> &str {
        match self {
            SourcePattern::Exact(s) => s,
            SourcePattern::Regex(r) => r.as_str(),
        }
    }
}

/// 替换内容：字面量或计算函数，二者只能取其一
pub enum Replacement<F: ?Sized> {
    Literal(String),
    Computed(Arc<F>),
}

impl<F: ?Sized> Clone for Replacement<F> {
    fn clone(&self) -> Self {
        match self {
            Replacement::Literal(s) => Replacement::Literal(s.clone()),
            Replacement::Computed(f) => Replacement::Computed(Arc::clone(f)),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Replacement<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Replacement::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<F: ?Sized> Replacement<F> {
    pub fn literal(text: impl Into<String>) -> Self {
        Replacement::Literal(text.into())
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Replacement::Computed(_))
    }
}

impl Replacement<TextFn> {
    pub fn text_fn(f: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Replacement::Computed(Arc::new(f))
    }
}

impl Replacement<ElementFn> {
    pub fn element_fn(f: impl Fn(&mut ElementContext<'_>) + Send + Sync + 'static) -> Self {
        Replacement::Computed(Arc::new(f))
    }
}

/// 无选择器规则：匹配叶子文本
#[derive(Debug, Clone)]
pub struct UnscopedRule {
    pub source: SourcePattern,
    pub replacement: Replacement<TextFn>,
    /// 为 false 时首次替换成功后即从当前路由的规则中移除
    pub reuse: bool,
}

impl UnscopedRule {
    pub fn new(source: SourcePattern, replacement: Replacement<TextFn>) -> Self {
        Self {
            source,
            replacement,
            reuse: false,
        }
    }

    /// 精确匹配的字面量规则
    pub fn exact(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(SourcePattern::Exact(source.into()), Replacement::literal(target))
    }

    pub fn reusable(mut self) -> Self {
        self.reuse = true;
        self
    }
}

/// 选择器规则：作用于选中的元素
#[derive(Debug, Clone)]
pub struct ScopedRule {
    pub locator: Selector,
    pub replacement: Replacement<ElementFn>,
    pub reuse: bool,
    /// 以替身节点代替原地修改
    pub protect: bool,
    /// 跳过缓存检查，每次都执行替换
    pub skip_repeat_check: bool,
}

impl ScopedRule {
    pub fn new(locator: Selector, replacement: Replacement<ElementFn>) -> Self {
        Self {
            locator,
            replacement,
            reuse: false,
            protect: false,
            skip_repeat_check: false,
        }
    }

    pub fn reusable(mut self) -> Self {
        self.reuse = true;
        self
    }

    pub fn protected(mut self) -> Self {
        self.protect = true;
        self
    }

    pub fn skip_repeat_check(mut self) -> Self {
        self.skip_repeat_check = true;
        self
    }
}

/// 编译后的规则
#[derive(Debug, Clone)]
pub enum Rule {
    Unscoped(Arc<UnscopedRule>),
    Scoped(Arc<ScopedRule>),
}

impl From<UnscopedRule> for Rule {
    fn from(rule: UnscopedRule) -> Self {
        Rule::Unscoped(Arc::new(rule))
    }
}

impl From<ScopedRule> for Rule {
    fn from(rule: ScopedRule) -> Self {
        Rule::Scoped(Arc::new(rule))
    }
}

/// 一组规则及其生效路由
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub route_patterns: Vec<String>,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new<S: Into<String>>(route_patterns: impl IntoIterator<Item = S>) -> Self {
        Self {
            route_patterns: route_patterns.into_iter().map(Into::into).collect(),
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: impl Into<Rule>) -> Self {
        self.rules.push(rule.into());
        self
    }
}

/// 编译后的词典
#[derive(Debug, Clone, Default)]
pub struct DictionaryStore {
    pub rule_sets: Vec<RuleSet>,
}

impl DictionaryStore {
    pub fn new(rule_sets: Vec<RuleSet>) -> Self {
        Self { rule_sets }
    }

    pub fn rule_count(&self) -> usize {
        self.rule_sets.iter().map(|set| set.rules.len()).sum()
    }
}
