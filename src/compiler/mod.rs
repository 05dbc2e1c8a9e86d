//! 编译模块：将原始词典条目编译为可执行的规则
pub mod actions;
pub mod pattern;
pub mod compiler;

pub use self::pattern::{
    DictionaryStore, ElementFn, Replacement, Rule, RuleSet, ScopedRule, SourcePattern, TextFn, UnscopedRule,
};
pub use self::compiler::RuleCompiler;
