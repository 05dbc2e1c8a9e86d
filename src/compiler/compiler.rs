//! 词典编译器核心
//! 负责将原始词典条目编译为可执行的规则：源模式、选择器与替换内容

use std::time::{Duration, Instant};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use super::actions;
use super::pattern::{
    DictionaryStore, ElementFn, Replacement, Rule, RuleSet, ScopedRule, SourcePattern, TextFn, UnscopedRule,
};
use crate::config::GlobalConfig;
use crate::dom::Selector;
use crate::error::{LocResult, LocalizerError};
use crate::rule::{DictionaryFile, RawEntry, SourceValue, TargetAction, TargetValue};

/// 词典编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译整个词典
    pub fn compile(dictionary: &DictionaryFile, config: &GlobalConfig) -> LocResult<DictionaryStore> {
        let start = Instant::now();
        let mut stats = CompileStats::default();
        let mut rule_sets = Vec::with_capacity(dictionary.rule_sets.len());

        for (set_index, raw_set) in dictionary.rule_sets.iter().enumerate() {
            let mut rule_set = RuleSet::new(raw_set.route_patterns.iter().cloned());
            for (entry_index, entry) in raw_set.content.iter().enumerate() {
                let location = format!("第{}组第{}条", set_index + 1, entry_index + 1);
                if let Some(rule) = Self::compile_entry(entry, config, &location, &mut stats)? {
                    rule_set.rules.push(rule);
                }
            }
            rule_sets.push(rule_set);
        }

        debug!("✅ 词典编译完成，总耗时{:?}", start.elapsed());
        debug!(
            "📊 编译统计：文本规则{}条（正则{}条）、选择器规则{}条（受保护{}条）、跳过{}条",
            stats.unscoped_count, stats.regex_count, stats.scoped_count, stats.protected_count, stats.skipped_count
        );

        Ok(DictionaryStore::new(rule_sets))
    }

    /// 编译单个条目，缺少目标语种等不完整条目返回 None
    fn compile_entry(
        entry: &RawEntry,
        config: &GlobalConfig,
        location: &str,
        stats: &mut CompileStats,
    ) -> LocResult<Option<Rule>> {
        let Some(target) = entry.language(&config.translate_to) else {
            warn!("{}缺少目标语种 {}，已跳过", location, config.translate_to);
            stats.skipped_count += 1;
            return Ok(None);
        };
        let target = Self::parse_target(target, location)?;

        if let Some(raw_selector) = &entry.selector {
            let locator = Selector::parse(raw_selector)?;
            let mut rule = ScopedRule::new(locator, Self::element_replacement(target, location)?);
            rule.reuse = entry.reuse;
            rule.protect = entry.protect;
            rule.skip_repeat_check = entry.ignore_repeated_check;

            stats.scoped_count += 1;
            if rule.protect {
                stats.protected_count += 1;
            }
            return Ok(Some(rule.into()));
        }

        let Some(source) = entry.language(&config.translate_from) else {
            warn!("{}既没有选择器也缺少源语种 {}，已跳过", location, config.translate_from);
            stats.skipped_count += 1;
            return Ok(None);
        };
        let source = Self::compile_source(source, location, stats)?;
        let mut rule = UnscopedRule::new(source, Self::text_replacement(target, location)?);
        rule.reuse = entry.reuse;

        stats.unscoped_count += 1;
        Ok(Some(rule.into()))
    }

    /// 编译源语种模式
    fn compile_source(value: &Value, location: &str, stats: &mut CompileStats) -> LocResult<SourcePattern> {
        let source: SourceValue = serde_json::from_value(value.clone())
            .map_err(|e| LocalizerError::RuleParseError(format!("{}源语种格式不支持：{}", location, e)))?;

        match source {
            SourceValue::Exact(text) => Ok(SourcePattern::Exact(text)),
            SourceValue::Regex { regex, flags } => {
                let (regex, flags) = Self::split_regex_literal(&regex, &flags);
                let mut builder = RegexBuilder::new(regex);
                for flag in flags.chars() {
                    match flag {
                        'i' => builder.case_insensitive(true),
                        'm' => builder.multi_line(true),
                        's' => builder.dot_matches_new_line(true),
                        'x' => builder.ignore_whitespace(true),
                        // 全局、粘连与 unicode 标志对单次搜索没有影响
                        'g' | 'y' | 'u' => &mut builder,
                        other => {
                            return Err(LocalizerError::RuleParseError(format!(
                                "{}正则标志 {} 不支持",
                                location, other
                            )))
                        }
                    };
                }
                stats.regex_count += 1;
                Ok(SourcePattern::Regex(builder.build()?))
            }
        }
    }

    /// 兼容 `/pattern/flags` 形式的正则字面量（仅在未单独指定 flags 时生效）
    fn split_regex_literal<'a>(regex: &'a str, flags: &'a str) -> (&'a str, &'a str) {
        static REGEX_LITERAL: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^/(?s)(.+)/([gimsuxy]*)$").unwrap()
        });

        if !flags.is_empty() {
            return (regex, flags);
        }
        match REGEX_LITERAL.captures(regex) {
            Some(caps) => match (caps.get(1), caps.get(2)) {
                (Some(pattern), Some(literal_flags)) => (pattern.as_str(), literal_flags.as_str()),
                _ => (regex, flags),
            },
            None => (regex, flags),
        }
    }

    fn parse_target(value: &Value, location: &str) -> LocResult<TargetValue> {
        serde_json::from_value(value.clone())
            .map_err(|e| LocalizerError::RuleParseError(format!("{}目标语种格式不支持：{}", location, e)))
    }

    /// 文本规则的替换内容
    fn text_replacement(target: TargetValue, location: &str) -> LocResult<Replacement<TextFn>> {
        match target {
            TargetValue::Text(text) => Ok(Replacement::Literal(text)),
            TargetValue::Action(TargetAction::Replace(pairs)) => Ok(actions::replace_chain_text(pairs)),
            TargetValue::Action(TargetAction::Multiple(contents)) => Ok(actions::translate_multiple_text(contents)),
            TargetValue::Action(_) => Err(LocalizerError::RuleParseError(format!(
                "{}的动作只能用于选择器条目",
                location
            ))),
        }
    }

    /// 选择器规则的替换内容
    fn element_replacement(target: TargetValue, location: &str) -> LocResult<Replacement<ElementFn>> {
        let action = match target {
            TargetValue::Text(text) => return Ok(Replacement::Literal(text)),
            TargetValue::Action(action) => action,
        };

        Ok(match action {
            TargetAction::Replace(pairs) => actions::replace_chain_element(pairs),
            TargetAction::Multiple(contents) => actions::translate_multiple(contents),
            TargetAction::StopSearch(true) => actions::stop_search(),
            TargetAction::StopSearch(false) => {
                return Err(LocalizerError::RuleParseError(format!("{}的 stopSearch 只能为 true", location)))
            }
            TargetAction::DeferStopSearch { selector, delay_ms } => {
                actions::defer_stop_search(Selector::parse(&selector)?, Duration::from_millis(delay_ms))
            }
            TargetAction::SetAttribute(attributes) => actions::set_attributes(attributes),
            TargetAction::ReplaceClass((old_class, new_class)) => actions::replace_class(old_class, new_class),
        })
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    unscoped_count: usize,
    regex_count: usize,
    scoped_count: usize,
    protected_count: usize,
    skipped_count: usize,
}
