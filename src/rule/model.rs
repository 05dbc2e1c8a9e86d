//! 词典数据模型定义
//! 仅存储词典文件中的原始条目，无任何业务逻辑，支持序列化/反序列化

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 单个翻译条目（原始格式）
///
/// 语种键（如 `en-US`、`zh-CN`）与其值统一收集在 `languages` 中，由编译阶段根据配置选择。
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RawEntry {
    /// 存在时该条目为选择器条目
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reuse: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub protect: bool,
    // 兼容：原词典中的拼写 ingnoreRepeatedCheck
    #[serde(
        rename = "ignoreRepeatedCheck",
        alias = "ingnoreRepeatedCheck",
        default,
        skip_serializing_if = "is_false"
    )]
    pub ignore_repeated_check: bool,
    #[serde(flatten)]
    pub languages: BTreeMap<String, Value>,
}

impl RawEntry {
    /// 获取指定语种的值
    pub fn language(&self, lang: &str) -> Option<&Value> {
        self.languages.get(lang)
    }
}

/// 一组翻译条目及其生效路由（原始格式）
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RawRuleSet {
    // 兼容：原词典中的字段名 hashs
    #[serde(rename = "hashs", alias = "routes")]
    pub route_patterns: Vec<String>,
    #[serde(default)]
    pub content: Vec<RawEntry>,
}

/// 完整词典文件
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct DictionaryFile {
    pub rule_sets: Vec<RawRuleSet>,
}

impl DictionaryFile {
    /// 条目总数
    pub fn entry_count(&self) -> usize {
        self.rule_sets.iter().map(|set| set.content.len()).sum()
    }
}

/// 源语种值：字符串为精确匹配，对象为正则
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceValue {
    Exact(String),
    Regex {
        regex: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        flags: String,
    },
}

/// 目标语种值：字符串直接替换，对象为内置动作
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum TargetValue {
    Text(String),
    Action(TargetAction),
}

/// 内置替换动作
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum TargetAction {
    /// 依次替换首次出现的片段
    Replace(Vec<(String, String)>),
    /// 按修剪后的内容查表
    Multiple(BTreeMap<String, String>),
    /// 禁止翻译该元素及其子树
    StopSearch(bool),
    /// 延迟后禁止翻译第一个匹配元素
    #[serde(rename_all = "camelCase")]
    DeferStopSearch { selector: String, delay_ms: u64 },
    /// 写入属性
    SetAttribute(BTreeMap<String, String>),
    /// class 名称片段替换
    ReplaceClass((String, String)),
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_entry_shapes() {
        let json = r##"[
            { "hashs": ["#!/overview"], "content": [
                { "en-US": "Overview", "zh-CN": "总览", "reuse": true },
                { "selector": ".objective a", "zh-CN": { "multiple": { "a": "b" } }, "ingnoreRepeatedCheck": true }
            ] }
        ]"##;
        let file: DictionaryFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.rule_sets.len(), 1);
        assert_eq!(file.entry_count(), 2);

        let first = &file.rule_sets[0].content[0];
        assert!(first.reuse);
        assert_eq!(first.language("en-US"), Some(&Value::String("Overview".into())));
        assert!(!first.languages.contains_key("reuse"));

        let second = &file.rule_sets[0].content[1];
        assert_eq!(second.selector.as_deref(), Some(".objective a"));
        assert!(second.ignore_repeated_check);
    }

    #[test]
    fn test_source_and_target_values() {
        let exact: SourceValue = serde_json::from_str(r#""Overview""#).unwrap();
        assert_eq!(exact, SourceValue::Exact("Overview".into()));
        let regex: SourceValue = serde_json::from_str(r#"{ "regex": "\\d+ rooms", "flags": "i" }"#).unwrap();
        assert_eq!(regex, SourceValue::Regex { regex: "\\d+ rooms".into(), flags: "i".into() });

        let text: TargetValue = serde_json::from_str(r#""总览""#).unwrap();
        assert_eq!(text, TargetValue::Text("总览".into()));
        let replace: TargetValue = serde_json::from_str(r#"{ "replace": [["rooms", "个房间"]] }"#).unwrap();
        assert_eq!(
            replace,
            TargetValue::Action(TargetAction::Replace(vec![("rooms".into(), "个房间".into())]))
        );
        let defer: TargetValue =
            serde_json::from_str(r#"{ "deferStopSearch": { "selector": "app-time-left", "delayMs": 1000 } }"#).unwrap();
        assert_eq!(
            defer,
            TargetValue::Action(TargetAction::DeferStopSearch { selector: "app-time-left".into(), delay_ms: 1000 })
        );
        let class: TargetValue = serde_json::from_str(r#"{ "replaceClass": ["fa-gear", "fa-cog"] }"#).unwrap();
        assert_eq!(
            class,
            TargetValue::Action(TargetAction::ReplaceClass(("fa-gear".into(), "fa-cog".into())))
        );
    }
}
