//! 内置替换动作
//! 把词典中的对象型目标值转换为计算型替换函数

use std::collections::BTreeMap;
use std::time::Duration;

use super::pattern::{ElementFn, Replacement, TextFn};
use crate::dom::Selector;
use crate::utils::TextUtils;

/// 依次替换首次出现的片段
fn apply_chain(pairs: &[(String, String)], text: &str) -> String {
    pairs
        .iter()
        .fold(text.to_string(), |acc, (from, to)| TextUtils::replace_first(&acc, from, to))
}

/// 文本版链式替换
pub fn replace_chain_text(pairs: Vec<(String, String)>) -> Replacement<TextFn> {
    Replacement::text_fn(move |text| Some(apply_chain(&pairs, text)))
}

/// 元素版链式替换，作用于 inner HTML
pub fn replace_chain_element(pairs: Vec<(String, String)>) -> Replacement<ElementFn> {
    Replacement::element_fn(move |ctx| {
        let current = ctx.inner_html();
        let replaced = apply_chain(&pairs, &current);
        if replaced != current {
            ctx.set_inner_html(&replaced);
        }
    })
}

/// 文本版多行翻译：按修剪后的文本查表，未命中时不修改
pub fn translate_multiple_text(contents: BTreeMap<String, String>) -> Replacement<TextFn> {
    Replacement::text_fn(move |text| contents.get(TextUtils::trim(text)).cloned())
}

/// 多行翻译：按修剪后的 inner HTML 查表，未命中时不修改
pub fn translate_multiple(contents: BTreeMap<String, String>) -> Replacement<ElementFn> {
    Replacement::element_fn(move |ctx| {
        let current = ctx.inner_html();
        if let Some(new_content) = contents.get(TextUtils::trim(&current)) {
            ctx.set_inner_html(new_content);
        }
    })
}

/// 禁止翻译选中元素及其子树
pub fn stop_search() -> Replacement<ElementFn> {
    Replacement::element_fn(|ctx| ctx.stop_search())
}

/// 延迟后禁止翻译 locator 的第一个匹配元素（元素可能在延迟期间被重建）
pub fn defer_stop_search(locator: Selector, delay: Duration) -> Replacement<ElementFn> {
    Replacement::element_fn(move |ctx| ctx.defer_stop_search(locator.clone(), delay))
}

/// 写入属性
pub fn set_attributes(attributes: BTreeMap<String, String>) -> Replacement<ElementFn> {
    Replacement::element_fn(move |ctx| {
        for (name, value) in &attributes {
            if ctx.attribute(name) != Some(value.as_str()) {
                ctx.set_attribute(name, value);
            }
        }
    })
}

/// 替换 class 名称中首次出现的片段
pub fn replace_class(old_class: String, new_class: String) -> Replacement<ElementFn> {
    Replacement::element_fn(move |ctx| {
        let current = ctx.class_name().to_string();
        let replaced = TextUtils::replace_first(&current, &old_class, &new_class);
        if replaced != current {
            ctx.set_class_name(&replaced);
        }
    })
}
