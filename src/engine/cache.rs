//! 选择器规则的内容缓存
//! 以 (选择器, 匹配序号) 为键记录上次替换后的内容，内容未变化时跳过替换

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MatchCache {
    entries: HashMap<(String, usize), String>,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, locator: &str, index: usize) -> Option<&str> {
        // 借用形式的元组键无法直接查询，这里构造一次键
        self.entries
            .get(&(locator.to_string(), index))
            .map(String::as_str)
    }

    /// 缓存内容与当前内容一致
    pub fn is_fresh(&self, locator: &str, index: usize, current: &str) -> bool {
        self.get(locator, index) == Some(current)
    }

    pub fn insert(&mut self, locator: &str, index: usize, content: String) {
        self.entries.insert((locator.to_string(), index), content);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
