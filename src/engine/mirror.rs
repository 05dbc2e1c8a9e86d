//! 受保护节点与其替身的对应关系
//! 同时负责 class 监听：原节点的 class 变化会同步到当前替身上

use std::collections::HashMap;

use crate::dom::{Document, MutationRecord, NodeId};

#[derive(Debug, Clone, Default)]
pub struct MirrorTable {
    mirrors: HashMap<NodeId, NodeId>,
}

impl MirrorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 原节点当前的替身
    pub fn get(&self, original: NodeId) -> Option<NodeId> {
        self.mirrors.get(&original).copied()
    }

    /// 登记新替身，返回被替换的旧替身
    pub fn set(&mut self, original: NodeId, mirror: NodeId) -> Option<NodeId> {
        self.mirrors.insert(original, mirror)
    }

    pub fn is_watched(&self, original: NodeId) -> bool {
        self.mirrors.contains_key(&original)
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// 移除原节点已不在文档中的条目
    pub fn prune(&mut self, doc: &Document) -> usize {
        let before = self.mirrors.len();
        self.mirrors.retain(|&original, _| doc.is_connected(original));
        before - self.mirrors.len()
    }

    /// 处理 class 属性变更记录，返回同步的替身数量
    pub fn sync_classes(&self, doc: &mut Document, records: &[MutationRecord]) -> usize {
        if self.mirrors.is_empty() {
            return 0;
        }
        let mut synced = 0;
        for record in records.iter().filter(|record| record.is_attribute("class")) {
            let Some(mirror) = self.get(record.target) else {
                continue;
            };
            let class_name = doc.class_name(record.target).to_string();
            if doc.class_name(mirror) != class_name {
                doc.set_class_name(mirror, &class_name);
                synced += 1;
            }
        }
        synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_change_copied_to_mirror() {
        let mut doc = Document::parse_html("<div class=\"stat\">Energy</div>");
        let body = doc.body();
        let original = doc.children(body)[0];
        let mirror = doc.deep_clone(original);
        doc.append_child(body, mirror);

        let mut table = MirrorTable::new();
        assert_eq!(table.set(original, mirror), None);
        doc.take_records();

        doc.set_class_name(original, "stat fade-in");
        let records = doc.take_records();
        assert_eq!(table.sync_classes(&mut doc, &records), 1);
        assert_eq!(doc.class_name(mirror), "stat fade-in");

        // 替身自身的 class 变化不会反向同步
        let records = doc.take_records();
        assert_eq!(table.sync_classes(&mut doc, &records), 0);
    }

    #[test]
    fn test_prune_detached_originals() {
        let mut doc = Document::parse_html("<div>a</div>");
        let body = doc.body();
        let original = doc.children(body)[0];
        let mirror = doc.deep_clone(original);

        let mut table = MirrorTable::new();
        table.set(original, mirror);
        assert_eq!(table.prune(&doc), 0);

        doc.remove_child(body, original);
        assert_eq!(table.prune(&doc), 1);
        assert!(!table.is_watched(original));
    }
}
