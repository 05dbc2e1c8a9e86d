//! 节点标记侧表
//! 引擎私有的节点状态不写入文档树，统一按 NodeId 存放在这里

use std::collections::HashMap;
use std::ops::BitOr;

use crate::dom::{Document, NodeId};

/// 节点标记位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeFlag(u8);

impl NodeFlag {
    pub const EMPTY: NodeFlag = NodeFlag(0);
    /// 禁止翻译该节点及其子树
    pub const STOP_SEARCH: NodeFlag = NodeFlag(1);
    /// 受保护节点的替身
    pub const IS_MIRROR: NodeFlag = NodeFlag(1 << 1);

    pub fn contains(self, other: NodeFlag) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for NodeFlag {
    type Output = NodeFlag;

    fn bitor(self, rhs: NodeFlag) -> NodeFlag {
        NodeFlag(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeFlags {
    flags: HashMap<NodeId, NodeFlag>,
}

impl NodeFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> NodeFlag {
        self.flags.get(&id).copied().unwrap_or_default()
    }

    pub fn insert(&mut self, id: NodeId, flag: NodeFlag) {
        let entry = self.flags.entry(id).or_default();
        *entry = *entry | flag;
    }

    pub fn has(&self, id: NodeId, flag: NodeFlag) -> bool {
        self.flags
            .get(&id)
            .map(|current| current.contains(flag))
            .unwrap_or(false)
    }

    pub fn is_mirror(&self, id: NodeId) -> bool {
        self.has(id, NodeFlag::IS_MIRROR)
    }

    /// 节点自身或任一祖先被禁止翻译
    pub fn is_excluded(&self, doc: &Document, id: NodeId) -> bool {
        if self.flags.is_empty() {
            return false;
        }
        std::iter::once(id)
            .chain(doc.ancestors(id))
            .any(|node| self.has(node, NodeFlag::STOP_SEARCH))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_search_covers_descendants() {
        let mut doc = Document::parse_html("<div class=\"editor\"><p><span>code</span></p></div><p>free</p>");
        let body = doc.body();
        let editor = doc.children(body)[0];
        let span = doc.descendants(editor)[1];
        let free = doc.children(body)[1];

        let mut flags = NodeFlags::new();
        assert!(!flags.is_excluded(&doc, span));

        flags.insert(editor, NodeFlag::STOP_SEARCH);
        assert!(flags.is_excluded(&doc, editor));
        assert!(flags.is_excluded(&doc, span));
        assert!(!flags.is_excluded(&doc, free));

        // 节点被移出受保护子树后不再受影响
        doc.append_child(body, span);
        assert!(!flags.is_excluded(&doc, span));
    }

    #[test]
    fn test_flags_combine() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        let mut flags = NodeFlags::new();
        flags.insert(node, NodeFlag::IS_MIRROR);
        flags.insert(node, NodeFlag::STOP_SEARCH);
        assert_eq!(flags.get(node), NodeFlag::IS_MIRROR | NodeFlag::STOP_SEARCH);
        assert!(flags.is_mirror(node));
        assert_eq!(flags.len(), 1);
    }
}
