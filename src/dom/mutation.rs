//! 节点变更记录
//! 文档每次被修改都会追加一条记录，等价于对 body 开启 subtree 监听

use super::document::NodeId;

/// 变更类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// 子节点增删
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// 文本节点内容变更
    CharacterData,
    /// 属性变更
    Attributes { name: String },
}

/// 单条变更记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// 发生变更的节点（子节点增删时为父节点）
    pub target: NodeId,
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            target,
            kind: MutationKind::ChildList { added, removed },
        }
    }

    pub fn character_data(target: NodeId) -> Self {
        Self {
            target,
            kind: MutationKind::CharacterData,
        }
    }

    pub fn attributes(target: NodeId, name: impl Into<String>) -> Self {
        Self {
            target,
            kind: MutationKind::Attributes { name: name.into() },
        }
    }

    /// 新增的子节点（非子节点变更时为空）
    pub fn added_nodes(&self) -> &[NodeId] {
        match &self.kind {
            MutationKind::ChildList { added, .. } => added,
            _ => &[],
        }
    }

    /// 是否为指定属性的变更
    pub fn is_attribute(&self, attr: &str) -> bool {
        matches!(&self.kind, MutationKind::Attributes { name } if name == attr)
    }
}
