//! 文档树模块：节点存储、基于 html5ever 的解析/序列化、结构选择器与变更记录
pub mod document;
pub mod html;
pub mod mutation;
pub mod selector;

pub use self::document::{Document, ElementData, NodeId, NodeKind};
pub use self::html::{FragmentParser, SerializableNode};
pub use self::mutation::{MutationKind, MutationRecord};
pub use self::selector::Selector;
