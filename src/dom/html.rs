//! html5ever 对接层
//! 解析：实现 TreeSink，由 html5ever 树构建器直接在 arena 中创建节点（含隐式结束标签等规则）
//! 序列化：为 (文档, 节点) 实现 Serialize，输出与浏览器 innerHTML 一致

use std::borrow::Cow;
use std::cell::RefCell;
use std::io;

use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::{ns, parse_document, parse_fragment, LocalName, ParseOpts};
use markup5ever::interface::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use markup5ever::interface::{Attribute, ExpandedName, QualName};
use markup5ever::serialize::{Serialize, Serializer, TraversalScope};
use once_cell::sync::Lazy;
use tendril::{StrTendril, TendrilSink};
use tracing::{trace, warn};

use super::document::{Document, NodeId, NodeKind};

/// 非元素节点的占位名称
static NON_ELEMENT: Lazy<QualName> = Lazy::new(|| QualName::new(None, ns!(), LocalName::from("")));

/// HTML 命名空间下的元素名
pub(crate) fn html_name(local: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(local))
}

/// 树构建器持有的节点句柄，元素句柄携带解析时的限定名
#[derive(Debug, Clone)]
struct SinkHandle {
    id: NodeId,
    name: Option<QualName>,
    annotation_xml: bool,
}

impl SinkHandle {
    fn node(id: NodeId) -> Self {
        Self { id, name: None, annotation_xml: false }
    }
}

/// 写入 arena 文档的 TreeSink，构建过程不产生变更记录
struct ArenaSink<'d> {
    doc: RefCell<&'d mut Document>,
    document: NodeId,
}

impl<'d> ArenaSink<'d> {
    fn new(doc: &'d mut Document, document: NodeId) -> Self {
        Self { doc: RefCell::new(doc), document }
    }

    fn convert_attrs(attrs: Vec<Attribute>) -> Vec<(String, String)> {
        attrs
            .into_iter()
            .map(|attr| {
                let key = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                (key, attr.value.to_string())
            })
            .collect()
    }

    /// 文本与前一个文本节点合并，否则新建文本节点
    fn text_or_node(doc: &mut Document, previous: Option<NodeId>, child: NodeOrText<SinkHandle>) -> Option<NodeId> {
        match child {
            NodeOrText::AppendText(text) => match previous.filter(|&prev| doc.is_text(prev)) {
                Some(prev) => {
                    doc.append_text_data(prev, &text);
                    None
                }
                None => Some(doc.create_text(text.to_string())),
            },
            NodeOrText::AppendNode(node) => {
                doc.unlink(node.id);
                Some(node.id)
            }
        }
    }
}

impl TreeSink for ArenaSink<'_> {
    type Handle = SinkHandle;
    type Output = NodeId;
    type ElemName<'a>
        = ExpandedName<'a>
    where
        Self: 'a;

    fn finish(self) -> NodeId {
        self.document
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        trace!("HTML解析容错: {}", msg);
    }

    fn get_document(&self) -> SinkHandle {
        SinkHandle::node(self.document)
    }

    fn elem_name<'a>(&'a self, target: &'a SinkHandle) -> ExpandedName<'a> {
        target.name.as_ref().unwrap_or(&*NON_ELEMENT).expanded()
    }

    fn create_element(&self, name: QualName, attrs: Vec<Attribute>, flags: ElementFlags) -> SinkHandle {
        let id = self
            .doc
            .borrow_mut()
            .create_element_with_attrs(&name.local, Self::convert_attrs(attrs));
        SinkHandle {
            id,
            name: Some(name),
            annotation_xml: flags.mathml_annotation_xml_integration_point,
        }
    }

    fn create_comment(&self, text: StrTendril) -> SinkHandle {
        SinkHandle::node(self.doc.borrow_mut().create_comment(text.to_string()))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> SinkHandle {
        SinkHandle::node(self.doc.borrow_mut().create_comment(format!("?{} {}", target, data)))
    }

    fn append(&self, parent: &SinkHandle, child: NodeOrText<SinkHandle>) {
        let mut doc = self.doc.borrow_mut();
        let previous = doc.children(parent.id).last().copied();
        if let Some(id) = Self::text_or_node(&mut **doc, previous, child) {
            doc.link(parent.id, id, None);
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &SinkHandle,
        prev_element: &SinkHandle,
        child: NodeOrText<SinkHandle>,
    ) {
        let has_parent = self.doc.borrow().parent(element.id).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(&self, _name: StrTendril, _public_id: StrTendril, _system_id: StrTendril) {}

    fn get_template_contents(&self, target: &SinkHandle) -> SinkHandle {
        // 模板内容直接作为模板元素的子节点
        target.clone()
    }

    fn same_node(&self, x: &SinkHandle, y: &SinkHandle) -> bool {
        x.id == y.id
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &SinkHandle, child: NodeOrText<SinkHandle>) {
        let mut doc = self.doc.borrow_mut();
        let Some(parent) = doc.parent(sibling.id) else {
            return;
        };
        let previous = {
            let siblings = doc.children(parent);
            siblings
                .iter()
                .position(|&node| node == sibling.id)
                .and_then(|pos| pos.checked_sub(1))
                .map(|pos| siblings[pos])
        };
        if let Some(id) = Self::text_or_node(&mut **doc, previous, child) {
            doc.link(parent, id, Some(sibling.id));
        }
    }

    fn add_attrs_if_missing(&self, target: &SinkHandle, attrs: Vec<Attribute>) {
        self.doc
            .borrow_mut()
            .add_attrs_if_missing(target.id, Self::convert_attrs(attrs));
    }

    fn remove_from_parent(&self, target: &SinkHandle) {
        self.doc.borrow_mut().unlink(target.id);
    }

    fn reparent_children(&self, node: &SinkHandle, new_parent: &SinkHandle) {
        self.doc.borrow_mut().adopt_children(node.id, new_parent.id);
    }

    fn is_mathml_annotation_xml_integration_point(&self, handle: &SinkHandle) -> bool {
        handle.annotation_xml
    }
}

/// HTML 解析入口
pub struct FragmentParser;

impl FragmentParser {
    /// 按 innerHTML 规则在 context 元素下解析片段，返回游离状态的顶层节点
    pub fn parse(doc: &mut Document, context: &str, html: &str) -> Vec<NodeId> {
        let scratch = doc.create_document_node();
        let sink = ArenaSink::new(doc, scratch);
        parse_fragment(sink, ParseOpts::default(), html_name(context), Vec::new(), true)
            .one(StrTendril::from(html));

        // 片段解析的结果挂在临时文档的 html 根元素下
        let Some(&root) = doc.children(scratch).first() else {
            return Vec::new();
        };
        let nodes = doc.children(root).to_vec();
        for &node in &nodes {
            doc.unlink(node);
        }
        nodes
    }

    /// 解析完整页面到文档根节点下，返回根节点
    pub fn parse_document(doc: &mut Document, html: &str) -> NodeId {
        let root = doc.root();
        let sink = ArenaSink::new(doc, root);
        parse_document(sink, ParseOpts::default()).one(StrTendril::from(html))
    }
}

/// 可交给 html5ever 序列化的节点视图
pub struct SerializableNode<'a> {
    doc: &'a Document,
    id: NodeId,
}

enum SerializeOp {
    Open(NodeId),
    Close(QualName),
}

impl<'a> SerializableNode<'a> {
    pub fn new(doc: &'a Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    /// 序列化为字符串，children_only 对应 innerHTML，否则对应 outerHTML
    pub fn to_html(&self, children_only: bool) -> String {
        let traversal_scope = if children_only {
            TraversalScope::ChildrenOnly(self.doc.tag_name(self.id).map(html_name))
        } else {
            TraversalScope::IncludeNode
        };
        let opts = SerializeOpts {
            traversal_scope,
            ..Default::default()
        };

        let mut buf: Vec<u8> = Vec::new();
        if let Err(err) = serialize(&mut buf, self, opts) {
            warn!("节点 {} 序列化失败: {}", self.id, err);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn open_children(&self, id: NodeId, ops: &mut Vec<SerializeOp>) {
        ops.extend(self.doc.children(id).iter().rev().map(|&child| SerializeOp::Open(child)));
    }
}

impl Serialize for SerializableNode<'_> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut ops = Vec::new();
        match traversal_scope {
            TraversalScope::IncludeNode => ops.push(SerializeOp::Open(self.id)),
            TraversalScope::ChildrenOnly(_) => self.open_children(self.id, &mut ops),
        }

        while let Some(op) = ops.pop() {
            match op {
                SerializeOp::Open(id) => match self.doc.kind(id) {
                    NodeKind::Element(data) => {
                        let name = html_name(&data.name);
                        let attrs: Vec<(QualName, &str)> = data
                            .attrs
                            .iter()
                            .map(|(key, value)| (QualName::new(None, ns!(), LocalName::from(key.as_str())), value.as_str()))
                            .collect();
                        serializer.start_elem(name.clone(), attrs.iter().map(|(key, value)| (key, *value)))?;
                        ops.push(SerializeOp::Close(name));
                        self.open_children(id, &mut ops);
                    }
                    NodeKind::Document => self.open_children(id, &mut ops),
                    NodeKind::Text(text) => serializer.write_text(text)?,
                    NodeKind::Comment(text) => serializer.write_comment(text)?,
                },
                SerializeOp::Close(name) => serializer.end_elem(name)?,
            }
        }
        Ok(())
    }
}
