//! 文档树模型
//! 节点统一存放在 arena 中，通过 NodeId 引用；宿主应用与翻译引擎都只通过这里的接口读写节点。
//! 已连接到文档的节点发生的每一次修改都会写入变更记录，由 `take_records` 取出。

use std::fmt;

use super::html::{FragmentParser, SerializableNode};
use super::mutation::MutationRecord;

/// 节点ID（arena 下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// 获取原始下标
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 元素数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// 小写标签名
    pub name: String,
    /// 按声明顺序保存的属性
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// class 列表
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }
}

/// 节点类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// 可变文档树
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    location: String,
    records: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// 创建只包含 html/head/body 骨架的空文档
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Node::new(NodeKind::Document)],
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            location: String::new(),
            records: Vec::new(),
        };
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(doc.root, html, None);
        doc.link(html, head, None);
        doc.link(html, body, None);
        doc.head = head;
        doc.body = body;
        doc
    }

    /// 解析完整页面
    ///
    /// 由 html5ever 按浏览器规则补全 html/head/body 骨架。
    pub fn parse_html(html: &str) -> Self {
        let mut doc = Self {
            nodes: vec![Node::new(NodeKind::Document)],
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            location: String::new(),
            records: Vec::new(),
        };
        FragmentParser::parse_document(&mut doc, html);

        let html_elem = doc.child_element(doc.root, "html");
        doc.head = doc.child_element(html_elem, "head");
        doc.body = doc.child_element(html_elem, "body");

        // 构建阶段的修改不属于宿主变更
        doc.records.clear();
        doc
    }

    /// 查找指定标签的子元素，不存在（如 frameset 页面没有 body）时创建
    fn child_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        let existing = self
            .children(parent)
            .iter()
            .copied()
            .find(|&child| self.tag_name(child) == Some(name));
        match existing {
            Some(id) => id,
            None => {
                let id = self.create_element(name);
                self.link(parent, id, None);
                id
            }
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// 当前路由（location hash）
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    // ===== 节点创建 =====

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push_node(NodeKind::Element(ElementData::new(name)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Comment(text.into()))
    }

    pub(crate) fn create_element_with_attrs(&mut self, name: &str, attrs: Vec<(String, String)>) -> NodeId {
        let mut data = ElementData::new(name);
        data.attrs = attrs;
        self.push_node(NodeKind::Element(data))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        id
    }

    /// 以 context 元素为上下文解析 HTML 片段，返回游离状态的顶层节点
    pub fn parse_fragment(&mut self, context: &str, html: &str) -> Vec<NodeId> {
        FragmentParser::parse(self, context, html)
    }

    /// 解析用的临时文档节点，永远不会连接到文档上
    pub(crate) fn create_document_node(&mut self) -> NodeId {
        self.push_node(NodeKind::Document)
    }

    // ===== 节点读取 =====

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// 父元素（文档根节点不算元素）
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&parent| self.is_element(parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text(_))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|data| data.name.as_str())
    }

    /// 文本节点内容
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// 与该文本节点相邻的所有连续文本节点拼接后的内容
    pub fn whole_text(&self, id: NodeId) -> Option<String> {
        self.text(id)?;
        let Some(parent) = self.parent(id) else {
            return self.text(id).map(str::to_string);
        };
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&child| child == id)?;

        let mut start = pos;
        while start > 0 && self.is_text(siblings[start - 1]) {
            start -= 1;
        }
        let mut end = pos;
        while end + 1 < siblings.len() && self.is_text(siblings[end + 1]) {
            end += 1;
        }

        Some(
            siblings[start..=end]
                .iter()
                .filter_map(|&sibling| self.text(sibling))
                .collect(),
        )
    }

    /// 所有后代文本拼接后的内容
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// 先序遍历的后代节点（不含自身）
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        result
    }

    /// 从父节点开始依次向上的祖先节点
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// 节点是否仍挂在文档上
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|ancestor| ancestor == self.root)
    }

    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|node| node == ancestor)
    }

    /// 在父元素的子元素中的位置（从 1 开始，仅统计元素）
    pub fn element_position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent)
            .iter()
            .filter(|&&child| self.is_element(child))
            .position(|&child| child == id)
            .map(|pos| pos + 1)
    }

    // ===== 属性 =====

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|data| data.attr(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let NodeKind::Element(data) = &mut self.nodes[id.index()].kind else {
            return;
        };
        match data.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => data.attrs.push((name.to_string(), value.to_string())),
        }
        self.record(MutationRecord::attributes(id, name));
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        let NodeKind::Element(data) = &mut self.nodes[id.index()].kind else {
            return;
        };
        let before = data.attrs.len();
        data.attrs.retain(|(key, _)| key != name);
        if data.attrs.len() != before {
            self.record(MutationRecord::attributes(id, name));
        }
    }

    pub fn class_name(&self, id: NodeId) -> &str {
        self.attribute(id, "class").unwrap_or("")
    }

    pub fn set_class_name(&mut self, id: NodeId, class_name: &str) {
        self.set_attribute(id, "class", class_name);
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .map(|data| data.classes().any(|name| name == class))
            .unwrap_or(false)
    }

    /// 读取内联样式属性
    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attribute(id, "style")?;
        parse_style(style)
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// 设置（Some）或移除（None）内联样式属性
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: Option<&str>) {
        if !self.is_element(id) {
            return;
        }
        let mut declarations = parse_style(self.attribute(id, "style").unwrap_or(""));
        declarations.retain(|(name, _)| name != property);
        if let Some(value) = value {
            declarations.push((property.to_string(), value.to_string()));
        }

        if declarations.is_empty() {
            self.remove_attribute(id, "style");
        } else {
            let style = declarations
                .iter()
                .map(|(name, value)| format!("{}: {};", name, value))
                .collect::<Vec<_>>()
                .join(" ");
            self.set_attribute(id, "style", &style);
        }
    }

    // ===== 内容读写 =====

    /// 设置文本节点内容
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeKind::Text(existing) = &mut self.nodes[id.index()].kind {
            *existing = text.into();
            self.record(MutationRecord::character_data(id));
        }
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        SerializableNode::new(self, id).to_html(true)
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        SerializableNode::new(self, id).to_html(false)
    }

    /// 用解析后的 HTML 片段替换全部子节点（只产生一条变更记录）
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        let Some(context) = self.tag_name(id).map(str::to_string) else {
            return;
        };
        let removed = std::mem::take(&mut self.nodes[id.index()].children);
        for &child in &removed {
            self.nodes[child.index()].parent = None;
        }

        let added = self.parse_fragment(&context, html);
        for &child in &added {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes[id.index()].children = added.clone();

        if !added.is_empty() || !removed.is_empty() {
            self.record(MutationRecord::child_list(id, added, removed));
        }
    }

    // ===== 结构修改 =====

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// 在 reference 之前插入子节点，reference 为 None 或不是 parent 的子节点时追加到末尾
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent == child || self.is_descendant_of(parent, child) {
            return;
        }
        self.detach(child);
        self.link(parent, child, reference);
        self.record(MutationRecord::child_list(parent, vec![child], Vec::new()));
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.detach(child);
        true
    }

    /// 用 new_child 替换 old_child，old_child 不是 parent 的子节点时返回 false
    pub fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId) -> bool {
        if self.parent(old_child) != Some(parent) || new_child == old_child {
            return false;
        }
        if self.is_descendant_of(parent, new_child) {
            return false;
        }
        if self.parent(new_child).is_some() {
            self.detach(new_child);
        }
        let Some(pos) = self.children(parent).iter().position(|&child| child == old_child) else {
            return false;
        };

        self.nodes[parent.index()].children[pos] = new_child;
        self.nodes[old_child.index()].parent = None;
        self.nodes[new_child.index()].parent = Some(parent);
        self.record(MutationRecord::child_list(parent, vec![new_child], vec![old_child]));
        true
    }

    /// 深拷贝节点及其子树，返回游离状态的副本
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let copy = self.push_node(self.nodes[id.index()].kind.clone());
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.link(copy, child_copy, None);
        }
        copy
    }

    /// 将节点从父节点上摘下
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.nodes[parent.index()].children.retain(|&child| child != id);
        self.nodes[id.index()].parent = None;
        self.record(MutationRecord::child_list(parent, Vec::new(), vec![id]));
    }

    /// 不产生变更记录的挂载，仅用于构建游离子树
    pub(crate) fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let siblings = &mut self.nodes[parent.index()].children;
        match reference.and_then(|r| siblings.iter().position(|&c| c == r)) {
            Some(pos) => siblings.insert(pos, child),
            None => siblings.push(child),
        }
        self.nodes[child.index()].parent = Some(parent);
    }

    /// 不产生变更记录的摘除，仅用于构建游离子树
    pub(crate) fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.nodes[parent.index()].children.retain(|&child| child != id);
            self.nodes[id.index()].parent = None;
        }
    }

    /// 补充元素上尚不存在的属性
    pub(crate) fn add_attrs_if_missing(&mut self, id: NodeId, attrs: Vec<(String, String)>) {
        if let NodeKind::Element(data) = &mut self.nodes[id.index()].kind {
            for (name, value) in attrs {
                if data.attr(&name).is_none() {
                    data.attrs.push((name, value));
                }
            }
        }
    }

    /// 不产生变更记录的文本追加，仅用于构建游离子树
    pub(crate) fn append_text_data(&mut self, id: NodeId, text: &str) {
        if let NodeKind::Text(existing) = &mut self.nodes[id.index()].kind {
            existing.push_str(text);
        }
    }

    /// 将 from 的全部子节点移到 to 下（不产生变更记录）
    pub(crate) fn adopt_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from.index()].children);
        for child in children {
            self.nodes[child.index()].parent = None;
            self.link(to, child, None);
        }
    }

    // ===== 变更记录 =====

    /// 取出并清空当前积累的变更记录
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn has_pending_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// 只记录 body 子树内的变更，与 MutationObserver 监听 body 的行为一致
    fn record(&mut self, record: MutationRecord) {
        if record.target == self.body || self.is_descendant_of(record.target, self.body) {
            self.records.push(record);
        }
    }
}

/// 祖先节点迭代器
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// 解析 style 属性为 (属性名, 值) 列表
fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                None
            } else {
                Some((name, value.to_string()))
            }
        })
        .collect()
}
