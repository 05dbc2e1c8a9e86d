//! 元素替换函数的执行上下文

use std::time::Duration;

use super::flags::{NodeFlag, NodeFlags};
use super::scheduler::{DeferredTask, Scheduler};
use crate::dom::{Document, NodeId, Selector};

/// 计算型替换函数看到的目标元素及引擎能力
pub struct ElementContext<'a> {
    doc: &'a mut Document,
    element: NodeId,
    flags: &'a mut NodeFlags,
    scheduler: &'a mut Scheduler,
}

impl<'a> ElementContext<'a> {
    pub(crate) fn new(
        doc: &'a mut Document,
        element: NodeId,
        flags: &'a mut NodeFlags,
        scheduler: &'a mut Scheduler,
    ) -> Self {
        Self {
            doc,
            element,
            flags,
            scheduler,
        }
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn document(&self) -> &Document {
        &*self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut *self.doc
    }

    pub fn inner_html(&self) -> String {
        self.doc.inner_html(self.element)
    }

    pub fn set_inner_html(&mut self, html: &str) {
        self.doc.set_inner_html(self.element, html);
    }

    pub fn text_content(&self) -> String {
        self.doc.text_content(self.element)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.doc.attribute(self.element, name)
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.doc.set_attribute(self.element, name, value);
    }

    pub fn class_name(&self) -> &str {
        self.doc.class_name(self.element)
    }

    pub fn set_class_name(&mut self, class_name: &str) {
        self.doc.set_class_name(self.element, class_name);
    }

    /// 禁止翻译该元素及其子树
    pub fn stop_search(&mut self) {
        self.flags.insert(self.element, NodeFlag::STOP_SEARCH);
    }

    /// 延迟一段时间后对 locator 的第一个匹配元素禁止翻译
    pub fn defer_stop_search(&mut self, locator: Selector, delay: Duration) {
        self.scheduler.schedule(delay, DeferredTask::StopSearch { locator });
    }
}
