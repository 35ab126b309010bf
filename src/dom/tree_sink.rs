//! Tree builder output into an [`ArenaDom`].
//!
//! html5ever and xml5ever drive the same `TreeSink`, so one sink serves both
//! syntaxes. The tree builders repair malformed markup themselves; parse
//! errors are only traced.

use std::borrow::Cow;
use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, QualName, local_name, ns};

use super::Syntax;
use super::arena::{ArenaDom, ArenaNodeId, Attribute};

static NO_NAME: QualName = QualName {
    prefix: None,
    ns: ns!(),
    local: local_name!(""),
};

/// Node reference handed to the tree builder.
///
/// Element handles carry their own copy of the element name so
/// [`TreeSink::elem_name`] can borrow from the handle instead of from the
/// `RefCell`-guarded arena.
#[derive(Debug, Clone)]
pub struct SinkHandle {
    id: ArenaNodeId,
    name: Option<QualName>,
}

impl SinkHandle {
    fn node(id: ArenaNodeId) -> Self {
        Self { id, name: None }
    }
}

/// Builds an [`ArenaDom`] from tree builder callbacks.
pub struct FoldSink {
    dom: RefCell<ArenaDom>,
}

impl FoldSink {
    pub fn new(syntax: Syntax) -> Self {
        let mut dom = ArenaDom::new();
        dom.set_syntax(syntax);
        Self {
            dom: RefCell::new(dom),
        }
    }

    pub fn into_dom(self) -> ArenaDom {
        self.dom.into_inner()
    }

    fn insert(dom: &mut ArenaDom, parent: ArenaNodeId, child: NodeOrText<SinkHandle>) {
        match child {
            NodeOrText::AppendNode(node) => dom.append(parent, node.id),
            NodeOrText::AppendText(text) => dom.append_text(parent, &text),
        }
    }
}

impl TreeSink for FoldSink {
    type Handle = SinkHandle;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        tracing::trace!(%msg, "markup parse error");
    }

    fn get_document(&self) -> SinkHandle {
        SinkHandle::node(self.dom.borrow().document())
    }

    fn elem_name<'a>(&'a self, target: &'a SinkHandle) -> Self::ElemName<'a> {
        target.name.as_ref().unwrap_or(&NO_NAME)
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Html5Attribute>,
        _flags: ElementFlags,
    ) -> SinkHandle {
        let attrs = attrs
            .into_iter()
            .map(|a| Attribute {
                name: a.name,
                value: a.value.to_string(),
            })
            .collect();
        let id = self.dom.borrow_mut().create_element(name.clone(), attrs);
        SinkHandle {
            id,
            name: Some(name),
        }
    }

    fn create_comment(&self, text: StrTendril) -> SinkHandle {
        SinkHandle::node(self.dom.borrow_mut().create_comment(text.to_string()))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> SinkHandle {
        // Same shape the HTML tokenizer gives `<?...?>`: a bogus comment
        let text = format!("?{target} {data}?");
        SinkHandle::node(self.dom.borrow_mut().create_comment(text))
    }

    fn append(&self, parent: &SinkHandle, child: NodeOrText<SinkHandle>) {
        Self::insert(&mut self.dom.borrow_mut(), parent.id, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &SinkHandle,
        prev_element: &SinkHandle,
        child: NodeOrText<SinkHandle>,
    ) {
        // Foster parenting: content goes before the table when it is in
        // the tree, otherwise into the previous open element
        if self.dom.borrow().parent(element.id).is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        let mut dom = self.dom.borrow_mut();
        let doctype = dom.create_doctype(
            name.to_string(),
            public_id.to_string(),
            system_id.to_string(),
        );
        let document = dom.document();
        dom.append(document, doctype);
    }

    fn get_template_contents(&self, target: &SinkHandle) -> SinkHandle {
        // Template content stays inline so its text is cascaded like any other
        target.clone()
    }

    fn same_node(&self, x: &SinkHandle, y: &SinkHandle) -> bool {
        x.id == y.id
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        tracing::trace!(?mode, "quirks mode");
    }

    fn append_before_sibling(&self, sibling: &SinkHandle, new_node: NodeOrText<SinkHandle>) {
        let mut dom = self.dom.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => dom.insert_before(sibling.id, node.id),
            NodeOrText::AppendText(text) => dom.insert_text_before(sibling.id, &text),
        }
    }

    fn add_attrs_if_missing(&self, target: &SinkHandle, attrs: Vec<Html5Attribute>) {
        // Only reached for repeated <html>/<body> tags, whose attributes are
        // never namespaced
        let mut dom = self.dom.borrow_mut();
        for attr in attrs {
            let local = attr.name.local.as_ref();
            if dom.get_attr(target.id, local).is_none() {
                dom.set_attr(target.id, local, attr.value.to_string());
            }
        }
    }

    fn remove_from_parent(&self, target: &SinkHandle) {
        self.dom.borrow_mut().detach(target.id);
    }

    fn reparent_children(&self, node: &SinkHandle, new_parent: &SinkHandle) {
        let mut dom = self.dom.borrow_mut();
        let children: Vec<_> = dom.children(node.id).collect();
        for child in children {
            dom.detach(child);
            dom.append(new_parent.id, child);
        }
    }
}
