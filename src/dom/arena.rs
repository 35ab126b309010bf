//! Arena-allocated document tree.
//!
//! html5ever parses into this tree through `FoldSink`.
//! Nodes never move once allocated, so an [`ArenaNodeId`] doubles as a dense
//! index for per-node side tables such as computed styles.

use html5ever::{LocalName, Namespace, QualName, ns};

use super::Syntax;

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArenaNodeId(pub u32);

impl ArenaNodeId {
    /// Sentinel value for no node.
    pub const NONE: ArenaNodeId = ArenaNodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }

    /// Position of this node in the arena, for dense side tables.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Node type in the arena DOM.
#[derive(Debug, Clone)]
pub enum ArenaNodeData {
    Document,
    Element {
        name: QualName,
        /// Attributes in source order.
        attrs: Vec<Attribute>,
        /// Cached `id` attribute, kept in sync by [`ArenaDom::set_attr`].
        id: Option<String>,
        /// Cached `class` tokens, kept in sync by [`ArenaDom::set_attr`].
        classes: Vec<String>,
    },
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

/// Element attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    /// An attribute with no namespace, as written in plain HTML.
    pub fn new(local: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, ns!(), LocalName::from(local)),
            value: value.into(),
        }
    }

    /// The attribute name as it appears in markup, including any prefix.
    pub fn qualified_name(&self) -> String {
        match &self.name.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name.local),
            None => self.name.local.to_string(),
        }
    }
}

/// A node in the arena DOM.
#[derive(Debug)]
pub struct ArenaNode {
    pub data: ArenaNodeData,
    pub parent: ArenaNodeId,
    pub first_child: ArenaNodeId,
    pub last_child: ArenaNodeId,
    pub prev_sibling: ArenaNodeId,
    pub next_sibling: ArenaNodeId,
}

impl ArenaNode {
    fn new(data: ArenaNodeData) -> Self {
        Self {
            data,
            parent: ArenaNodeId::NONE,
            first_child: ArenaNodeId::NONE,
            last_child: ArenaNodeId::NONE,
            prev_sibling: ArenaNodeId::NONE,
            next_sibling: ArenaNodeId::NONE,
        }
    }
}

/// Arena-based DOM tree.
///
/// All nodes are stored in a contiguous vector; parent/child/sibling links
/// are indices into it. Nodes detached during parsing stay allocated but are
/// unreachable from the document root.
#[derive(Debug)]
pub struct ArenaDom {
    nodes: Vec<ArenaNode>,
    document: ArenaNodeId,
    syntax: Syntax,
}

impl ArenaDom {
    /// Create a new empty DOM with a document root.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: ArenaNodeId::NONE,
            syntax: Syntax::Html,
        };
        dom.document = dom.alloc(ArenaNode::new(ArenaNodeData::Document));
        dom
    }

    fn alloc(&mut self, node: ArenaNode) -> ArenaNodeId {
        let id = ArenaNodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn document(&self) -> ArenaNodeId {
        self.document
    }

    /// Markup syntax the tree was parsed from.
    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    pub(super) fn set_syntax(&mut self, syntax: Syntax) {
        self.syntax = syntax;
    }

    pub fn get(&self, id: ArenaNodeId) -> Option<&ArenaNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: ArenaNodeId) -> Option<&mut ArenaNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.index())
    }

    /// Create a new element node.
    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> ArenaNodeId {
        let id = attrs
            .iter()
            .find(|a| a.name.local.as_ref() == "id")
            .map(|a| a.value.clone());
        let classes = attrs
            .iter()
            .find(|a| a.name.local.as_ref() == "class")
            .map(|a| split_classes(&a.value))
            .unwrap_or_default();

        self.alloc(ArenaNode::new(ArenaNodeData::Element {
            name,
            attrs,
            id,
            classes,
        }))
    }

    pub fn create_text(&mut self, text: String) -> ArenaNodeId {
        self.alloc(ArenaNode::new(ArenaNodeData::Text(text)))
    }

    pub fn create_comment(&mut self, text: String) -> ArenaNodeId {
        self.alloc(ArenaNode::new(ArenaNodeData::Comment(text)))
    }

    pub fn create_doctype(
        &mut self,
        name: String,
        public_id: String,
        system_id: String,
    ) -> ArenaNodeId {
        self.alloc(ArenaNode::new(ArenaNodeData::Doctype {
            name,
            public_id,
            system_id,
        }))
    }

    /// Link `node` between `prev` and `next` under `parent`.
    ///
    /// A `NONE` neighbour means `node` becomes the first or last child.
    fn splice(
        &mut self,
        node: ArenaNodeId,
        parent: ArenaNodeId,
        prev: ArenaNodeId,
        next: ArenaNodeId,
    ) {
        if let Some(n) = self.get_mut(node) {
            n.parent = parent;
            n.prev_sibling = prev;
            n.next_sibling = next;
        }
        match self.get_mut(prev) {
            Some(p) => p.next_sibling = node,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = node;
                }
            }
        }
        match self.get_mut(next) {
            Some(n) => n.prev_sibling = node,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = node;
                }
            }
        }
    }

    fn last_child(&self, parent: ArenaNodeId) -> ArenaNodeId {
        self.get(parent).map_or(ArenaNodeId::NONE, |n| n.last_child)
    }

    /// Make `child` the last child of `parent`. `child` must be detached.
    pub fn append(&mut self, parent: ArenaNodeId, child: ArenaNodeId) {
        if self.get(parent).is_none() {
            return;
        }
        let last = self.last_child(parent);
        self.splice(child, parent, last, ArenaNodeId::NONE);
    }

    /// Link detached `new_node` immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: ArenaNodeId, new_node: ArenaNodeId) {
        let Some((parent, prev)) = self.get(sibling).map(|n| (n.parent, n.prev_sibling)) else {
            return;
        };
        self.splice(new_node, parent, prev, sibling);
    }

    /// Detach a node from its parent, keeping its own subtree intact.
    pub fn detach(&mut self, target: ArenaNodeId) {
        let Some(node) = self.get_mut(target) else {
            return;
        };
        let parent = std::mem::replace(&mut node.parent, ArenaNodeId::NONE);
        let prev = std::mem::replace(&mut node.prev_sibling, ArenaNodeId::NONE);
        let next = std::mem::replace(&mut node.next_sibling, ArenaNodeId::NONE);

        match self.get_mut(prev) {
            Some(p) => p.next_sibling = next,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = next;
                }
            }
        }
        match self.get_mut(next) {
            Some(n) => n.prev_sibling = prev,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = prev;
                }
            }
        }
    }

    /// Append text to the parent's trailing text node, or create one.
    ///
    /// The tree builder delivers text in chunks; merging keeps one node per
    /// run of character data.
    pub fn append_text(&mut self, parent: ArenaNodeId, text: &str) {
        let last = self.last_child(parent);
        if let Some(ArenaNodeData::Text(existing)) = self.get_mut(last).map(|n| &mut n.data) {
            existing.push_str(text);
            return;
        }

        let node = self.create_text(text.to_string());
        self.append(parent, node);
    }

    /// Insert text before `sibling`, extending a text node already there.
    pub fn insert_text_before(&mut self, sibling: ArenaNodeId, text: &str) {
        let Some(prev) = self.get(sibling).map(|n| n.prev_sibling) else {
            return;
        };
        if let Some(ArenaNodeData::Text(existing)) = self.get_mut(prev).map(|n| &mut n.data) {
            existing.push_str(text);
            return;
        }

        let node = self.create_text(text.to_string());
        self.insert_before(sibling, node);
    }

    /// Total number of allocated nodes, including detached ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the document root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn children(&self, parent: ArenaNodeId) -> ChildrenIter<'_> {
        ChildrenIter {
            dom: self,
            next: self.get(parent).map_or(ArenaNodeId::NONE, |n| n.first_child),
        }
    }

    pub fn parent(&self, id: ArenaNodeId) -> Option<ArenaNodeId> {
        self.get(id).map(|n| n.parent).filter(ArenaNodeId::is_some)
    }

    /// Pre-order traversal of `root` and everything below it.
    pub fn descendants(&self, root: ArenaNodeId) -> Descendants<'_> {
        Descendants {
            dom: self,
            root,
            next: if self.get(root).is_some() {
                root
            } else {
                ArenaNodeId::NONE
            },
        }
    }

    /// Every element reachable from the document root, in document order.
    pub fn elements(&self) -> impl Iterator<Item = ArenaNodeId> + '_ {
        self.descendants(self.document)
            .filter(move |&id| self.is_element(id))
    }

    /// The document element (`<html>`), if the tree has one.
    pub fn root_element(&self) -> Option<ArenaNodeId> {
        self.children(self.document).find(|&id| self.is_element(id))
    }

    /// Find the first node matching a predicate, in document order.
    pub fn find<F>(&self, predicate: F) -> Option<ArenaNodeId>
    where
        F: Fn(&ArenaNode) -> bool,
    {
        self.descendants(self.document)
            .find(|&id| self.get(id).is_some_and(&predicate))
    }

    /// First element with the given tag name.
    pub fn find_by_tag(&self, tag: &str) -> Option<ArenaNodeId> {
        self.find(|node| {
            matches!(&node.data, ArenaNodeData::Element { name, .. } if name.local.as_ref() == tag)
        })
    }
}

impl Default for ArenaDom {
    fn default() -> Self {
        Self::new()
    }
}

fn split_classes(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Children of one node, first to last.
pub struct ChildrenIter<'a> {
    dom: &'a ArenaDom,
    next: ArenaNodeId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = ArenaNodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next;
        self.next = self.dom.get(current)?.next_sibling;
        Some(current)
    }
}

/// Pre-order iterator following sibling links, without an explicit stack.
pub struct Descendants<'a> {
    dom: &'a ArenaDom,
    root: ArenaNodeId,
    next: ArenaNodeId,
}

impl Iterator for Descendants<'_> {
    type Item = ArenaNodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next;
        let node = self.dom.get(current)?;

        self.next = if node.first_child.is_some() {
            node.first_child
        } else {
            // Climb until a node with a next sibling, stopping at the root
            let mut cursor = current;
            loop {
                if cursor == self.root {
                    break ArenaNodeId::NONE;
                }
                let Some(n) = self.dom.get(cursor) else {
                    break ArenaNodeId::NONE;
                };
                if n.next_sibling.is_some() {
                    break n.next_sibling;
                }
                cursor = n.parent;
            }
        };

        Some(current)
    }
}

/// Element accessors and attribute mutation.
impl ArenaDom {
    /// Element's local name (tag).
    pub fn element_name(&self, id: ArenaNodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            ArenaNodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    pub fn element_namespace(&self, id: ArenaNodeId) -> Option<&Namespace> {
        self.get(id).and_then(|n| match &n.data {
            ArenaNodeData::Element { name, .. } => Some(&name.ns),
            _ => None,
        })
    }

    /// Attributes in source order; empty for non-elements.
    pub fn attrs(&self, id: ArenaNodeId) -> &[Attribute] {
        self.get(id)
            .and_then(|n| match &n.data {
                ArenaNodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Get an attribute value by local name.
    pub fn get_attr(&self, id: ArenaNodeId, attr_name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.local.as_ref() == attr_name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing the value in place or appending it.
    pub fn set_attr(&mut self, id: ArenaNodeId, attr_name: &str, value: impl Into<String>) {
        let value = value.into();
        let Some(ArenaNodeData::Element {
            attrs,
            id: cached_id,
            classes,
            ..
        }) = self.get_mut(id).map(|n| &mut n.data)
        else {
            return;
        };

        match attr_name {
            "id" => *cached_id = Some(value.clone()),
            "class" => *classes = split_classes(&value),
            _ => {}
        }

        match attrs.iter_mut().find(|a| a.name.local.as_ref() == attr_name) {
            Some(existing) => existing.value = value,
            None => attrs.push(Attribute::new(attr_name, value)),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, id: ArenaNodeId, attr_name: &str) -> Option<String> {
        let Some(ArenaNodeData::Element {
            attrs,
            id: cached_id,
            classes,
            ..
        }) = self.get_mut(id).map(|n| &mut n.data)
        else {
            return None;
        };

        let pos = attrs
            .iter()
            .position(|a| a.name.local.as_ref() == attr_name)?;
        match attr_name {
            "id" => *cached_id = None,
            "class" => classes.clear(),
            _ => {}
        }
        Some(attrs.remove(pos).value)
    }

    pub fn element_id(&self, id: ArenaNodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            ArenaNodeData::Element { id, .. } => id.as_deref(),
            _ => None,
        })
    }

    pub fn element_classes(&self, id: ArenaNodeId) -> &[String] {
        self.get(id)
            .and_then(|n| match &n.data {
                ArenaNodeData::Element { classes, .. } => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn is_element(&self, id: ArenaNodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, ArenaNodeData::Element { .. }))
    }

    pub fn is_text(&self, id: ArenaNodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, ArenaNodeData::Text(_)))
    }

    /// Content of a text node.
    pub fn text_content(&self, id: ArenaNodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            ArenaNodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Concatenated text of the direct text children of an element.
    pub fn child_text(&self, id: ArenaNodeId) -> String {
        self.children(id)
            .filter_map(|child| self.text_content(child))
            .collect()
    }
}
