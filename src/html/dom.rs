//! Mutable HTML document tree.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Every node keeps a back-reference to its parent, which is what
//! makes `remove` and `closest` cheap. Removing a node only detaches it; the
//! arena slot stays allocated until the document is dropped, so a stale
//! `NodeId` never aliases another node.
//!
//! Text and attribute values are stored exactly as they appeared in the
//! source (entities undecoded). Accessors decode on read and setters escape
//! on write, so untouched content serializes byte-for-byte as it came in.
//!
//! The parser is deliberately forgiving about structure and strict about
//! syntax: an end tag closes the nearest matching open element, stray end
//! tags are ignored, and elements left open at end of input are closed
//! implicitly. Unterminated comments, tags or quoted values are errors.

use super::lexer::{self, Mode, TokenKind};
use super::selector::SelectorList;
use super::{DomError, decode_entities, escape};

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is text, never child elements.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Where [`Document::insert_html`] places new content relative to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Before the target, as a sibling.
    BeforeBegin,
    /// Inside the target, before its first child.
    AfterBegin,
    /// Inside the target, after its last child.
    BeforeEnd,
    /// After the target, as a sibling.
    AfterEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Source text of the value, entities undecoded. `None` for bare attributes.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    /// Full `<!DOCTYPE ...>` markup.
    Doctype(String),
    /// Full `<!-- ... -->` markup.
    Comment(String),
    Text(String),
    Element { name: String, attrs: Vec<Attribute> },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse a complete HTML document.
    pub fn parse(html: &str) -> Result<Self, DomError> {
        if html.trim().is_empty() {
            return Err(DomError::Malformed {
                offset: 0,
                reason: "document is empty",
            });
        }
        let mut doc = Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        };
        let root = doc.root();
        doc.build(html, root)?;
        Ok(doc)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Tokenize `html` and append the resulting nodes under `container`.
    fn build(&mut self, html: &str, container: NodeId) -> Result<(), DomError> {
        let mut open = vec![container];
        for token in lexer::Lexer::new(html, Mode::Strict, RAW_TEXT_ELEMENTS) {
            let token = token?;
            let current = *open.last().unwrap_or(&container);
            let text = token.text(html);
            match token.kind {
                TokenKind::Doctype => {
                    self.append_new(current, NodeKind::Doctype(text.to_string()));
                }
                TokenKind::Comment => {
                    self.append_new(current, NodeKind::Comment(text.to_string()));
                }
                TokenKind::Text | TokenKind::RawText => {
                    self.append_new(current, NodeKind::Text(text.to_string()));
                }
                TokenKind::StartTag(tag) => {
                    let name = tag.name.to_ascii_lowercase();
                    let attrs = tag
                        .attrs
                        .iter()
                        .map(|a| Attribute {
                            name: a.name.to_ascii_lowercase(),
                            value: a.value.map(|v| v.replace('"', "&quot;")),
                        })
                        .collect();
                    let leaf = tag.self_closing || is_void(&name);
                    let id = self.append_new(current, NodeKind::Element { name, attrs });
                    if !leaf {
                        open.push(id);
                    }
                }
                TokenKind::EndTag(name) => {
                    let depth = open
                        .iter()
                        .skip(1)
                        .rposition(|&id| {
                            self.tag_name(id)
                                .is_some_and(|n| n.eq_ignore_ascii_case(name))
                        })
                        .map(|i| i + 1);
                    if let Some(depth) = depth {
                        open.truncate(depth);
                    }
                }
            }
        }
        Ok(())
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn append_new(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.alloc(kind);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag_name(id).is_some()
    }

    /// Whether the node is still reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    fn attributes_mut(&mut self, id: NodeId) -> Option<&mut Vec<Attribute>> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    /// Decoded attribute value. Bare attributes read as the empty string.
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.attributes(id)
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().map(decode_entities).unwrap_or_default())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attributes(id)
            .iter()
            .any(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        self.set_raw_attribute(id, name, Some(escape(value)));
    }

    /// Set an attribute from already-escaped markup. Existing attributes keep
    /// their position; new ones are appended.
    pub fn set_raw_attribute(&mut self, id: NodeId, name: &str, raw: Option<String>) {
        let Some(attrs) = self.attributes_mut(id) else {
            return;
        };
        match attrs.iter_mut().find(|a| a.name.eq_ignore_ascii_case(name)) {
            Some(attr) => attr.value = raw,
            None => attrs.push(Attribute {
                name: name.to_ascii_lowercase(),
                value: raw,
            }),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let Some(attrs) = self.attributes_mut(id) else {
            return false;
        };
        let before = attrs.len();
        attrs.retain(|a| !a.name.eq_ignore_ascii_case(name));
        attrs.len() != before
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.get_attribute(id, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Source text of a text node.
    pub fn raw_text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn set_raw_text(&mut self, id: NodeId, raw: String) {
        if let NodeKind::Text(text) = &mut self.nodes[id.0].kind {
            *text = raw;
        }
    }

    /// Decoded concatenation of all descendant text.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.raw_text(id) {
            return decode_entities(text);
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.raw_text(n))
            .map(decode_entities)
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        let node = self.alloc(NodeKind::Text(escape(text)));
        self.attach(id, 0, node);
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Create a detached element; place it with [`Document::insert_node`].
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    /// Parse `html` as a fragment and insert the resulting nodes.
    ///
    /// Returns the top-level inserted nodes in order.
    pub fn insert_html(
        &mut self,
        target: NodeId,
        position: InsertPosition,
        html: &str,
    ) -> Result<Vec<NodeId>, DomError> {
        let (parent, index) = self.insertion_point(target, position)?;
        let nodes = self.parse_fragment(html)?;
        for (offset, &node) in nodes.iter().enumerate() {
            self.attach(parent, index + offset, node);
        }
        Ok(nodes)
    }

    /// Move `node` to `position` relative to `target`.
    pub fn insert_node(
        &mut self,
        target: NodeId,
        position: InsertPosition,
        node: NodeId,
    ) -> Result<(), DomError> {
        if node == target || self.ancestors(target).any(|a| a == node) {
            return Err(DomError::HierarchyRequest);
        }
        self.remove(node);
        let (parent, index) = self.insertion_point(target, position)?;
        self.attach(parent, index, node);
        Ok(())
    }

    fn insertion_point(
        &self,
        target: NodeId,
        position: InsertPosition,
    ) -> Result<(NodeId, usize), DomError> {
        match position {
            InsertPosition::AfterBegin => Ok((target, 0)),
            InsertPosition::BeforeEnd => Ok((target, self.children(target).len())),
            InsertPosition::BeforeBegin | InsertPosition::AfterEnd => {
                let parent = self.parent(target).ok_or(DomError::HierarchyRequest)?;
                let index = self.index_in_parent(parent, target);
                let index = if position == InsertPosition::AfterEnd {
                    index + 1
                } else {
                    index
                };
                Ok((parent, index))
            }
        }
    }

    fn index_in_parent(&self, parent: NodeId, child: NodeId) -> usize {
        self.children(parent)
            .iter()
            .position(|&c| c == child)
            .unwrap_or(0)
    }

    fn attach(&mut self, parent: NodeId, index: usize, node: NodeId) {
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, node);
        self.nodes[node.0].parent = Some(parent);
    }

    fn parse_fragment(&mut self, html: &str) -> Result<Vec<NodeId>, DomError> {
        let holder = self.alloc(NodeKind::Document);
        self.build(html, holder)?;
        let nodes = std::mem::take(&mut self.nodes[holder.0].children);
        for &node in &nodes {
            self.nodes[node.0].parent = None;
        }
        Ok(nodes)
    }

    fn clear_children(&mut self, id: NodeId) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
    }

    /// Detach a node and its subtree from the tree.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<(), DomError> {
        let nodes = self.parse_fragment(html)?;
        self.clear_children(id);
        for (index, node) in nodes.into_iter().enumerate() {
            self.attach(id, index, node);
        }
        Ok(())
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Every element under `scope` matching `selector`, in document order.
    pub fn query_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect())
    }

    pub fn query(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .find(|&n| selector.matches(self, n)))
    }

    /// `id` itself or its nearest ancestor matching `selector`.
    pub fn closest(&self, id: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selector = SelectorList::parse(selector)?;
        Ok(std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| selector.matches(self, n)))
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize the whole document. Attribute order and quoting are fixed,
    /// so equal trees always produce equal strings.
    pub fn serialize(&self) -> String {
        self.inner_html(self.root())
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Document => {
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeKind::Doctype(raw) | NodeKind::Comment(raw) | NodeKind::Text(raw) => {
                out.push_str(raw)
            }
            NodeKind::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for attr in attrs {
                    out.push(' ');
                    out.push_str(&attr.name);
                    if let Some(value) = &attr.value {
                        out.push_str("=\"");
                        out.push_str(value);
                        out.push('"');
                    }
                }
                out.push('>');
                if is_void(name) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}
