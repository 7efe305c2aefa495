//! Arena-backed document tree for Markdown conversion.
//!
//! Nodes live in a flat [`Document`] arena and are addressed by [`NodeId`].
//! Parents are stored as plain indices, so upward traversal never creates
//! ownership cycles. Any HTML parser can populate a `Document` through the
//! builder methods; the engine itself only ever reads it through [`NodeRef`].

use std::fmt;

use crate::utilities::{is_block, is_meaningful_when_blank, is_void};
use crate::{Result, RuledownError};

/// Node types matching DOM nodeType values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Element node (nodeType = 1)
    Element = 1,
    /// Text node (nodeType = 3)
    Text = 3,
    /// CDATA section (nodeType = 4)
    CData = 4,
    /// Processing instruction (nodeType = 7)
    ProcessingInstruction = 7,
    /// Comment node (nodeType = 8)
    Comment = 8,
    /// Document node (nodeType = 9)
    Document = 9,
    /// Doctype node (nodeType = 10)
    Doctype = 10,
    /// Document fragment node (nodeType = 11)
    DocumentFragment = 11,
}

impl NodeType {
    /// Map a DOM `nodeType` number to a node type.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            1 => Ok(NodeType::Element),
            3 => Ok(NodeType::Text),
            4 => Ok(NodeType::CData),
            7 => Ok(NodeType::ProcessingInstruction),
            8 => Ok(NodeType::Comment),
            9 => Ok(NodeType::Document),
            10 => Ok(NodeType::Doctype),
            11 => Ok(NodeType::DocumentFragment),
            other => Err(RuledownError::UnsupportedNodeKind(other)),
        }
    }

    /// The DOM `nodeType` number
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// How the converter interprets a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// Rendered through the rule registry
    Element,
    /// Emits (escaped) text
    Text,
    /// Emits nothing
    Comment,
    /// Renders its children only (documents and fragments)
    Container,
}

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The root node ID (always 0).
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    node_type: NodeType,
    /// Lowercase tag name for elements, empty otherwise
    tag_name: String,
    value: Option<String>,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    /// Position within the parent's children
    index: usize,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(node_type: NodeType, tag_name: String, value: Option<String>) -> Self {
        Self {
            node_type,
            tag_name,
            value,
            attributes: Vec::new(),
            parent: None,
            index: 0,
            children: Vec::new(),
        }
    }
}

/// A parsed document stored as an arena of nodes.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Create an empty document with a `#document` root
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeType::Document, String::new(), None)],
        }
    }

    /// Create an empty document whose root is a document fragment
    pub fn fragment() -> Self {
        Self {
            nodes: vec![NodeData::new(
                NodeType::DocumentFragment,
                String::new(),
                None,
            )],
        }
    }

    /// The root node
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            doc: self,
            id: NodeId::ROOT,
        }
    }

    /// Look up a node by id
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.index() < self.nodes.len()).then_some(NodeRef { doc: self, id })
    }

    /// Number of nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the document holds nothing but its root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Append a node of any type under `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this document.
    pub fn append_node(
        &mut self,
        parent: NodeId,
        node_type: NodeType,
        tag_name: &str,
        value: Option<&str>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let index = self.nodes[parent.index()].children.len();

        let tag_name = match node_type {
            NodeType::Element => tag_name.to_ascii_lowercase(),
            _ => String::new(),
        };
        let mut data = NodeData::new(node_type, tag_name, value.map(str::to_string));
        data.parent = Some(parent);
        data.index = index;

        self.nodes.push(data);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Append an element under `parent`
    pub fn append_element(&mut self, parent: NodeId, tag_name: &str) -> NodeId {
        self.append_node(parent, NodeType::Element, tag_name, None)
    }

    /// Append an element with attributes under `parent`
    pub fn append_element_with_attrs(
        &mut self,
        parent: NodeId,
        tag_name: &str,
        attrs: &[(&str, &str)],
    ) -> NodeId {
        let id = self.append_element(parent, tag_name);
        for (name, value) in attrs {
            self.set_attr(id, name, value);
        }
        id
    }

    /// Append a text node under `parent`
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append_node(parent, NodeType::Text, "", Some(text))
    }

    /// Append a comment under `parent`
    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append_node(parent, NodeType::Comment, "", Some(text))
    }

    /// Set an attribute, replacing an existing one with the same name
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let attrs = &mut self.nodes[id.index()].attributes;

        if let Some(existing) = attrs.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            existing.1 = value.to_string();
        } else {
            attrs.push((name.to_string(), value.to_string()));
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// A read-only view of one node together with its document.
///
/// `NodeRef` is `Copy`; parent and sibling navigation go through the arena.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id.0)
            .field("name", &self.node_name())
            .finish()
    }
}

impl<'a> NodeRef<'a> {
    fn data(&self) -> &'a NodeData {
        &self.doc.nodes[self.id.index()]
    }

    fn at(&self, id: NodeId) -> NodeRef<'a> {
        NodeRef { doc: self.doc, id }
    }

    /// The node's id
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The document this node belongs to
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// The node's DOM type
    pub fn node_type(&self) -> NodeType {
        self.data().node_type
    }

    /// Interpret the node for conversion.
    ///
    /// Processing instructions and doctypes have no Markdown meaning and
    /// fail with [`RuledownError::UnsupportedNodeKind`].
    pub fn classify(&self) -> Result<NodeClass> {
        match self.node_type() {
            NodeType::Element => Ok(NodeClass::Element),
            NodeType::Text | NodeType::CData => Ok(NodeClass::Text),
            NodeType::Comment => Ok(NodeClass::Comment),
            NodeType::Document | NodeType::DocumentFragment => Ok(NodeClass::Container),
            other @ (NodeType::ProcessingInstruction | NodeType::Doctype) => {
                Err(RuledownError::UnsupportedNodeKind(other.code()))
            }
        }
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    /// Check if this is a text or CDATA node
    pub fn is_text(&self) -> bool {
        matches!(self.node_type(), NodeType::Text | NodeType::CData)
    }

    /// Get the tag name (lowercase, empty for non-elements)
    pub fn tag_name(&self) -> &'a str {
        &self.data().tag_name
    }

    /// DOM-style node name: the tag for elements, `#text` etc. otherwise
    pub fn node_name(&self) -> &'a str {
        match self.node_type() {
            NodeType::Element => self.tag_name(),
            NodeType::Text => "#text",
            NodeType::CData => "#cdata-section",
            NodeType::ProcessingInstruction => "#processing-instruction",
            NodeType::Comment => "#comment",
            NodeType::Document => "#document",
            NodeType::Doctype => "#doctype",
            NodeType::DocumentFragment => "#document-fragment",
        }
    }

    /// Check the element's tag name (case-insensitive)
    pub fn has_tag(&self, name: &str) -> bool {
        self.is_element() && self.tag_name().eq_ignore_ascii_case(name)
    }

    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.data()
            .attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if an attribute exists
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Iterate attributes in document order
    pub fn attributes(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.data()
            .attributes
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Raw text of a text-like or comment node
    pub fn text(&self) -> Option<&'a str> {
        self.data().value.as_deref()
    }

    /// Get all child nodes
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        self.data()
            .children
            .iter()
            .map(move |&id| NodeRef { doc, id })
    }

    /// Get only element children
    pub fn element_children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.children().filter(|n| n.is_element())
    }

    /// First child, if any
    pub fn first_child(&self) -> Option<NodeRef<'a>> {
        self.data().children.first().map(|&id| self.at(id))
    }

    /// The parent node; `None` for the root
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.data().parent.map(|id| self.at(id))
    }

    /// The sibling immediately before this node
    pub fn previous_sibling(&self) -> Option<NodeRef<'a>> {
        let index = self.data().index.checked_sub(1)?;
        let parent = self.parent()?;
        parent.data().children.get(index).map(|&id| self.at(id))
    }

    /// The sibling immediately after this node
    pub fn next_sibling(&self) -> Option<NodeRef<'a>> {
        let parent = self.parent()?;
        parent
            .data()
            .children
            .get(self.data().index + 1)
            .map(|&id| self.at(id))
    }

    /// The next sibling that is an element
    pub fn next_element_sibling(&self) -> Option<NodeRef<'a>> {
        let mut current = self.next_sibling();
        while let Some(node) = current {
            if node.is_element() {
                return Some(node);
            }
            current = node.next_sibling();
        }
        None
    }

    /// True if any other child of the parent is an element
    pub fn has_element_siblings(&self) -> bool {
        self.parent()
            .map(|p| p.element_children().any(|c| c.id != self.id))
            .unwrap_or(false)
    }

    /// First element child with the given tag
    pub fn find_child(&self, tag: &str) -> Option<NodeRef<'a>> {
        self.element_children().find(|c| c.has_tag(tag))
    }

    /// Check if this is a block-level element
    pub fn is_block(&self) -> bool {
        self.is_element() && is_block(self.tag_name())
    }

    /// Text and non-block elements
    pub fn is_inline(&self) -> bool {
        self.is_text() || (self.is_element() && !is_block(self.tag_name()))
    }

    /// Check if this is a void element
    pub fn is_void(&self) -> bool {
        self.is_element() && is_void(self.tag_name())
    }

    /// Elements that carry meaning even with no content (`<a>`, table parts, media)
    pub fn is_meaningful_when_blank(&self) -> bool {
        self.is_element() && is_meaningful_when_blank(self.tag_name())
    }

    /// True if any descendant is a void element
    pub fn has_void_descendant(&self) -> bool {
        self.any_descendant(&|n| n.is_void())
    }

    /// True if any descendant is meaningful when blank
    pub fn has_meaningful_descendant(&self) -> bool {
        self.any_descendant(&|n| n.is_meaningful_when_blank())
    }

    fn any_descendant(&self, predicate: &dyn Fn(&NodeRef<'a>) -> bool) -> bool {
        self.children()
            .any(|child| predicate(&child) || child.any_descendant(predicate))
    }

    /// True if this node is `<code>` or sits inside one
    pub fn is_code(&self) -> bool {
        let mut current = Some(*self);
        while let Some(node) = current {
            if node.has_tag("code") {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Get all text content from this node and descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self.node_type() {
            NodeType::Text | NodeType::CData => out.push_str(self.text().unwrap_or_default()),
            NodeType::Element | NodeType::Document | NodeType::DocumentFragment => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
            _ => {}
        }
    }

    /// Reconstruct outer HTML (for keep rules)
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Reconstruct inner HTML
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            child.write_html(&mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        match self.node_type() {
            NodeType::Text | NodeType::CData => {
                out.push_str(&escape_html(self.text().unwrap_or_default(), false));
            }
            NodeType::Comment => {
                out.push_str("<!--");
                out.push_str(self.text().unwrap_or_default());
                out.push_str("-->");
            }
            NodeType::Element => {
                let tag = self.tag_name();
                out.push('<');
                out.push_str(tag);
                for (name, value) in self.attributes() {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_html(value, true));
                        out.push('"');
                    }
                }
                out.push('>');

                if !is_void(tag) {
                    for child in self.children() {
                        child.write_html(out);
                    }
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
            }
            NodeType::Document | NodeType::DocumentFragment => {
                for child in self.children() {
                    child.write_html(out);
                }
            }
            NodeType::ProcessingInstruction | NodeType::Doctype => {}
        }
    }

    /// Short identity used in diagnostics, e.g. `<mark> (node 4)`
    pub fn describe(&self) -> String {
        match self.node_type() {
            NodeType::Element => format!("<{}> (node {})", self.tag_name(), self.id.0),
            _ => format!("{} (node {})", self.node_name(), self.id.0),
        }
    }
}

/// Escape text or an attribute value for HTML output
fn escape_html(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_element() {
        let mut doc = Document::new();
        let div = doc.append_element(NodeId::ROOT, "DIV");
        let node = doc.get(div).unwrap();
        assert!(node.is_element());
        assert_eq!(node.tag_name(), "div");
        assert!(node.has_tag("Div"));
        assert_eq!(node.parent().unwrap().id(), NodeId::ROOT);
    }

    #[test]
    fn test_create_text() {
        let mut doc = Document::new();
        let text = doc.append_text(NodeId::ROOT, "Hello World");
        let node = doc.get(text).unwrap();
        assert!(node.is_text());
        assert!(node.is_inline());
        assert_eq!(node.text_content(), "Hello World");
        assert_eq!(node.node_name(), "#text");
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::new();
        let a = doc.append_element_with_attrs(
            NodeId::ROOT,
            "a",
            &[("href", "https://example.com"), ("title", "Example")],
        );
        let node = doc.get(a).unwrap();
        assert_eq!(node.attr("href"), Some("https://example.com"));
        assert_eq!(node.attr("TITLE"), Some("Example"));
        assert_eq!(node.attr("class"), None);

        doc.set_attr(a, "Title", "Changed");
        let node = doc.get(a).unwrap();
        assert_eq!(node.attr("title"), Some("Changed"));
        assert_eq!(node.attributes().count(), 2);
    }

    #[test]
    fn test_siblings() {
        let mut doc = Document::new();
        let div = doc.append_element(NodeId::ROOT, "div");
        let first = doc.append_text(div, "Hello");
        let span = doc.append_element(div, "span");
        let last = doc.append_text(div, "World");

        let first = doc.get(first).unwrap();
        let span = doc.get(span).unwrap();
        let last = doc.get(last).unwrap();

        assert_eq!(first.next_sibling(), Some(span));
        assert_eq!(span.previous_sibling(), Some(first));
        assert_eq!(last.next_sibling(), None);
        assert_eq!(first.previous_sibling(), None);
        assert_eq!(first.next_element_sibling(), Some(span));
        assert!(!span.has_element_siblings());

        let div = doc.get(div).unwrap();
        assert_eq!(div.children().count(), 3);
        assert_eq!(div.element_children().count(), 1);
    }

    #[test]
    fn test_text_content_skips_comments() {
        let mut doc = Document::new();
        let div = doc.append_element(NodeId::ROOT, "div");
        doc.append_text(div, "Hello ");
        doc.append_comment(div, "ignored");
        let span = doc.append_element(div, "span");
        doc.append_text(span, "World");

        assert_eq!(doc.get(div).unwrap().text_content(), "Hello World");
    }

    #[test]
    fn test_is_code_through_ancestors() {
        let mut doc = Document::new();
        let code = doc.append_element(NodeId::ROOT, "code");
        let span = doc.append_element(code, "span");
        let text = doc.append_text(span, "x");

        assert!(doc.get(text).unwrap().is_code());
        assert!(!doc.root().is_code());
    }

    #[test]
    fn test_blank_predicates() {
        let mut doc = Document::new();
        let p = doc.append_element(NodeId::ROOT, "p");
        let span = doc.append_element(p, "span");
        doc.append_element(span, "img");

        let p = doc.get(p).unwrap();
        assert!(p.is_block());
        assert!(p.has_void_descendant());
        assert!(!p.has_meaningful_descendant());
        assert!(doc.get(span).unwrap().is_inline());
    }

    #[test]
    fn test_outer_html() {
        let mut doc = Document::new();
        let a = doc.append_element_with_attrs(NodeId::ROOT, "a", &[("href", "https://example.com")]);
        doc.append_text(a, "Link & more");

        assert_eq!(
            doc.get(a).unwrap().outer_html(),
            "<a href=\"https://example.com\">Link &amp; more</a>"
        );
    }

    #[test]
    fn test_void_element_html() {
        let mut doc = Document::new();
        let br = doc.append_element(NodeId::ROOT, "br");
        assert_eq!(doc.get(br).unwrap().outer_html(), "<br>");

        let img = doc.append_element_with_attrs(
            NodeId::ROOT,
            "img",
            &[("src", "test.png"), ("alt", "Test")],
        );
        assert_eq!(
            doc.get(img).unwrap().outer_html(),
            "<img src=\"test.png\" alt=\"Test\">"
        );
    }

    #[test]
    fn test_node_type_codes() {
        assert_eq!(NodeType::from_code(1).unwrap(), NodeType::Element);
        assert_eq!(NodeType::from_code(8).unwrap(), NodeType::Comment);
        assert!(matches!(
            NodeType::from_code(42),
            Err(RuledownError::UnsupportedNodeKind(42))
        ));
    }

    #[test]
    fn test_classify_unsupported() {
        let mut doc = Document::new();
        let pi = doc.append_node(
            NodeId::ROOT,
            NodeType::ProcessingInstruction,
            "",
            Some("xml version=\"1.0\""),
        );
        let node = doc.get(pi).unwrap();
        assert!(matches!(
            node.classify(),
            Err(RuledownError::UnsupportedNodeKind(7))
        ));
        assert_eq!(doc.root().classify().unwrap(), NodeClass::Container);
    }

    #[test]
    fn test_describe() {
        let mut doc = Document::new();
        let mark = doc.append_element(NodeId::ROOT, "mark");
        assert_eq!(doc.get(mark).unwrap().describe(), "<mark> (node 1)");
    }
}
