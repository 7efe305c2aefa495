//! HTML parsing support.
//!
//! Parses an HTML string with scraper (html5ever) and copies the tree into
//! the engine's [`Document`] arena. The adapter only builds the tree; it
//! takes no part in conversion.

use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::node::{Document, NodeId, NodeType};

/// Parse an HTML fragment into a [`Document`].
///
/// The fragment's top-level nodes become children of the document root.
///
/// # Example
///
/// ```rust
/// use ruledown::{parse_html, Engine};
///
/// let doc = parse_html("<h1>Hello <em>World</em></h1>");
///
/// let engine = Engine::new();
/// let markdown = engine.convert(&doc).unwrap();
/// assert_eq!(markdown, "Hello _World_\n=============");
/// ```
pub fn parse_html(html: &str) -> Document {
    let fragment = Html::parse_fragment(html);
    let mut document = Document::new();
    copy_children(fragment.root_element(), &mut document, NodeId::ROOT);
    document
}

/// Copy the children of a scraper element under `parent`
fn copy_children(element: ElementRef<'_>, document: &mut Document, parent: NodeId) {
    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => {
                document.append_text(parent, &text.text);
            }
            ScraperNode::Comment(comment) => {
                document.append_comment(parent, &comment.comment);
            }
            ScraperNode::ProcessingInstruction(pi) => {
                document.append_node(
                    parent,
                    NodeType::ProcessingInstruction,
                    "",
                    Some(&*pi.data),
                );
            }
            ScraperNode::Element(el) => {
                let id = document.append_element(parent, el.name());
                for (name, value) in el.attrs() {
                    document.set_attr(id, name, value);
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    copy_children(child_element, document, id);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_html() {
        let doc = parse_html("<p>Hello World</p>");
        let p = doc.root().first_child().unwrap();
        assert!(p.is_element());
        assert_eq!(p.tag_name(), "p");
        assert_eq!(p.text_content(), "Hello World");
    }

    #[test]
    fn test_parse_attributes_and_comments() {
        let doc = parse_html(r#"<a href="/x" title="T">link</a><!-- note -->"#);
        let mut children = doc.root().children();

        let a = children.next().unwrap();
        assert_eq!(a.attr("href"), Some("/x"));
        assert_eq!(a.attr("title"), Some("T"));

        let comment = children.next().unwrap();
        assert_eq!(comment.node_type(), NodeType::Comment);
        assert_eq!(comment.text(), Some(" note "));
    }

    #[test]
    fn test_entities_are_decoded() {
        let doc = parse_html("<p>1 &lt; 2&nbsp;3</p>");
        assert_eq!(doc.root().text_content(), "1 < 2\u{a0}3");
    }
}
