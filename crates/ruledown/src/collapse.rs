//! Whitespace collapsing pre-pass.
//!
//! HTML renders runs of ASCII whitespace as a single space and ignores
//! whitespace at block boundaries. Before walking, the tree is scanned in
//! document order and the visible text of every text node is recorded, along
//! with the nodes that vanish entirely (whitespace-only text, comments and
//! other non-element nodes). The document itself is never mutated.
//!
//! `<pre>` subtrees (and `<code>` when code is treated as preformatted) are
//! skipped and keep their raw text.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{NodeId, NodeRef};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \r\n\t]+").unwrap());

/// Outcome of collapsing whitespace under one root
#[derive(Debug, Default, Clone)]
pub(crate) struct Collapsed {
    text: HashMap<NodeId, String>,
    omitted: HashSet<NodeId>,
}

fn is_pre(node: NodeRef<'_>, code_as_pre: bool) -> bool {
    node.has_tag("pre") || (code_as_pre && node.has_tag("code"))
}

/// Next node in document order, not descending into `<pre>` or back into the
/// subtree we just left.
fn next_node<'a>(
    prev: Option<NodeRef<'a>>,
    current: NodeRef<'a>,
    code_as_pre: bool,
) -> Option<NodeRef<'a>> {
    let left_child = prev.and_then(|p| p.parent()) == Some(current);

    if left_child || is_pre(current, code_as_pre) {
        return current.next_sibling().or_else(|| current.parent());
    }

    current
        .first_child()
        .or_else(|| current.next_sibling())
        .or_else(|| current.parent())
}

/// The node that follows `node` once it is treated as removed
fn after_removal(node: NodeRef<'_>) -> Option<NodeRef<'_>> {
    node.next_sibling().or_else(|| node.parent())
}

impl Collapsed {
    /// Collapse whitespace below `root`
    pub(crate) fn collapse(root: NodeRef<'_>, code_as_pre: bool) -> Self {
        let mut result = Collapsed::default();

        if is_pre(root, code_as_pre) || root.first_child().is_none() {
            return result;
        }

        let mut prev_text: Option<NodeId> = None;
        let mut keep_leading_whitespace = false;
        let mut prev: Option<NodeRef<'_>> = None;
        let mut current = next_node(prev, root, code_as_pre);

        while let Some(node) = current {
            if node == root {
                break;
            }

            if node.is_text() {
                let raw = node.text().unwrap_or_default();
                let mut text = WHITESPACE_RUN.replace_all(raw, " ").into_owned();

                let prev_ended_with_space = prev_text
                    .and_then(|id| result.text.get(&id))
                    .is_some_and(|t| t.ends_with(' '));

                if (prev_text.is_none() || prev_ended_with_space)
                    && !keep_leading_whitespace
                    && text.starts_with(' ')
                {
                    text.remove(0);
                }

                if text.is_empty() {
                    result.omitted.insert(node.id());
                    prev = Some(node);
                    current = after_removal(node);
                    continue;
                }

                result.text.insert(node.id(), text);
                prev_text = Some(node.id());
            } else if node.is_element() {
                if node.is_block() || node.has_tag("br") {
                    if let Some(id) = prev_text.take() {
                        result.trim_trailing_space(id);
                    }
                    keep_leading_whitespace = false;
                } else if node.is_void() || is_pre(node, code_as_pre) {
                    prev_text = None;
                    keep_leading_whitespace = true;
                } else if prev_text.is_some() {
                    keep_leading_whitespace = false;
                }
            } else {
                result.omitted.insert(node.id());
                prev = Some(node);
                current = after_removal(node);
                continue;
            }

            let next = next_node(prev, node, code_as_pre);
            prev = Some(node);
            current = next;
        }

        if let Some(id) = prev_text {
            result.trim_trailing_space(id);
        }

        result
    }

    fn trim_trailing_space(&mut self, id: NodeId) {
        if let Some(text) = self.text.get_mut(&id) {
            if text.ends_with(' ') {
                text.pop();
                if text.is_empty() {
                    self.omitted.insert(id);
                }
            }
        }
    }

    /// True if the node disappeared during collapsing
    pub(crate) fn is_omitted(&self, id: NodeId) -> bool {
        self.omitted.contains(&id)
    }

    /// Visible text of a text node: collapsed where collapsing applied,
    /// raw inside preformatted subtrees
    pub(crate) fn text<'s>(&'s self, node: NodeRef<'s>) -> &'s str {
        if self.omitted.contains(&node.id()) {
            return "";
        }
        match self.text.get(&node.id()) {
            Some(text) => text,
            None => node.text().unwrap_or_default(),
        }
    }

    /// Children that survived collapsing
    pub(crate) fn children<'s>(
        &'s self,
        node: NodeRef<'s>,
    ) -> impl Iterator<Item = NodeRef<'s>> + 's {
        node.children().filter(move |c| !self.is_omitted(c.id()))
    }

    pub(crate) fn previous_sibling<'s>(&self, node: NodeRef<'s>) -> Option<NodeRef<'s>> {
        let mut current = node.previous_sibling();
        while let Some(sibling) = current {
            if !self.is_omitted(sibling.id()) {
                return Some(sibling);
            }
            current = sibling.previous_sibling();
        }
        None
    }

    pub(crate) fn next_sibling<'s>(&self, node: NodeRef<'s>) -> Option<NodeRef<'s>> {
        let mut current = node.next_sibling();
        while let Some(sibling) = current {
            if !self.is_omitted(sibling.id()) {
                return Some(sibling);
            }
            current = sibling.next_sibling();
        }
        None
    }

    /// Concatenated visible text of a subtree
    pub(crate) fn text_content(&self, node: NodeRef<'_>) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeRef<'_>, out: &mut String) {
        if self.is_omitted(node.id()) {
            return;
        }
        if node.is_text() {
            out.push_str(self.text(node));
            return;
        }
        for child in node.children() {
            self.collect_text(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Document;

    fn visible(doc: &Document, code_as_pre: bool) -> String {
        let collapsed = Collapsed::collapse(doc.root(), code_as_pre);
        collapsed.text_content(doc.root())
    }

    #[test]
    fn test_runs_collapse_to_single_space() {
        let mut doc = Document::new();
        let p = doc.append_element(NodeId::ROOT, "p");
        doc.append_text(p, "  Hello \n\t  World  ");

        assert_eq!(visible(&doc, false), "Hello World");
    }

    #[test]
    fn test_space_between_inline_elements_survives() {
        let mut doc = Document::new();
        let p = doc.append_element(NodeId::ROOT, "p");
        let em = doc.append_element(p, "em");
        doc.append_text(em, "a ");
        doc.append_text(p, " b");

        let collapsed = Collapsed::collapse(doc.root(), false);
        assert_eq!(collapsed.text_content(doc.root()), "a b");
    }

    #[test]
    fn test_whitespace_only_text_between_blocks_is_omitted() {
        let mut doc = Document::new();
        let ul = doc.append_element(NodeId::ROOT, "ul");
        let first = doc.append_element(ul, "li");
        doc.append_text(first, "one");
        let gap = doc.append_text(ul, "\n  ");
        let second = doc.append_element(ul, "li");
        doc.append_text(second, "two");

        let collapsed = Collapsed::collapse(doc.root(), false);
        assert!(collapsed.is_omitted(gap));

        let first = doc.get(first).unwrap();
        assert_eq!(collapsed.next_sibling(first).map(|n| n.id()), Some(second));
        assert_eq!(collapsed.children(doc.get(ul).unwrap()).count(), 2);
    }

    #[test]
    fn test_only_child_whitespace_terminates() {
        let mut doc = Document::new();
        let p = doc.append_element(NodeId::ROOT, "p");
        let text = doc.append_text(p, "   ");
        doc.append_element(NodeId::ROOT, "p");

        let collapsed = Collapsed::collapse(doc.root(), false);
        assert!(collapsed.is_omitted(text));
    }

    #[test]
    fn test_comments_are_omitted() {
        let mut doc = Document::new();
        let p = doc.append_element(NodeId::ROOT, "p");
        let comment = doc.append_comment(p, "note");
        doc.append_text(p, "text");

        let collapsed = Collapsed::collapse(doc.root(), false);
        assert!(collapsed.is_omitted(comment));
    }

    #[test]
    fn test_pre_is_left_verbatim() {
        let mut doc = Document::new();
        let pre = doc.append_element(NodeId::ROOT, "pre");
        let code = doc.append_text(pre, "  keep\n   this  ");

        let collapsed = Collapsed::collapse(doc.root(), false);
        assert_eq!(collapsed.text(doc.get(code).unwrap()), "  keep\n   this  ");
    }

    #[test]
    fn test_code_as_pre() {
        let mut doc = Document::new();
        let p = doc.append_element(NodeId::ROOT, "p");
        let code = doc.append_element(p, "code");
        doc.append_text(code, "a   b");

        assert_eq!(visible(&doc, false), "a b");
        assert_eq!(visible(&doc, true), "a   b");
    }

    #[test]
    fn test_void_element_keeps_following_space() {
        let mut doc = Document::new();
        let p = doc.append_element(NodeId::ROOT, "p");
        doc.append_text(p, "a ");
        doc.append_element(p, "img");
        doc.append_text(p, " b");

        assert_eq!(visible(&doc, false), "a  b");
    }

    #[test]
    fn test_br_trims_preceding_space() {
        let mut doc = Document::new();
        let p = doc.append_element(NodeId::ROOT, "p");
        doc.append_text(p, "line ");
        doc.append_element(p, "br");
        doc.append_text(p, " next");

        assert_eq!(visible(&doc, false), "linenext");
    }
}
