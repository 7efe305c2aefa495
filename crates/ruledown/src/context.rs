//! Per-conversion render state.

use crate::collapse::Collapsed;
use crate::node::NodeRef;
use crate::options::Options;

#[derive(Debug, Clone, Copy)]
struct ListFrame {
    ordered: bool,
}

/// Transient state threaded through one conversion.
///
/// A fresh context is created for every `convert*` call and dropped when it
/// returns. Rules receive it mutably, so they can read the list and quote
/// nesting of the node being rendered and stash link reference definitions.
#[derive(Debug)]
pub struct RenderContext<'a> {
    options: &'a Options,
    collapsed: Collapsed,
    lists: Vec<ListFrame>,
    /// Ordinal of each open `<li>`; `None` unless its parent is an `<ol>`
    items: Vec<Option<i64>>,
    blockquote_depth: usize,
    code_depth: usize,
    pre_depth: usize,
    references: Vec<String>,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(options: &'a Options, collapsed: Collapsed) -> Self {
        Self {
            options,
            collapsed,
            lists: Vec::new(),
            items: Vec::new(),
            blockquote_depth: 0,
            code_depth: 0,
            pre_depth: 0,
            references: Vec::new(),
        }
    }

    /// Options of the running conversion
    pub fn options(&self) -> &'a Options {
        self.options
    }

    /// Number of lists currently open
    pub fn list_depth(&self) -> usize {
        self.lists.len()
    }

    /// Whether the innermost open list is ordered
    pub fn in_ordered_list(&self) -> bool {
        self.lists.last().is_some_and(|frame| frame.ordered)
    }

    /// Ordinal of the innermost open list item of an ordered list
    pub fn item_ordinal(&self) -> Option<i64> {
        self.items.last().copied().flatten()
    }

    /// Number of open `<blockquote>` elements, for custom rules
    pub fn blockquote_depth(&self) -> usize {
        self.blockquote_depth
    }

    /// True while rendering inside `<code>`, for custom rules
    pub fn in_code(&self) -> bool {
        self.code_depth > 0
    }

    /// True while rendering inside `<pre>`; text here is kept verbatim by
    /// the normalizer
    pub fn in_pre(&self) -> bool {
        self.pre_depth > 0
    }

    /// Visible text of a subtree, after whitespace collapsing
    pub fn text_content(&self, node: NodeRef<'_>) -> String {
        self.collapsed.text_content(node)
    }

    /// Next sibling that survived whitespace collapsing
    pub fn next_sibling<'n>(&self, node: NodeRef<'n>) -> Option<NodeRef<'n>> {
        self.collapsed.next_sibling(node)
    }

    /// Previous sibling that survived whitespace collapsing
    pub fn previous_sibling<'n>(&self, node: NodeRef<'n>) -> Option<NodeRef<'n>> {
        self.collapsed.previous_sibling(node)
    }

    /// Record a link reference definition and return how many are stored
    pub fn add_reference(&mut self, definition: String) -> usize {
        self.references.push(definition);
        self.references.len()
    }

    /// Number of reference definitions recorded so far
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Drain the recorded reference definitions
    pub fn take_references(&mut self) -> Vec<String> {
        std::mem::take(&mut self.references)
    }

    pub(crate) fn collapsed(&self) -> &Collapsed {
        &self.collapsed
    }

    /// Push nesting state for `node` before its children render
    pub(crate) fn enter(&mut self, node: NodeRef<'_>) {
        match node.tag_name() {
            "ul" => self.lists.push(ListFrame { ordered: false }),
            "ol" => self.lists.push(ListFrame { ordered: true }),
            "li" => self.items.push(item_ordinal(node)),
            "blockquote" => self.blockquote_depth += 1,
            "code" => self.code_depth += 1,
            "pre" => self.pre_depth += 1,
            _ => {}
        }
    }

    /// Pop the state pushed by [`enter`](Self::enter)
    pub(crate) fn leave(&mut self, node: NodeRef<'_>) {
        match node.tag_name() {
            "ul" | "ol" => {
                self.lists.pop();
            }
            "li" => {
                self.items.pop();
            }
            "blockquote" => self.blockquote_depth = self.blockquote_depth.saturating_sub(1),
            "code" => self.code_depth = self.code_depth.saturating_sub(1),
            "pre" => self.pre_depth = self.pre_depth.saturating_sub(1),
            _ => {}
        }
    }
}

/// `start` plus the item's position among the list's element children
fn item_ordinal(item: NodeRef<'_>) -> Option<i64> {
    let list = item.parent().filter(|p| p.has_tag("ol"))?;
    let start = list.attr("start").and_then(parse_start).unwrap_or(1);
    let index = list
        .element_children()
        .position(|child| child == item)
        .unwrap_or(0);
    Some(start.saturating_add(index as i64))
}

/// Leading integer of a `start` attribute, like `"-2"` or `"7th"`
fn parse_start(value: &str) -> Option<i64> {
    let value = value.trim();
    let sign_len = usize::from(value.starts_with(&['-', '+'][..]));
    let digits = value[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(value.len(), |end| sign_len + end);
    value[..digits].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Document, NodeId};

    fn context(options: &Options) -> RenderContext<'_> {
        RenderContext::new(options, Collapsed::default())
    }

    #[test]
    fn test_ordered_items_count_from_start() {
        let mut doc = Document::new();
        let ol = doc.append_element_with_attrs(NodeId::ROOT, "ol", &[("start", "3")]);
        let first = doc.append_element(ol, "li");
        let second = doc.append_element(ol, "li");

        let options = Options::default();
        let mut ctx = context(&options);
        let ol = doc.get(ol).unwrap();

        ctx.enter(ol);
        ctx.enter(doc.get(first).unwrap());
        assert_eq!(ctx.item_ordinal(), Some(3));
        ctx.leave(doc.get(first).unwrap());
        ctx.enter(doc.get(second).unwrap());
        assert_eq!(ctx.item_ordinal(), Some(4));
        ctx.leave(doc.get(second).unwrap());
        ctx.leave(ol);

        assert_eq!(ctx.list_depth(), 0);
    }

    #[test]
    fn test_invalid_start_defaults_to_one() {
        let mut doc = Document::new();
        let ol = doc.append_element_with_attrs(NodeId::ROOT, "ol", &[("start", "abc")]);
        let li = doc.append_element(ol, "li");

        let options = Options::default();
        let mut ctx = context(&options);
        ctx.enter(doc.get(ol).unwrap());
        ctx.enter(doc.get(li).unwrap());
        assert_eq!(ctx.item_ordinal(), Some(1));
    }

    #[test]
    fn test_negative_start() {
        let mut doc = Document::new();
        let ol = doc.append_element_with_attrs(NodeId::ROOT, "ol", &[("start", "-2")]);
        let first = doc.append_element(ol, "li");
        let second = doc.append_element(ol, "li");

        let options = Options::default();
        let mut ctx = context(&options);
        ctx.enter(doc.get(ol).unwrap());
        ctx.enter(doc.get(first).unwrap());
        assert_eq!(ctx.item_ordinal(), Some(-2));
        ctx.leave(doc.get(first).unwrap());
        ctx.enter(doc.get(second).unwrap());
        assert_eq!(ctx.item_ordinal(), Some(-1));
    }

    #[test]
    fn test_ordinal_counts_every_element_child() {
        let mut doc = Document::new();
        let ol = doc.append_element(NodeId::ROOT, "ol");
        doc.append_element(ol, "li");
        doc.append_text(ol, " ");
        doc.append_element(ol, "div");
        let last = doc.append_element(ol, "li");

        let options = Options::default();
        let mut ctx = context(&options);
        ctx.enter(doc.get(ol).unwrap());
        ctx.enter(doc.get(last).unwrap());
        assert_eq!(ctx.item_ordinal(), Some(3));
    }

    #[test]
    fn test_parse_start() {
        assert_eq!(parse_start(" 7 "), Some(7));
        assert_eq!(parse_start("+4"), Some(4));
        assert_eq!(parse_start("12th"), Some(12));
        assert_eq!(parse_start("-"), None);
        assert_eq!(parse_start(""), None);
    }

    #[test]
    fn test_nesting_hooks() {
        let mut doc = Document::new();
        let quote = doc.append_element(NodeId::ROOT, "blockquote");
        let pre = doc.append_element(quote, "pre");
        let code = doc.append_element(pre, "code");

        let options = Options::default();
        let mut ctx = context(&options);
        for id in [quote, pre, code] {
            ctx.enter(doc.get(id).unwrap());
        }
        assert_eq!(ctx.blockquote_depth(), 1);
        assert!(ctx.in_pre());
        assert!(ctx.in_code());

        for id in [code, pre, quote] {
            ctx.leave(doc.get(id).unwrap());
        }
        assert_eq!(ctx.blockquote_depth(), 0);
        assert!(!ctx.in_pre());
        assert!(!ctx.in_code());
    }

    #[test]
    fn test_nested_list_restarts() {
        let mut doc = Document::new();
        let ol = doc.append_element(NodeId::ROOT, "ol");
        let outer = doc.append_element(ol, "li");
        let ul = doc.append_element(outer, "ul");
        let bullet = doc.append_element(ul, "li");
        let inner_ol = doc.append_element(bullet, "ol");
        let inner = doc.append_element(inner_ol, "li");

        let options = Options::default();
        let mut ctx = context(&options);
        for id in [ol, outer, ul, bullet] {
            ctx.enter(doc.get(id).unwrap());
        }
        assert!(!ctx.in_ordered_list());
        assert_eq!(ctx.item_ordinal(), None);

        ctx.enter(doc.get(inner_ol).unwrap());
        ctx.enter(doc.get(inner).unwrap());
        assert_eq!(ctx.item_ordinal(), Some(1));
        assert_eq!(ctx.list_depth(), 3);
    }

    #[test]
    fn test_references() {
        let options = Options::default();
        let mut ctx = context(&options);
        assert_eq!(ctx.add_reference("[1]: /a".to_string()), 1);
        assert_eq!(ctx.add_reference("[2]: /b".to_string()), 2);
        assert_eq!(ctx.take_references().len(), 2);
        assert_eq!(ctx.reference_count(), 0);
    }
}
