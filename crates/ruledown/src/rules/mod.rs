//! Rule registry for node-to-Markdown conversion.
//!
//! Resolution walks a fixed precedence order:
//!
//! 1. the blank rule, for blank non-void elements (after `keep_tags`, which
//!    the walker checks before resolution)
//! 2. custom rules, newest first
//! 3. built-in CommonMark rules that are not masked, in table order
//! 4. keep filters, then remove filters (newest first)
//! 5. the default rule
//!
//! The built-in table is built once per process and shared by every engine;
//! each [`Rules`] only stores its own custom layer and masks on top of it.
//! The blank, keep and default replacements can be swapped per registry.

mod commonmark;
mod rule;

pub use rule::{AppendFn, EscapeFn, Filter, FilterFn, ReplacementFn, Rule};

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::context::RenderContext;
use crate::node::NodeRef;
use crate::options::Options;

static COMMONMARK: Lazy<Vec<(&'static str, Rule)>> = Lazy::new(commonmark::rules);

static BLANK_RULE: Lazy<Rule> = Lazy::new(|| {
    Rule::new(Filter::predicate(|_, _, _| true), |node, _, _| {
        if node.is_block() {
            "\n\n".to_string()
        } else {
            String::new()
        }
    })
});

static KEEP_RULE: Lazy<Rule> = Lazy::new(|| {
    Rule::new(Filter::predicate(|_, _, _| true), |node, _, _| {
        if node.is_block() {
            format!("\n\n{}\n\n", node.outer_html())
        } else {
            node.outer_html()
        }
    })
});

static REMOVE_RULE: Lazy<Rule> = Lazy::new(|| {
    Rule::new(Filter::predicate(|_, _, _| true), |_, _, _| String::new())
        .with_drop(Filter::predicate(|_, _, _| true))
});

static DEFAULT_RULE: Lazy<Rule> = Lazy::new(|| {
    Rule::new(Filter::predicate(|_, _, _| true), |node, content, _| {
        if node.is_block() {
            format!("\n\n{content}\n\n")
        } else {
            content.to_string()
        }
    })
});

/// The rule chosen for a node, with the key it is known by
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'r> {
    /// Registry key, or `blank`/`keep`/`remove`/`default` for the fallbacks
    pub key: &'r str,
    pub rule: &'r Rule,
}

/// Collection of rules for conversion
#[derive(Clone, Default)]
pub struct Rules {
    /// Custom rules in registration order (the last entry wins)
    custom: IndexMap<String, Rule>,
    /// Built-in keys that were removed or shadowed
    masked: HashSet<String>,
    /// Keep filters (emit outer HTML)
    keep: Vec<Filter>,
    /// Remove filters (drop entirely)
    remove: Vec<Filter>,
    blank: Option<Rule>,
    keep_replacement: Option<Rule>,
    fallback: Option<Rule>,
    escape: Option<EscapeFn>,
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rules")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .field("masked", &self.masked)
            .field("keep", &self.keep)
            .field("remove", &self.remove)
            .field("blank", &self.blank.is_some())
            .field("keep_replacement", &self.keep_replacement.is_some())
            .field("fallback", &self.fallback.is_some())
            .field("escape", &self.escape.is_some())
            .finish()
    }
}

impl Rules {
    /// Create a registry holding only the built-in CommonMark rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule under `key`.
    ///
    /// An existing custom rule with the same key is replaced and the key
    /// becomes the newest. A key naming a built-in rule shadows it.
    pub fn add_rule(&mut self, key: impl Into<String>, rule: Rule) {
        let key = key.into();
        let replaced = self.custom.shift_remove(&key).is_some();

        if is_builtin(&key) {
            self.masked.insert(key.clone());
        }
        debug!(key = %key, replaced, "registered rule");
        self.custom.insert(key, rule);
    }

    /// Remove the rule registered under `key`, masking the built-in of the
    /// same name. Unknown keys are ignored.
    pub fn remove_rule(&mut self, key: &str) {
        let removed = self.custom.shift_remove(key).is_some();
        let masked = is_builtin(key) && self.masked.insert(key.to_string());

        if removed || masked {
            debug!(key, "removed rule");
        }
    }

    /// Keep elements matching the filter as HTML
    pub fn keep(&mut self, filter: Filter) {
        self.keep.push(filter);
    }

    /// Remove elements matching the filter
    pub fn remove(&mut self, filter: Filter) {
        self.remove.push(filter);
    }

    /// Replace the output of blank elements
    pub fn set_blank_replacement<F>(&mut self, replacement: F)
    where
        F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        self.blank = Some(Rule::new(Filter::predicate(|_, _, _| true), replacement));
        debug!("replaced blank replacement");
    }

    /// Replace the output of kept elements (keep filters and `keep_tags`)
    pub fn set_keep_replacement<F>(&mut self, replacement: F)
    where
        F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        self.keep_replacement = Some(Rule::new(Filter::predicate(|_, _, _| true), replacement));
        debug!("replaced keep replacement");
    }

    /// Replace the output of elements no rule matches
    pub fn set_default_replacement<F>(&mut self, replacement: F)
    where
        F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        self.fallback = Some(Rule::new(Filter::predicate(|_, _, _| true), replacement));
        debug!("replaced default replacement");
    }

    /// Escape text nodes with `escape` instead of the configured
    /// [`Escaping`](crate::Escaping) mode
    pub fn set_escape<F>(&mut self, escape: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.escape = Some(Arc::new(escape));
        debug!("replaced escape function");
    }

    /// Escape a text node's content
    pub fn escape(&self, text: &str, options: &Options) -> String {
        match &self.escape {
            Some(escape) => escape(text),
            None => options.escaping.apply(text),
        }
    }

    /// The rule rendering kept elements
    pub(crate) fn keep_rule(&self) -> &Rule {
        self.keep_replacement.as_ref().unwrap_or(&KEEP_RULE)
    }

    /// True if `key` names an active custom or built-in rule
    pub fn contains(&self, key: &str) -> bool {
        self.custom.contains_key(key) || (is_builtin(key) && !self.masked.contains(key))
    }

    /// Active rule keys in the order they are tried
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.ordered().map(|(key, _)| key)
    }

    /// Custom rules newest first, then the unmasked built-ins
    fn ordered(&self) -> impl Iterator<Item = (&str, &Rule)> + '_ {
        let custom = self
            .custom
            .iter()
            .rev()
            .map(|(key, rule)| (key.as_str(), rule));
        let builtin = COMMONMARK
            .iter()
            .filter(move |(key, _)| !self.masked.contains(*key))
            .map(|(key, rule)| (*key, rule));
        custom.chain(builtin)
    }

    /// Find the rule for an element
    pub fn resolve<'r>(&'r self, node: &NodeRef<'_>, ctx: &RenderContext<'_>) -> Resolved<'r> {
        let options = ctx.options();

        if is_blank(node, ctx) {
            return Resolved {
                key: "blank",
                rule: self.blank.as_ref().unwrap_or(&BLANK_RULE),
            };
        }

        if let Some((key, rule)) = self.ordered().find(|(_, rule)| rule.matches(node, options)) {
            return Resolved { key, rule };
        }

        if self.keep.iter().rev().any(|f| f.matches(node, options)) {
            return Resolved {
                key: "keep",
                rule: self.keep_rule(),
            };
        }

        if self.remove.iter().rev().any(|f| f.matches(node, options)) {
            return Resolved {
                key: "remove",
                rule: &REMOVE_RULE,
            };
        }

        Resolved {
            key: "default",
            rule: self.fallback.as_ref().unwrap_or(&DEFAULT_RULE),
        }
    }

    /// Rules with append hooks, in resolution order
    pub(crate) fn appends(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.ordered()
            .map(|(_, rule)| rule)
            .filter(|rule| rule.has_append())
    }
}

fn is_builtin(key: &str) -> bool {
    COMMONMARK.iter().any(|(k, _)| *k == key)
}

/// Blank: not void, not meaningful when blank, whitespace-only visible text,
/// and no void or meaningful descendants
fn is_blank(node: &NodeRef<'_>, ctx: &RenderContext<'_>) -> bool {
    if node.is_void() || node.is_meaningful_when_blank() {
        return false;
    }
    if !ctx.text_content(*node).chars().all(char::is_whitespace) {
        return false;
    }
    !node.has_void_descendant() && !node.has_meaningful_descendant()
}

/// Capability handed to plugins: registration only.
///
/// Plugins never see the engine itself; the engine applies a plugin to a
/// staged copy of its registry and keeps the copy only if the plugin succeeds.
pub struct Registrar<'a> {
    rules: &'a mut Rules,
}

impl<'a> Registrar<'a> {
    pub(crate) fn new(rules: &'a mut Rules) -> Self {
        Self { rules }
    }

    /// Register a rule under `key`
    pub fn add_rule(&mut self, key: impl Into<String>, rule: Rule) -> &mut Self {
        self.rules.add_rule(key, rule);
        self
    }

    /// Remove (or mask) the rule registered under `key`
    pub fn remove_rule(&mut self, key: &str) -> &mut Self {
        self.rules.remove_rule(key);
        self
    }

    /// Keep elements matching the filter as HTML
    pub fn keep(&mut self, filter: Filter) -> &mut Self {
        self.rules.keep(filter);
        self
    }

    /// Remove elements matching the filter
    pub fn remove(&mut self, filter: Filter) -> &mut Self {
        self.rules.remove(filter);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collapse::Collapsed;
    use crate::node::{Document, NodeId};
    use crate::options::Options;

    fn resolve_key(rules: &Rules, doc: &Document, id: NodeId) -> String {
        let options = Options::default();
        let ctx = RenderContext::new(&options, Collapsed::collapse(doc.root(), false));
        rules.resolve(&doc.get(id).unwrap(), &ctx).key.to_string()
    }

    fn paragraph() -> (Document, NodeId) {
        let mut doc = Document::new();
        let p = doc.append_element(NodeId::ROOT, "p");
        doc.append_text(p, "text");
        (doc, p)
    }

    #[test]
    fn test_builtin_resolution_is_deterministic() {
        let rules = Rules::new();
        let (doc, p) = paragraph();
        let first = resolve_key(&rules, &doc, p);
        for _ in 0..3 {
            assert_eq!(resolve_key(&rules, &doc, p), first);
        }
        assert_eq!(first, "paragraph");
    }

    #[test]
    fn test_custom_rule_shadows_builtin() {
        let mut rules = Rules::new();
        rules.add_rule("my_paragraph", Rule::for_tag("p", |_, c, _| c.to_string()));
        let (doc, p) = paragraph();
        assert_eq!(resolve_key(&rules, &doc, p), "my_paragraph");
    }

    #[test]
    fn test_newest_custom_rule_wins() {
        let mut rules = Rules::new();
        rules.add_rule("first", Rule::for_tag("p", |_, c, _| c.to_string()));
        rules.add_rule("second", Rule::for_tag("p", |_, c, _| c.to_string()));
        let (doc, p) = paragraph();
        assert_eq!(resolve_key(&rules, &doc, p), "second");

        // Re-registering moves the key to the newest position
        rules.add_rule("first", Rule::for_tag("p", |_, c, _| c.to_string()));
        assert_eq!(resolve_key(&rules, &doc, p), "first");
        assert_eq!(rules.keys().take(2).collect::<Vec<_>>(), ["first", "second"]);
    }

    #[test]
    fn test_same_key_masks_builtin() {
        let mut rules = Rules::new();
        rules.add_rule("paragraph", Rule::for_tag("div", |_, c, _| c.to_string()));
        let (doc, p) = paragraph();
        assert_eq!(resolve_key(&rules, &doc, p), "default");
        assert_eq!(rules.keys().filter(|k| *k == "paragraph").count(), 1);
    }

    #[test]
    fn test_remove_rule_masks_builtin() {
        let mut rules = Rules::new();
        assert!(rules.contains("paragraph"));
        rules.remove_rule("paragraph");
        assert!(!rules.contains("paragraph"));
        rules.remove_rule("does_not_exist");

        let (doc, p) = paragraph();
        assert_eq!(resolve_key(&rules, &doc, p), "default");
    }

    #[test]
    fn test_blank_comes_first() {
        let mut rules = Rules::new();
        rules.add_rule("any_p", Rule::for_tag("p", |_, c, _| c.to_string()));
        let mut doc = Document::new();
        let p = doc.append_element(NodeId::ROOT, "p");
        doc.append_text(p, "  ");
        assert_eq!(resolve_key(&rules, &doc, p), "blank");

        let a = doc.append_element(NodeId::ROOT, "a");
        let br = doc.append_element(NodeId::ROOT, "br");
        assert_ne!(resolve_key(&rules, &doc, a), "blank");
        assert_ne!(resolve_key(&rules, &doc, br), "blank");
    }

    #[test]
    fn test_keep_and_remove_fallbacks() {
        let mut rules = Rules::new();
        rules.keep(Filter::tag("del"));
        rules.remove(Filter::tags(&["del", "script"]));

        let mut doc = Document::new();
        let del = doc.append_element(NodeId::ROOT, "del");
        doc.append_text(del, "gone");
        let script = doc.append_element(NodeId::ROOT, "script");
        doc.append_text(script, "alert(1)");
        let span = doc.append_element(NodeId::ROOT, "span");
        doc.append_text(span, "plain");

        assert_eq!(resolve_key(&rules, &doc, del), "keep");
        assert_eq!(resolve_key(&rules, &doc, script), "remove");
        assert_eq!(resolve_key(&rules, &doc, span), "default");
    }

    fn render_with(rules: &Rules, doc: &Document, id: NodeId) -> String {
        let options = Options::default();
        let mut ctx = RenderContext::new(&options, Collapsed::collapse(doc.root(), false));
        let node = doc.get(id).unwrap();
        let resolved = rules.resolve(&node, &ctx);
        resolved.rule.render(&node, "content", &mut ctx).unwrap()
    }

    #[test]
    fn test_fallback_replacements_can_be_overridden() {
        let mut doc = Document::new();
        let empty = doc.append_element(NodeId::ROOT, "div");
        let del = doc.append_element(NodeId::ROOT, "del");
        doc.append_text(del, "x");
        let span = doc.append_element(NodeId::ROOT, "span");
        doc.append_text(span, "y");

        let mut rules = Rules::new();
        rules.keep(Filter::tag("del"));
        assert_eq!(render_with(&rules, &doc, empty), "\n\n");
        assert_eq!(render_with(&rules, &doc, del), "<del>x</del>");
        assert_eq!(render_with(&rules, &doc, span), "content");

        rules.set_blank_replacement(|node, _, _| format!("[blank {}]", node.tag_name()));
        rules.set_keep_replacement(|_, content, _| format!("~~{content}~~"));
        rules.set_default_replacement(|node, content, _| format!("<{}>{content}", node.tag_name()));

        assert_eq!(resolve_key(&rules, &doc, empty), "blank");
        assert_eq!(render_with(&rules, &doc, empty), "[blank div]");
        assert_eq!(render_with(&rules, &doc, del), "~~content~~");
        assert_eq!(render_with(&rules, &doc, span), "<span>content");
    }

    #[test]
    fn test_escape_override() {
        let options = Options::default();
        let mut rules = Rules::new();
        assert_eq!(rules.escape("*a*", &options), "\\*a\\*");

        rules.set_escape(|text| text.replace('*', "&ast;"));
        assert_eq!(rules.escape("*a*", &options), "&ast;a&ast;");
        assert!(format!("{rules:?}").contains("escape: true"));
    }

    #[test]
    fn test_registrar_writes_through() {
        let mut rules = Rules::new();
        Registrar::new(&mut rules)
            .add_rule("mark", Rule::for_tag("mark", |_, c, _| format!("=={c}==")))
            .remove_rule("image");
        assert!(rules.contains("mark"));
        assert!(!rules.contains("image"));
    }
}
