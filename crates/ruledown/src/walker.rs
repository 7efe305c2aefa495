//! Depth-first renderer: resolves a rule per element, renders children
//! first and joins the fragments.

use tracing::{trace, warn};

use crate::context::RenderContext;
use crate::node::{NodeClass, NodeRef};
use crate::normalize::{join_chunks, verbatim};
use crate::rules::{Rule, Rules};
use crate::utilities::is_ascii_space;
use crate::{Result, RuledownError};

/// Walks one document with a fixed registry and a per-call context
pub(crate) struct Walker<'r, 'c, 'o> {
    rules: &'r Rules,
    ctx: &'c mut RenderContext<'o>,
}

impl<'r, 'c, 'o> Walker<'r, 'c, 'o> {
    pub(crate) fn new(rules: &'r Rules, ctx: &'c mut RenderContext<'o>) -> Self {
        Self { rules, ctx }
    }

    /// Render `root`: documents and fragments render their children, any
    /// other node renders itself
    pub(crate) fn render_root(&mut self, root: NodeRef<'_>) -> Result<String> {
        match root.classify() {
            Ok(NodeClass::Container) => self.process_children(root),
            _ => self.process_node(root),
        }
    }

    /// Output of every append hook, joined onto `output`
    pub(crate) fn run_appends(&mut self, output: String) -> String {
        let mut output = output;
        for rule in self.rules.appends() {
            if let Some(extra) = rule.append(self.ctx) {
                if !extra.is_empty() {
                    output = join_chunks(&output, &extra);
                }
            }
        }
        output
    }

    fn process_children(&mut self, parent: NodeRef<'_>) -> Result<String> {
        let mut output = String::new();
        for child in parent.children() {
            if self.ctx.collapsed().is_omitted(child.id()) {
                continue;
            }
            let chunk = self.process_node(child)?;
            output = join_chunks(&output, &chunk);
        }
        Ok(output)
    }

    fn process_node(&mut self, node: NodeRef<'_>) -> Result<String> {
        match node.classify() {
            Ok(NodeClass::Text) => {
                let text = self.ctx.collapsed().text(node);
                if node.is_code() {
                    return Ok(text.to_string());
                }
                let escaped = self.rules.escape(text, self.ctx.options());
                if self.ctx.in_pre() {
                    Ok(verbatim(&escaped))
                } else {
                    Ok(escaped)
                }
            }
            Ok(NodeClass::Element) => self.replacement_for_node(node),
            Ok(NodeClass::Container) => self.process_children(node),
            Ok(NodeClass::Comment) => Ok(String::new()),
            Err(RuledownError::UnsupportedNodeKind(kind)) => {
                trace!(kind, node = %node.describe(), "skipping unsupported node");
                Ok(String::new())
            }
            Err(err) => Err(err),
        }
    }

    fn replacement_for_node(&mut self, node: NodeRef<'_>) -> Result<String> {
        let rules = self.rules;
        let options = self.ctx.options();
        if options.keep_tags.iter().any(|tag| node.has_tag(tag)) {
            return self.render_with(node, "keep", rules.keep_rule(), &Flanking::default());
        }

        let resolved = rules.resolve(&node, self.ctx);
        let flanking = self.flanking_whitespace(node);

        if resolved.rule.drops(&node, options) {
            return Ok(format!("{}{}", flanking.leading, flanking.trailing));
        }

        self.render_with(node, resolved.key, resolved.rule, &flanking)
    }

    /// Render children, then `rule`, wrapped in the hoisted whitespace
    fn render_with(
        &mut self,
        node: NodeRef<'_>,
        key: &str,
        rule: &Rule,
        flanking: &Flanking,
    ) -> Result<String> {
        self.ctx.enter(node);
        let content = self.process_children(node);
        let rendered = content.and_then(|content| {
            let content = if flanking.is_empty() {
                content.as_str()
            } else {
                content.trim()
            };
            rule.render(&node, content, self.ctx).map_err(|source| {
                warn!(rule = key, node = %node.describe(), error = %source, "rule failed");
                RuledownError::RuleRender {
                    rule: key.to_string(),
                    node: node.describe(),
                    source,
                }
            })
        });
        self.ctx.leave(node);

        Ok(format!(
            "{}{}{}",
            flanking.leading,
            rendered?,
            flanking.trailing
        ))
    }

    /// Leading and trailing whitespace of an inline node, hoisted outside
    /// its rendered form. ASCII whitespace is dropped on a side where the
    /// neighbouring sibling already supplies a space.
    fn flanking_whitespace(&self, node: NodeRef<'_>) -> Flanking {
        let options = self.ctx.options();
        if node.is_block() || (options.preformatted_code && node.is_code()) {
            return Flanking::default();
        }

        let text = self.ctx.text_content(node);
        let edges = EdgeWhitespace::of(&text);

        let leading = if !edges.leading_ascii.is_empty() && self.is_flanked(node, Side::Left) {
            edges.leading_rest
        } else {
            edges.leading
        };
        let trailing = if !edges.trailing_ascii.is_empty() && self.is_flanked(node, Side::Right) {
            edges.trailing_rest
        } else {
            edges.trailing
        };

        Flanking {
            leading: leading.to_string(),
            trailing: trailing.to_string(),
        }
    }

    fn is_flanked(&self, node: NodeRef<'_>, side: Side) -> bool {
        let sibling = match side {
            Side::Left => self.ctx.previous_sibling(node),
            Side::Right => self.ctx.next_sibling(node),
        };
        let Some(sibling) = sibling else {
            return false;
        };

        let text = if sibling.is_text() {
            self.ctx.collapsed().text(sibling).to_string()
        } else if sibling.is_element() {
            if self.ctx.options().preformatted_code && sibling.has_tag("code") {
                return false;
            }
            if sibling.is_block() {
                return false;
            }
            self.ctx.text_content(sibling)
        } else {
            return false;
        };

        match side {
            Side::Left => text.ends_with(' '),
            Side::Right => text.starts_with(' '),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Default)]
struct Flanking {
    leading: String,
    trailing: String,
}

impl Flanking {
    fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_empty()
    }
}

/// Edge whitespace of a string, split into the outermost ASCII run and the
/// rest (which starts or ends at the first non-ASCII space, e.g. `&nbsp;`)
#[derive(Debug, Default, PartialEq, Eq)]
struct EdgeWhitespace<'a> {
    leading: &'a str,
    leading_ascii: &'a str,
    leading_rest: &'a str,
    trailing: &'a str,
    trailing_rest: &'a str,
    trailing_ascii: &'a str,
}

impl<'a> EdgeWhitespace<'a> {
    fn of(text: &'a str) -> Self {
        let body = text.trim_start_matches(char::is_whitespace);
        let leading = &text[..text.len() - body.len()];
        let leading_rest = leading.trim_start_matches(is_ascii_space);
        let leading_ascii = &leading[..leading.len() - leading_rest.len()];

        if body.is_empty() {
            return Self {
                leading,
                leading_ascii,
                leading_rest,
                ..Self::default()
            };
        }

        let content = body.trim_end_matches(char::is_whitespace);
        let trailing = &body[content.len()..];
        let trailing_rest = trailing.trim_end_matches(is_ascii_space);
        let trailing_ascii = &trailing[trailing_rest.len()..];

        Self {
            leading,
            leading_ascii,
            leading_rest,
            trailing,
            trailing_rest,
            trailing_ascii,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_whitespace_mixed() {
        let edges = EdgeWhitespace::of(" \r\n\u{a0} \r\nHELLO \r\nWORLD \r\n\u{a0} \r\n");
        assert_eq!(edges.leading_ascii, " \r\n");
        assert_eq!(edges.leading_rest, "\u{a0} \r\n");
        assert_eq!(edges.trailing_rest, " \r\n\u{a0}");
        assert_eq!(edges.trailing_ascii, " \r\n");
    }

    #[test]
    fn test_edge_whitespace_non_ascii_edges() {
        let edges = EdgeWhitespace::of("\u{a0} \r\nHELLO \r\nWORLD \r\n\u{a0}");
        assert_eq!(edges.leading_ascii, "");
        assert_eq!(edges.leading_rest, "\u{a0} \r\n");
        assert_eq!(edges.trailing_rest, " \r\n\u{a0}");
        assert_eq!(edges.trailing_ascii, "");
    }

    #[test]
    fn test_edge_whitespace_all_space() {
        let edges = EdgeWhitespace::of(" \r\n\u{a0} \r\n");
        assert_eq!(edges.leading, " \r\n\u{a0} \r\n");
        assert_eq!(edges.leading_ascii, " \r\n");
        assert_eq!(edges.trailing, "");

        let edges = EdgeWhitespace::of("\u{a0} \r\n\u{a0}");
        assert_eq!(edges.leading_ascii, "");
        assert_eq!(edges.leading_rest, "\u{a0} \r\n\u{a0}");
    }

    #[test]
    fn test_edge_whitespace_none() {
        assert_eq!(EdgeWhitespace::of("plain"), EdgeWhitespace::default());
    }
}
