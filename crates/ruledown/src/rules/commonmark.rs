//! CommonMark rules for HTML to Markdown conversion.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Filter, Rule};
use crate::node::NodeRef;
use crate::normalize::verbatim;
use crate::options::{CodeBlockStyle, HeadingStyle, LinkReferenceStyle, LinkStyle};
use crate::utilities::{clean_attribute, trim_leading_newlines, trim_trailing_newlines};

static LANGUAGE_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"language-(\S+)").unwrap());
static BACKTICK_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^`{3,}").unwrap());
static TILDE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^~{3,}").unwrap());
static LINE_ENDING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n|\r").unwrap());
static CODE_NEEDS_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^`|^ .*?[^ ].* $|`$").unwrap());
static BACKTICK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+").unwrap());

/// The built-in rule table, in resolution order
pub(super) fn rules() -> Vec<(&'static str, Rule)> {
    vec![
        ("paragraph", paragraph_rule()),
        ("line_break", line_break_rule()),
        ("heading", heading_rule()),
        ("blockquote", blockquote_rule()),
        ("list", list_rule()),
        ("list_item", list_item_rule()),
        ("indented_code_block", indented_code_block_rule()),
        ("fenced_code_block", fenced_code_block_rule()),
        ("horizontal_rule", horizontal_rule()),
        ("inline_link", inline_link_rule()),
        ("reference_link", reference_link_rule()),
        ("emphasis", emphasis_rule()),
        ("strong", strong_rule()),
        ("code", code_rule()),
        ("image", image_rule()),
    ]
}

fn trim_newlines(s: &str) -> &str {
    trim_trailing_newlines(trim_leading_newlines(s))
}

fn paragraph_rule() -> Rule {
    Rule::for_tag("p", |_, content, _| format!("\n\n{content}\n\n"))
}

fn line_break_rule() -> Rule {
    Rule::for_tag("br", |_, _, ctx| format!("{}\n", ctx.options().br))
}

fn heading_rule() -> Rule {
    Rule::for_tags(&["h1", "h2", "h3", "h4", "h5", "h6"], |node, content, ctx| {
        let level = node.tag_name()[1..].parse::<usize>().unwrap_or(1);

        match ctx.options().heading_style {
            HeadingStyle::Setext if level <= 2 => {
                let underline = if level == 1 { "=" } else { "-" };
                format!(
                    "\n\n{}\n{}\n\n",
                    content,
                    underline.repeat(content.chars().count())
                )
            }
            _ => format!("\n\n{} {}\n\n", "#".repeat(level), content),
        }
    })
}

fn blockquote_rule() -> Rule {
    Rule::for_tag("blockquote", |_, content, _| {
        let quoted: Vec<String> = trim_newlines(content)
            .split('\n')
            .map(|line| format!("> {line}"))
            .collect();
        format!("\n\n{}\n\n", quoted.join("\n"))
    })
}

fn list_rule() -> Rule {
    Rule::for_tags(&["ul", "ol"], |node, content, _| {
        let content = trim_newlines(content);

        // A list closing out a list item hangs directly under the item text
        let ends_item = node
            .parent()
            .filter(|parent| parent.has_tag("li"))
            .and_then(|parent| parent.element_children().last())
            .is_some_and(|last| last == *node);

        if ends_item {
            format!("\n{content}")
        } else {
            format!("\n\n{content}\n\n")
        }
    })
}

fn list_item_rule() -> Rule {
    Rule::for_tag("li", |node, content, ctx| {
        let content = trim_leading_newlines(content);
        let trimmed = trim_trailing_newlines(content);
        let mut item = trimmed.to_string();
        if trimmed.len() != content.len() {
            item.push('\n');
        }
        let item = item.replace('\n', "\n    ");

        let prefix = match ctx.item_ordinal() {
            Some(ordinal) => format!("{ordinal}.  "),
            None => format!("{}   ", ctx.options().bullet_list_marker.marker()),
        };

        let needs_newline = ctx.next_sibling(*node).is_some() && !item.ends_with('\n');
        format!("{prefix}{item}{}", if needs_newline { "\n" } else { "" })
    })
}

fn is_code_block(node: &NodeRef<'_>) -> bool {
    node.has_tag("pre") && node.find_child("code").is_some()
}

fn indented_code_block_rule() -> Rule {
    Rule::new(
        Filter::predicate(|_, node, options| {
            options.code_block_style == CodeBlockStyle::Indented && is_code_block(node)
        }),
        |node, _, ctx| {
            let code = node
                .find_child("code")
                .map(|code| ctx.text_content(code))
                .unwrap_or_default();
            let code = code.strip_suffix('\n').unwrap_or(&code);

            let block = format!("    {}", code.replace('\n', "\n    "));
            format!("\n\n{}\n\n", verbatim(&block))
        },
    )
}

fn fenced_code_block_rule() -> Rule {
    Rule::new(
        Filter::predicate(|_, node, options| {
            options.code_block_style == CodeBlockStyle::Fenced && is_code_block(node)
        }),
        |node, _, ctx| {
            let code_node = node.find_child("code");
            let language = code_node
                .and_then(|code| code.attr("class"))
                .and_then(|class| LANGUAGE_CLASS.captures(class))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let code = code_node
                .map(|code| ctx.text_content(code))
                .unwrap_or_default();

            let fence_char = ctx.options().fence.marker();
            let inner_fences = if fence_char == '~' {
                &*TILDE_FENCE
            } else {
                &*BACKTICK_FENCE
            };
            let fence_size = inner_fences
                .find_iter(&code)
                .map(|m| m.as_str().len() + 1)
                .fold(3, usize::max);
            let fence = fence_char.to_string().repeat(fence_size);

            let code = code.strip_suffix('\n').unwrap_or(&code);
            format!("\n\n{fence}{language}\n{code}\n{fence}\n\n")
        },
    )
}

fn horizontal_rule() -> Rule {
    Rule::for_tag("hr", |_, _, ctx| format!("\n\n{}\n\n", ctx.options().hr))
}

fn has_href(node: &NodeRef<'_>) -> bool {
    node.has_tag("a") && node.attr("href").is_some_and(|href| !href.is_empty())
}

fn inline_link_rule() -> Rule {
    Rule::new(
        Filter::predicate(|_, node, options| {
            options.link_style == LinkStyle::Inlined && has_href(node)
        }),
        |node, content, _| {
            let href = node
                .attr("href")
                .unwrap_or_default()
                .replace('(', "\\(")
                .replace(')', "\\)");
            let title = clean_attribute(node.attr("title"));
            let title = if title.is_empty() {
                String::new()
            } else {
                format!(" \"{}\"", title.replace('"', "\\\""))
            };

            format!("[{content}]({href}{title})")
        },
    )
}

fn reference_link_rule() -> Rule {
    Rule::new(
        Filter::predicate(|_, node, options| {
            options.link_style == LinkStyle::Referenced && has_href(node)
        }),
        |node, content, ctx| {
            let href = node.attr("href").unwrap_or_default();
            let title = clean_attribute(node.attr("title"));
            let title = if title.is_empty() {
                String::new()
            } else {
                format!(" \"{title}\"")
            };

            match ctx.options().link_reference_style {
                LinkReferenceStyle::Collapsed => {
                    ctx.add_reference(format!("[{content}]: {href}{title}"));
                    format!("[{content}][]")
                }
                LinkReferenceStyle::Shortcut => {
                    ctx.add_reference(format!("[{content}]: {href}{title}"));
                    format!("[{content}]")
                }
                LinkReferenceStyle::Full => {
                    let id = ctx.reference_count() + 1;
                    ctx.add_reference(format!("[{id}]: {href}{title}"));
                    format!("[{content}][{id}]")
                }
            }
        },
    )
    .with_append(|ctx| {
        let references = ctx.take_references();
        if references.is_empty() {
            String::new()
        } else {
            format!("\n\n{}\n\n", references.join("\n"))
        }
    })
}

fn emphasis_rule() -> Rule {
    Rule::for_tags(&["em", "i"], |_, content, ctx| {
        if content.trim().is_empty() {
            return String::new();
        }
        let delimiter = ctx.options().em_delimiter.marker();
        format!("{delimiter}{content}{delimiter}")
    })
}

fn strong_rule() -> Rule {
    Rule::for_tags(&["strong", "b"], |_, content, ctx| {
        if content.trim().is_empty() {
            return String::new();
        }
        let delimiter = ctx.options().strong_delimiter.marker();
        format!("{delimiter}{content}{delimiter}")
    })
}

fn code_rule() -> Rule {
    Rule::new(
        Filter::predicate(|tag, node, _| {
            let in_code_block = node.parent().is_some_and(|p| p.has_tag("pre"))
                && !node.has_element_siblings();
            tag == "code" && !in_code_block
        }),
        |_, content, _| {
            if content.is_empty() {
                return String::new();
            }

            let code = LINE_ENDING.replace_all(content, " ");
            let pad = if CODE_NEEDS_SPACE.is_match(&code) { " " } else { "" };

            // The delimiter must differ from every backtick run in the code
            let runs: Vec<&str> = BACKTICK_RUN.find_iter(&code).map(|m| m.as_str()).collect();
            let mut delimiter = String::from("`");
            while runs.contains(&delimiter.as_str()) {
                delimiter.push('`');
            }

            format!("{delimiter}{pad}{code}{pad}{delimiter}")
        },
    )
}

fn image_rule() -> Rule {
    Rule::for_tag("img", |node, _, _| {
        let src = node.attr("src").unwrap_or_default();
        if src.is_empty() {
            return String::new();
        }

        let alt = clean_attribute(node.attr("alt"));
        let title = clean_attribute(node.attr("title"));
        let title = if title.is_empty() {
            String::new()
        } else {
            format!(" \"{title}\"")
        };

        format!("![{alt}]({src}{title})")
    })
}
