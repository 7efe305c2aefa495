//! Tag classification tables and small text helpers shared by the rules.

use once_cell::sync::Lazy;
use regex::Regex;

/// Block-level HTML elements
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "body", "canvas",
    "center", "dd", "dir", "div", "dl", "dt", "fieldset", "figcaption",
    "figure", "footer", "form", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "html", "isindex", "li", "main", "menu",
    "nav", "noframes", "noscript", "ol", "output", "p", "pre", "section",
    "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Void (self-closing) HTML elements
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements that have meaning even when blank
pub const MEANINGFUL_WHEN_BLANK: &[&str] = &[
    "a", "table", "thead", "tbody", "tfoot", "th", "td", "iframe", "script",
    "audio", "video",
];

fn contains_tag(table: &[&str], tag: &str) -> bool {
    table.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Check if a tag is a block-level element
pub fn is_block(tag: &str) -> bool {
    contains_tag(BLOCK_ELEMENTS, tag)
}

/// Check if a tag is a void element
pub fn is_void(tag: &str) -> bool {
    contains_tag(VOID_ELEMENTS, tag)
}

/// Check if a tag is meaningful when blank
pub fn is_meaningful_when_blank(tag: &str) -> bool {
    contains_tag(MEANINGFUL_WHEN_BLANK, tag)
}

static ATTRIBUTE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\n+\s*)+").unwrap());

/// Clean an attribute value for use inside Markdown: a missing value becomes
/// empty and runs of line breaks fold into a single newline.
pub fn clean_attribute(value: Option<&str>) -> String {
    value
        .map(|v| ATTRIBUTE_BREAKS.replace_all(v, "\n").into_owned())
        .unwrap_or_default()
}

/// ASCII whitespace as HTML defines it (space, tab, CR, LF, FF)
pub(crate) fn is_ascii_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0c')
}

pub(crate) fn trim_leading_newlines(s: &str) -> &str {
    s.trim_start_matches('\n')
}

pub(crate) fn trim_trailing_newlines(s: &str) -> &str {
    s.trim_end_matches('\n')
}
