//! Escaping of Markdown-significant characters in text nodes.
//!
//! Only raw text content outside `<code>` is escaped; rule output never is.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::options::option_names;

/// How text nodes are escaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Escaping {
    /// Escape everything that could start Markdown syntax
    #[default]
    Markdown,
    /// Escape only backslashes and square brackets
    Minimal,
    /// Pass text through unchanged
    Disabled,
}

option_names!(Escaping, "escaping mode", {
    Markdown => "markdown",
    Minimal => "minimal",
    Disabled => "disabled",
});

impl Escaping {
    /// Escape `text` according to this mode
    pub fn apply(self, text: &str) -> String {
        match self {
            Escaping::Markdown => apply_all(&MARKDOWN_ESCAPES, text),
            Escaping::Minimal => apply_all(&MINIMAL_ESCAPES, text),
            Escaping::Disabled => text.to_string(),
        }
    }
}

// Order matters: the backslash pass must run first so later passes do not
// double-escape their own output.
static MARKDOWN_ESCAPES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\\", r"\\"),
        (r"\*", r"\*"),
        (r"(?m)^-", r"\-"),
        (r"(?m)^\+ ", r"\+ "),
        (r"(?m)^(=+)", r"\${1}"),
        (r"(?m)^(#{1,6}) ", r"\${1} "),
        (r"`", r"\`"),
        (r"(?m)^~~~", r"\~~~"),
        (r"\[", r"\["),
        (r"\]", r"\]"),
        (r"(?m)^>", r"\>"),
        (r"_", r"\_"),
        (r"(?m)^(\d+)\. ", r"${1}\. "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

static MINIMAL_ESCAPES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [(r"\\", r"\\"), (r"\[", r"\["), (r"\]", r"\]")]
        .into_iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
        .collect()
});

fn apply_all(table: &[(Regex, &'static str)], text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, replacement) in table {
        let replaced = pattern.replace_all(&out, *replacement);
        if let Cow::Owned(replaced) = replaced {
            out = replaced;
        }
    }
    out
}

/// Escape Markdown syntax in `text`.
///
/// ```rust
/// assert_eq!(ruledown::escape("1. not a list"), "1\\. not a list");
/// assert_eq!(ruledown::escape("*starred*"), "\\*starred\\*");
/// ```
pub fn escape(text: &str) -> String {
    Escaping::Markdown.apply(text)
}
