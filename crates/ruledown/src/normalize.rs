//! Blank-line handling: joining rendered fragments and the final cleanup pass.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utilities::{trim_leading_newlines, trim_trailing_newlines};

/// Opens a region whose blank lines survive [`normalize`]
pub(crate) const VERBATIM_OPEN: char = '\u{e000}';
/// Closes a region opened by [`VERBATIM_OPEN`]
pub(crate) const VERBATIM_CLOSE: char = '\u{e001}';

const MARKERS: &[char] = &[VERBATIM_OPEN, VERBATIM_CLOSE];
/// Trimmed from the start of the first line
const LEADING: &[char] = &['\t', '\r'];

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());

/// Join two rendered fragments.
///
/// Newlines at the seam are trimmed and replaced by the larger of the two
/// trimmed runs, capped at two (one blank line).
pub fn join_chunks(output: &str, chunk: &str) -> String {
    let left = trim_trailing_newlines(output);
    let right = trim_leading_newlines(chunk);
    let newlines = (output.len() - left.len())
        .max(chunk.len() - right.len())
        .min(2);

    let mut joined = String::with_capacity(left.len() + newlines + right.len());
    joined.push_str(left);
    joined.push_str(&"\n".repeat(newlines));
    joined.push_str(right);
    joined
}

/// Mark the body of preformatted text so [`normalize`] keeps its blank
/// lines. Edge whitespace stays outside the markers, so seam joining and
/// content trimming see the same text as without them.
pub(crate) fn verbatim(text: &str) -> String {
    let body = text.trim_matches(char::is_whitespace);
    if !BLANK_LINE.is_match(body) {
        return text.to_string();
    }

    let start = text.len() - text.trim_start_matches(char::is_whitespace).len();
    let end = start + body.len();
    format!(
        "{}{VERBATIM_OPEN}{body}{VERBATIM_CLOSE}{}",
        &text[..start],
        &text[end..]
    )
}

/// An opening code fence: its character and length
#[derive(Debug, Clone, Copy)]
struct FenceMarker {
    marker: char,
    len: usize,
}

fn fence_run(line: &str) -> Option<(FenceMarker, &str)> {
    let trimmed = line.trim_start_matches(' ');
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    let rest = &trimmed[len..];

    // The info string of a backtick fence may not contain a backtick
    if len < 3 || (marker == '`' && rest.contains('`')) {
        return None;
    }
    Some((FenceMarker { marker, len }, rest))
}

fn closes(open: FenceMarker, line: &str) -> bool {
    match fence_run(line) {
        Some((fence, rest)) => {
            fence.marker == open.marker && fence.len >= open.len && rest.trim().is_empty()
        }
        None => false,
    }
}

/// Final cleanup of a rendered document.
///
/// Drops leading blank lines (and tabs before the first line), trims
/// trailing whitespace, and collapses runs of two or more blank lines into
/// one. A line holding only whitespace counts as blank. Lines inside fenced
/// code blocks, and preformatted text rendered by the engine, are left
/// untouched. Applying `normalize` twice gives the same result as once.
///
/// ```rust
/// use ruledown::normalize;
///
/// assert_eq!(normalize("\n\nOne\n\n  \n\nTwo\n  "), "One\n\nTwo");
/// ```
pub fn normalize(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut fence: Option<FenceMarker> = None;
    let mut verbatim_depth = 0usize;
    let mut blank_run = 0usize;
    let mut started = false;

    for raw in markdown.split('\n') {
        let protected = verbatim_depth > 0 || fence.is_some();
        verbatim_depth = (verbatim_depth + raw.matches(VERBATIM_OPEN).count())
            .saturating_sub(raw.matches(VERBATIM_CLOSE).count());

        let mut line = if raw.contains(MARKERS) {
            Cow::Owned(raw.replace(MARKERS, ""))
        } else {
            Cow::Borrowed(raw)
        };
        if !started {
            line = match line {
                Cow::Borrowed(l) => Cow::Borrowed(l.trim_start_matches(LEADING)),
                Cow::Owned(l) => Cow::Owned(l.trim_start_matches(LEADING).to_string()),
            };
        }

        if protected {
            if let Some(open) = fence {
                if closes(open, &line) {
                    fence = None;
                }
            }
            blank_run = 0;
        } else if line.trim().is_empty() {
            if !started {
                continue;
            }
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
            fence = fence_run(&line).map(|(f, _)| f);
        }

        if started {
            out.push('\n');
        }
        started = true;
        out.push_str(&line);
    }

    out.truncate(out.trim_end().len());
    out
}

/// Encode non-breaking spaces as `&nbsp;`
pub fn encode_nbsp(markdown: &str) -> String {
    markdown.replace('\u{a0}', "&nbsp;")
}
