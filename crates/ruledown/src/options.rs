//! Configuration options for Markdown conversion
//!
//! Options are an immutable snapshot for the duration of a conversion. They
//! only steer the built-in rules (and which subtrees whitespace collapsing
//! leaves alone); custom rules may read them through the render context.

use crate::escape::Escaping;

/// Implements `as_str`, `Display` and case-insensitive `FromStr` for an
/// option enum from its variant/name table.
macro_rules! option_names {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Configuration name of this value
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = $crate::RuledownError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.trim().eq_ignore_ascii_case($name) {
                        return Ok($ty::$variant);
                    }
                )+
                Err($crate::RuledownError::InvalidOption(format!(
                    concat!("unknown ", $what, " `{}`"),
                    s
                )))
            }
        }
    };
}

pub(crate) use option_names;

/// Heading style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HeadingStyle {
    /// Use setext-style headings (underlined with = or -)
    /// Only works for h1 and h2, falls back to ATX for h3-h6
    #[default]
    Setext,
    /// Use ATX-style headings (prefixed with #)
    Atx,
}

option_names!(HeadingStyle, "heading style", {
    Setext => "setext",
    Atx => "atx",
});

/// Marker used for unordered list items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BulletListMarker {
    /// `*`
    #[default]
    Asterisk,
    /// `-`
    Dash,
    /// `+`
    Plus,
}

option_names!(BulletListMarker, "bullet list marker", {
    Asterisk => "asterisk",
    Dash => "dash",
    Plus => "plus",
});

impl BulletListMarker {
    pub fn marker(self) -> char {
        match self {
            BulletListMarker::Asterisk => '*',
            BulletListMarker::Dash => '-',
            BulletListMarker::Plus => '+',
        }
    }
}

/// Code block style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CodeBlockStyle {
    /// Use indented code blocks (4 spaces)
    #[default]
    Indented,
    /// Use fenced code blocks (```)
    Fenced,
}

option_names!(CodeBlockStyle, "code block style", {
    Indented => "indented",
    Fenced => "fenced",
});

/// Fence character for fenced code blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Fence {
    /// ```` ``` ````
    #[default]
    Backtick,
    /// `~~~`
    Tilde,
}

option_names!(Fence, "fence", {
    Backtick => "backtick",
    Tilde => "tilde",
});

impl Fence {
    pub fn marker(self) -> char {
        match self {
            Fence::Backtick => '`',
            Fence::Tilde => '~',
        }
    }
}

/// Link style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LinkStyle {
    /// Use inline links [text](url)
    #[default]
    Inlined,
    /// Use reference links [text][ref]
    Referenced,
}

option_names!(LinkStyle, "link style", {
    Inlined => "inlined",
    Referenced => "referenced",
});

/// Reference style for referenced links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LinkReferenceStyle {
    /// Full reference: [text][label]
    #[default]
    Full,
    /// Collapsed reference: [text][]
    Collapsed,
    /// Shortcut reference: [text]
    Shortcut,
}

option_names!(LinkReferenceStyle, "link reference style", {
    Full => "full",
    Collapsed => "collapsed",
    Shortcut => "shortcut",
});

/// Emphasis delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EmDelimiter {
    /// `_text_`
    #[default]
    Underscore,
    /// `*text*`
    Asterisk,
}

option_names!(EmDelimiter, "emphasis delimiter", {
    Underscore => "underscore",
    Asterisk => "asterisk",
});

impl EmDelimiter {
    pub fn marker(self) -> &'static str {
        match self {
            EmDelimiter::Underscore => "_",
            EmDelimiter::Asterisk => "*",
        }
    }
}

/// Strong delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StrongDelimiter {
    /// `**text**`
    #[default]
    Asterisks,
    /// `__text__`
    Underscores,
}

option_names!(StrongDelimiter, "strong delimiter", {
    Asterisks => "asterisks",
    Underscores => "underscores",
});

impl StrongDelimiter {
    pub fn marker(self) -> &'static str {
        match self {
            StrongDelimiter::Asterisks => "**",
            StrongDelimiter::Underscores => "__",
        }
    }
}

/// Options for Markdown conversion
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Options {
    /// Heading style (setext or atx)
    pub heading_style: HeadingStyle,

    /// Horizontal rule string
    pub hr: String,

    /// Bullet list marker
    pub bullet_list_marker: BulletListMarker,

    /// Code block style
    pub code_block_style: CodeBlockStyle,

    /// Fence character for fenced code blocks
    pub fence: Fence,

    /// Emphasis delimiter
    pub em_delimiter: EmDelimiter,

    /// Strong delimiter
    pub strong_delimiter: StrongDelimiter,

    /// Link style
    pub link_style: LinkStyle,

    /// Reference style for referenced links
    pub link_reference_style: LinkReferenceStyle,

    /// Text emitted before the newline of a hard line break
    pub br: String,

    /// Leave whitespace inside `<code>` untouched, like `<pre>`
    pub preformatted_code: bool,

    /// How text nodes are escaped
    pub escaping: Escaping,

    /// Tags rendered through the keep replacement before any rule is
    /// consulted (lowercase names)
    pub keep_tags: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Setext,
            hr: "* * *".to_string(),
            bullet_list_marker: BulletListMarker::Asterisk,
            code_block_style: CodeBlockStyle::Indented,
            fence: Fence::Backtick,
            em_delimiter: EmDelimiter::Underscore,
            strong_delimiter: StrongDelimiter::Asterisks,
            link_style: LinkStyle::Inlined,
            link_reference_style: LinkReferenceStyle::Full,
            br: "  ".to_string(),
            preformatted_code: false,
            escaping: Escaping::Markdown,
            keep_tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuledownError;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.heading_style, HeadingStyle::Setext);
        assert_eq!(options.hr, "* * *");
        assert!(options.keep_tags.is_empty());
        assert_eq!(options.bullet_list_marker.marker(), '*');
        assert_eq!(options.fence.marker(), '`');
        assert_eq!(options.em_delimiter.marker(), "_");
        assert_eq!(options.strong_delimiter.marker(), "**");
        assert_eq!(options.br, "  ");
        assert!(!options.preformatted_code);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("ATX".parse::<HeadingStyle>().unwrap(), HeadingStyle::Atx);
        assert_eq!(" dash ".parse::<BulletListMarker>().unwrap(), BulletListMarker::Dash);
        assert_eq!("Tilde".parse::<Fence>().unwrap(), Fence::Tilde);
        assert_eq!(
            "shortcut".parse::<LinkReferenceStyle>().unwrap(),
            LinkReferenceStyle::Shortcut
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = "underline".parse::<HeadingStyle>().unwrap_err();
        assert!(matches!(err, RuledownError::InvalidOption(_)));
        assert_eq!(
            err.to_string(),
            "Invalid option: unknown heading style `underline`"
        );
    }

    #[test]
    fn test_names_round_trip() {
        for style in [StrongDelimiter::Asterisks, StrongDelimiter::Underscores] {
            assert_eq!(style.as_str().parse::<StrongDelimiter>().unwrap(), style);
        }
        assert_eq!(CodeBlockStyle::Fenced.to_string(), "fenced");
    }
}
