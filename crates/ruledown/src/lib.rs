//! # ruledown
//!
//! Rule-driven conversion of parsed HTML trees to Markdown.
//!
//! A document tree is walked depth-first; every element is matched against a
//! prioritized rule table and rendered through the winning rule. Built-in
//! CommonMark rules cover the usual elements, and callers (or plugins) can
//! layer their own rules on top or override built-ins by key.
//!
//! ## Design
//!
//! The engine does not parse HTML itself. It reads an arena [`Document`]
//! that any parser can populate:
//!
//! - **Parser agnostic**: build the tree from html5ever, a browser DOM, or by hand
//! - **Pure conversion**: `convert` borrows the engine immutably, so one engine
//!   can serve many threads
//! - **Optional parsing**: the `html` feature adds a scraper-backed adapter
//!
//! ## Example (Document-based)
//!
//! ```rust
//! use ruledown::{Document, Engine, NodeId};
//!
//! let engine = Engine::new();
//!
//! let mut doc = Document::new();
//! let h1 = doc.append_element(NodeId::ROOT, "h1");
//! doc.append_text(h1, "Hello");
//!
//! let markdown = engine.convert(&doc).unwrap();
//! assert_eq!(markdown, "Hello\n=====");
//! ```
//!
//! ## Example (custom rule)
//!
//! ```rust
//! use ruledown::{Engine, Rule};
//!
//! let mut engine = Engine::new();
//! engine.add_rule("mark", Rule::for_tag("mark", |_, content, _| format!("=={content}==")));
//!
//! # #[cfg(feature = "html")]
//! assert_eq!(engine.convert_html("<p><mark>x</mark></p>").unwrap(), "==x==");
//! ```

mod collapse;
mod context;
pub mod escape;
#[cfg(feature = "html")]
pub mod html;
pub mod node;
pub mod normalize;
pub mod options;
mod rules;
mod service;
mod utilities;
mod walker;

use std::error::Error as StdError;

pub use context::RenderContext;
pub use escape::{escape, Escaping};
#[cfg(feature = "html")]
pub use html::parse_html;
pub use node::{Document, NodeClass, NodeId, NodeRef, NodeType};
pub use normalize::normalize;
pub use options::{
    BulletListMarker, CodeBlockStyle, EmDelimiter, Fence, HeadingStyle, LinkReferenceStyle,
    LinkStyle, Options, StrongDelimiter,
};
pub use rules::{Filter, Registrar, Resolved, Rule, Rules};
pub use service::{convert, Engine};
pub use utilities::{clean_attribute, is_block, is_meaningful_when_blank, is_void};

/// Boxed error returned by caller-supplied rules and plugins
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error type for ruledown operations
#[derive(Debug, thiserror::Error)]
pub enum RuledownError {
    /// A node kind with no Markdown meaning (processing instruction, doctype,
    /// or an unknown DOM `nodeType` number)
    #[error("Unsupported node kind: {0}")]
    UnsupportedNodeKind(u32),

    /// A plugin failed while registering rules; the registry was left untouched
    #[error("Plugin registration failed for {plugin}: {source}")]
    PluginRegistration {
        plugin: String,
        #[source]
        source: BoxError,
    },

    /// A rule's replacement failed; no partial output is produced
    #[error("Rule `{rule}` failed on {node}: {source}")]
    RuleRender {
        rule: String,
        node: String,
        #[source]
        source: BoxError,
    },

    /// An option value could not be parsed
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

pub type Result<T> = std::result::Result<T, RuledownError>;
