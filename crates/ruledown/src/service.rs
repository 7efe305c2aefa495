//! Engine - the main entry point for Markdown conversion.

use tracing::{debug, debug_span, warn};

use crate::collapse::Collapsed;
use crate::context::RenderContext;
use crate::node::{Document, NodeRef};
use crate::normalize::{encode_nbsp, normalize};
use crate::options::Options;
use crate::rules::{Filter, Registrar, Rule, Rules};
use crate::walker::Walker;
use crate::{BoxError, Result, RuledownError};

/// Converts documents to Markdown with a configurable rule registry
#[derive(Debug, Clone, Default)]
pub struct Engine {
    options: Options,
    rules: Rules,
    plugins_applied: usize,
}

impl Engine {
    /// Create an engine with default options and the built-in rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom options
    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Convert a document using the engine's options
    pub fn convert(&self, document: &Document) -> Result<String> {
        self.convert_with(document, &self.options)
    }

    /// Convert a document with an explicit options snapshot
    pub fn convert_with(&self, document: &Document, options: &Options) -> Result<String> {
        self.convert_node(document.root(), options)
    }

    /// Convert a subtree. A document or fragment node renders its children;
    /// any other node is rendered itself.
    pub fn convert_node(&self, root: NodeRef<'_>, options: &Options) -> Result<String> {
        let _span = debug_span!("convert", root = %root.describe()).entered();

        let collapsed = Collapsed::collapse(root, options.preformatted_code);
        let mut ctx = RenderContext::new(options, collapsed);
        let mut walker = Walker::new(&self.rules, &mut ctx);

        let output = walker.render_root(root)?;
        let output = walker.run_appends(output);
        let markdown = normalize(&encode_nbsp(&output));

        debug!(bytes = markdown.len(), "converted");
        Ok(markdown)
    }

    /// Parse an HTML string and convert it
    #[cfg(feature = "html")]
    pub fn convert_html(&self, html: &str) -> Result<String> {
        let document = crate::html::parse_html(html);
        self.convert(&document)
    }

    /// Add a custom rule
    pub fn add_rule(&mut self, key: impl Into<String>, rule: Rule) -> &mut Self {
        self.rules.add_rule(key, rule);
        self
    }

    /// Remove a custom rule, or mask the built-in rule with that key
    pub fn remove_rule(&mut self, key: &str) -> &mut Self {
        self.rules.remove_rule(key);
        self
    }

    /// Keep elements matching the filter as HTML
    pub fn keep(&mut self, filter: impl Into<Filter>) -> &mut Self {
        self.rules.keep(filter.into());
        self
    }

    /// Remove elements matching the filter
    pub fn remove(&mut self, filter: impl Into<Filter>) -> &mut Self {
        self.rules.remove(filter.into());
        self
    }

    /// Replace the output of blank elements (default: `"\n\n"` for blocks,
    /// nothing for inline elements)
    pub fn blank_replacement<F>(&mut self, replacement: F) -> &mut Self
    where
        F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        self.rules.set_blank_replacement(replacement);
        self
    }

    /// Replace the output of kept elements (default: their outer HTML)
    pub fn keep_replacement<F>(&mut self, replacement: F) -> &mut Self
    where
        F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        self.rules.set_keep_replacement(replacement);
        self
    }

    /// Replace the output of unmatched elements (default: the content,
    /// padded with blank lines for blocks)
    pub fn default_replacement<F>(&mut self, replacement: F) -> &mut Self
    where
        F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        self.rules.set_default_replacement(replacement);
        self
    }

    /// Escape text nodes with a custom function instead of the configured
    /// [`Escaping`](crate::Escaping) mode
    pub fn escape_with<F>(&mut self, escape: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.rules.set_escape(escape);
        self
    }

    /// Apply a plugin.
    ///
    /// The plugin registers rules through a [`Registrar`] backed by a staged
    /// copy of the registry. The copy replaces the live registry only when
    /// the plugin returns `Ok`; on error nothing it registered survives.
    pub fn use_plugin<F>(&mut self, plugin: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Registrar<'_>) -> std::result::Result<(), BoxError>,
    {
        self.plugins_applied += 1;
        let name = format!("plugin #{}", self.plugins_applied);

        let mut staged = self.rules.clone();
        let outcome = plugin(&mut Registrar::new(&mut staged));

        match outcome {
            Ok(()) => {
                self.rules = staged;
                debug!(plugin = %name, "applied plugin");
                Ok(self)
            }
            Err(source) => {
                warn!(plugin = %name, error = %source, "plugin failed; registry unchanged");
                Err(RuledownError::PluginRegistration {
                    plugin: name,
                    source,
                })
            }
        }
    }

    /// Escape Markdown syntax in a string, as text nodes are escaped
    pub fn escape(&self, text: &str) -> String {
        self.rules.escape(text, &self.options)
    }

    /// Get the current options
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Get mutable access to options
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// The rule registry
    pub fn rules(&self) -> &Rules {
        &self.rules
    }
}

/// Convert a document with the built-in rules
pub fn convert(document: &Document, options: &Options) -> Result<String> {
    Engine::new().convert_with(document, options)
}
