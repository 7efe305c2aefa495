//! Rule and Filter types for node conversion.

use std::fmt;
use std::sync::Arc;

use crate::context::RenderContext;
use crate::node::NodeRef;
use crate::options::Options;
use crate::BoxError;

/// Predicate deciding whether a rule applies: `(tag, node, options)`
pub type FilterFn = Arc<dyn Fn(&str, &NodeRef<'_>, &Options) -> bool + Send + Sync>;

/// Render function: `(node, rendered content, context) -> fragment`
pub type ReplacementFn = Arc<
    dyn Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> Result<String, BoxError> + Send + Sync,
>;

/// Caller-supplied text escaper, used in place of [`Escaping`](crate::Escaping)
pub type EscapeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Hook run once after the walk; its output is appended to the document
pub type AppendFn = Arc<dyn Fn(&mut RenderContext<'_>) -> String + Send + Sync>;

/// A filter determines which elements a rule applies to
#[derive(Clone)]
pub enum Filter {
    /// Match a single tag name
    TagName(String),
    /// Match any of multiple tag names
    TagNames(Vec<String>),
    /// Match using a predicate function
    Predicate(FilterFn),
}

impl Filter {
    /// Create a filter for a single tag
    pub fn tag(name: &str) -> Self {
        Filter::TagName(name.to_ascii_lowercase())
    }

    /// Create a filter for multiple tags
    pub fn tags(names: &[&str]) -> Self {
        Filter::TagNames(names.iter().map(|s| s.to_ascii_lowercase()).collect())
    }

    /// Create a filter with a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str, &NodeRef<'_>, &Options) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Arc::new(f))
    }

    /// Check if this filter matches an element
    pub fn matches(&self, node: &NodeRef<'_>, options: &Options) -> bool {
        if !node.is_element() {
            return false;
        }
        let tag = node.tag_name();
        match self {
            Filter::TagName(t) => tag == t,
            Filter::TagNames(tags) => tags.iter().any(|t| t == tag),
            Filter::Predicate(f) => f(tag, node, options),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::TagName(tag) => f.debug_tuple("TagName").field(tag).finish(),
            Filter::TagNames(tags) => f.debug_tuple("TagNames").field(tags).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for Filter {
    fn from(tag: &str) -> Self {
        Filter::tag(tag)
    }
}

impl From<&[&str]> for Filter {
    fn from(tags: &[&str]) -> Self {
        Filter::tags(tags)
    }
}

fn replacement_fn<F>(f: F) -> ReplacementFn
where
    F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> Result<String, BoxError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// A rule defines how to convert a matched element to Markdown.
///
/// Rules are cheap to clone; their functions are shared.
#[derive(Clone)]
pub struct Rule {
    /// Filter to determine which elements this rule applies to
    pub filter: Filter,
    replacement: ReplacementFn,
    drop: Option<Filter>,
    append: Option<AppendFn>,
}

impl Rule {
    /// Create a new rule with an infallible replacement
    pub fn new<F>(filter: Filter, replacement: F) -> Self
    where
        F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        Self {
            filter,
            replacement: replacement_fn(move |node, content, ctx| {
                Ok(replacement(node, content, ctx))
            }),
            drop: None,
            append: None,
        }
    }

    /// Create a rule whose replacement can fail; the error aborts the
    /// conversion as [`RuleRender`](crate::RuledownError::RuleRender)
    pub fn try_new<F>(filter: Filter, replacement: F) -> Self
    where
        F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> Result<String, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            filter,
            replacement: replacement_fn(replacement),
            drop: None,
            append: None,
        }
    }

    /// Create a rule that matches a single tag
    pub fn for_tag<F>(tag: &str, replacement: F) -> Self
    where
        F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        Self::new(Filter::tag(tag), replacement)
    }

    /// Create a rule that matches multiple tags
    pub fn for_tags<F>(tags: &[&str], replacement: F) -> Self
    where
        F: Fn(&NodeRef<'_>, &str, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        Self::new(Filter::tags(tags), replacement)
    }

    /// Drop matched nodes that also satisfy `filter`: they are neither
    /// rendered nor recursed into
    pub fn with_drop(mut self, filter: Filter) -> Self {
        self.drop = Some(filter);
        self
    }

    /// Run `append` once after the walk and append its output
    pub fn with_append<F>(mut self, append: F) -> Self
    where
        F: Fn(&mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        self.append = Some(Arc::new(append));
        self
    }

    /// Check if this rule applies to an element
    pub fn matches(&self, node: &NodeRef<'_>, options: &Options) -> bool {
        self.filter.matches(node, options)
    }

    /// Check if a matched node is dropped
    pub fn drops(&self, node: &NodeRef<'_>, options: &Options) -> bool {
        self.drop
            .as_ref()
            .is_some_and(|filter| filter.matches(node, options))
    }

    /// Apply this rule's replacement
    pub fn render(
        &self,
        node: &NodeRef<'_>,
        content: &str,
        ctx: &mut RenderContext<'_>,
    ) -> Result<String, BoxError> {
        (self.replacement)(node, content, ctx)
    }

    /// Whether this rule has an append hook
    pub fn has_append(&self) -> bool {
        self.append.is_some()
    }

    pub(crate) fn append(&self, ctx: &mut RenderContext<'_>) -> Option<String> {
        self.append.as_ref().map(|append| append(ctx))
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("filter", &self.filter)
            .field("drop", &self.drop)
            .field("append", &self.append.is_some())
            .finish_non_exhaustive()
    }
}
