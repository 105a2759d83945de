//! HtmlConverter - the main entry point for HTML to Markdown conversion.

use std::sync::Arc;

use clipdown_core::{serialize, NodeKind, RenderOptions, Tree};
use tracing::debug;

use crate::builder;
use crate::dom::DomTree;
use crate::normalize;
use crate::Result;

/// Resolver mapping an emoji `(alias, src)` pair to the tokens stored on
/// the resulting `EmojiImg` node.
pub type EmojiResolver = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Options for HTML to Markdown conversion.
#[derive(Clone, Default)]
pub struct ConvertOptions {
    /// Escape the extended Protyle marker set and emit editor-style soft
    /// breaks, matching the WYSIWYG round trip.
    pub protyle_wysiwyg: bool,

    /// Emoji image resolver; without one, `EmojiImg` tokens fall back to
    /// the `:alias:` form.
    pub emoji_resolver: Option<EmojiResolver>,

    /// Options forwarded to the Markdown serializer, including any
    /// extension renderers.
    pub render: RenderOptions,
}

impl std::fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("protyle_wysiwyg", &self.protyle_wysiwyg)
            .field("emoji_resolver", &self.emoji_resolver.is_some())
            .field("render", &self.render)
            .finish()
    }
}

/// The main service for converting clipped HTML to Markdown.
pub struct HtmlConverter {
    options: ConvertOptions,
}

impl HtmlConverter {
    /// Create a converter with default options.
    pub fn new() -> Self {
        Self {
            options: ConvertOptions::default(),
        }
    }

    /// Create a converter with custom options.
    pub fn with_options(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Get the current options.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Get mutable access to options.
    pub fn options_mut(&mut self) -> &mut ConvertOptions {
        &mut self.options
    }

    /// Convert an HTML fragment to Markdown.
    pub fn convert(&self, html: &str) -> Result<String> {
        let tree = self.to_tree(html);
        let markdown = serialize(&tree, &self.options.render);
        debug!(
            html_len = html.len(),
            markdown_len = markdown.len(),
            "converted html fragment"
        );
        Ok(markdown)
    }

    /// Convert an HTML fragment to the Markdown AST, stopping before
    /// serialization.
    pub fn to_tree(&self, html: &str) -> Tree {
        let mut dom = DomTree::parse(html);
        normalize::normalize(&mut dom);
        let mut tree = builder::build_tree(dom, &self.options);
        post_process(&mut tree);
        tree
    }
}

impl Default for HtmlConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert an HTML fragment to Markdown with the given options.
pub fn html_to_markdown(html: &str, options: &ConvertOptions) -> Result<String> {
    HtmlConverter::with_options(options.clone()).convert(html)
}

/// Convert an HTML fragment to the Markdown AST with the given options.
pub fn html_to_tree(html: &str, options: &ConvertOptions) -> Tree {
    HtmlConverter::with_options(options.clone()).to_tree(html)
}

/// Structural repairs that can only be judged on the finished tree: a list
/// that ended up as a direct child of another list is moved under the
/// preceding list item.
fn post_process(tree: &mut Tree) {
    for id in tree.descendants(tree.root()) {
        if !matches!(tree.kind(id), NodeKind::List { .. }) {
            continue;
        }
        let parent_is_list = tree
            .parent(id)
            .map(|p| matches!(tree.kind(p), NodeKind::List { .. }))
            .unwrap_or(false);
        if !parent_is_list {
            continue;
        }
        if let Some(previous) = tree.previous(id) {
            tree.unlink(id);
            tree.append(previous, id);
        }
    }
}
