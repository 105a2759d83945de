//! # clipdown
//!
//! Convert clipped HTML fragments to CommonMark-compatible Markdown.
//!
//! The input is the kind of HTML a WYSIWYG editor or web clipper produces:
//! non-standard nesting, highlighter scaffolding, embedded formulas,
//! site-specific quirks. The pipeline normalizes the DOM, classifies each
//! element, builds a Markdown AST behind a movable insertion point, repairs
//! structural invariants in a second pass, and serializes the result.
//!
//! ## Example
//!
//! ```rust
//! use clipdown::{html_to_markdown, ConvertOptions};
//!
//! let markdown =
//!     html_to_markdown("<h1>Hello World</h1>", &ConvertOptions::default()).unwrap();
//! assert_eq!(markdown, "# Hello World\n");
//! ```

mod builder;
mod classify;
mod dom;
mod normalize;
mod service;
mod text;

pub use clipdown_core::{
    serialize, Align, ListType, Node, NodeId, NodeKind, NodeRenderer, RenderOptions, Tree, ZWSP,
};
pub use service::{html_to_markdown, html_to_tree, ConvertOptions, EmojiResolver, HtmlConverter};

/// Error type for conversion operations
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Failed to parse HTML: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
