//! clipdown-core - Markdown AST and serialization
//!
//! This crate provides the arena-backed Markdown AST produced by the HTML
//! conversion walk in the `clipdown` crate, and the serializer that turns a
//! finished tree back into Markdown text.
//!
//! # Architecture
//!
//! ```text
//! HTML fragment ──normalize──▶ DOM walk ──▶ ┌──────────────┐
//!                                           │ Markdown AST │ ──▶ Markdown
//!                                           └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use clipdown_core::{NodeKind, RenderOptions, serialize, Tree};
//!
//! let mut tree = Tree::new();
//! let root = tree.root();
//! let heading = tree.append_new(root, NodeKind::Heading { level: 1 });
//! tree.append_text(heading, NodeKind::HeadingHashMarker, "#");
//! tree.append_text(heading, NodeKind::Text, "Hello World");
//!
//! let markdown = serialize(&tree, &RenderOptions::default());
//! assert_eq!(markdown, "# Hello World\n");
//! ```

mod ast;
mod options;
mod serialize;

pub use ast::{Align, ListType, Node, NodeId, NodeKind, Tree, ZWSP};
pub use options::{NodeRenderer, RenderOptions};
pub use serialize::serialize;
