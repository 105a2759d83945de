//! Configuration options for Markdown serialization

use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{NodeId, Tree};

/// Custom renderer for a single node kind.
///
/// Returning `Some` replaces the default rendering of the node (subtree
/// included); returning `None` falls back to the built-in behavior.
pub type NodeRenderer = Arc<dyn Fn(&Tree, NodeId) -> Option<String> + Send + Sync>;

/// Options for Markdown serialization
#[derive(Clone, Default)]
pub struct RenderOptions {
    /// Extension renderers keyed by node-kind name (see `NodeKind::name`).
    /// Consulted before the default rendering of every node. The map is
    /// read-only once serialization starts.
    pub renderers: IndexMap<&'static str, NodeRenderer>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension renderer for a node kind.
    pub fn renderer<F>(mut self, kind_name: &'static str, f: F) -> Self
    where
        F: Fn(&Tree, NodeId) -> Option<String> + Send + Sync + 'static,
    {
        self.renderers.insert(kind_name, Arc::new(f));
        self
    }
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("renderers", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_registration() {
        let options = RenderOptions::new().renderer("MathBlock", |_, _| Some(String::new()));
        assert!(options.renderers.contains_key("MathBlock"));
        assert!(!options.renderers.contains_key("Paragraph"));
    }
}
