//! Markdown Abstract Syntax Tree
//!
//! This module defines the arena tree produced by the HTML conversion walk.
//! Nodes carry parent/sibling links so the builder can keep a movable
//! insertion point ("tip") and so post-processing can relocate subtrees.

/// Zero-width separator inserted between adjacent inline decorations so the
/// serializer never merges their delimiters. Preserved verbatim in output.
pub const ZWSP: &str = "\u{200B}";

/// List flavor carried by [`NodeKind::List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    Bullet,
    Ordered,
    Task,
}

/// Column alignment code for tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Align {
    /// Parse an HTML `align` attribute value.
    pub fn from_attr(value: &str) -> Self {
        match value {
            "left" => Align::Left,
            "center" => Align::Center,
            "right" => Align::Right,
            _ => Align::None,
        }
    }
}

/// The closed set of node kinds.
///
/// Container and leaf blocks come first, then inlines, then the literal
/// marker nodes the serializer writes out verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Container blocks
    Document,
    Paragraph,
    Blockquote,
    List { typ: ListType, tight: bool },
    ListItem { marker: String, bullet: Option<char> },
    Heading { level: u8 },
    Table { aligns: Vec<Align> },
    TableHead,
    TableRow,
    TableCell { align: Align },
    CodeBlock { fenced: bool },
    MathBlock,
    HtmlBlock,

    // Leaf blocks
    ThematicBreak,
    HardBreak,
    /// Soft break variant used inside tables and by the WYSIWYG editor.
    Br,

    // Inlines
    Text,
    LinkText,
    Emphasis,
    Strong,
    Strikethrough,
    Mark,
    Sup,
    Sub,
    CodeSpan,
    InlineMath,
    Link,
    Image,
    Emoji,
    EmojiImg,
    EmojiAlias,

    // Marker nodes
    HeadingHashMarker,
    BlockquoteMarker,
    EmOpenMarker,
    EmCloseMarker,
    StrongOpenMarker,
    StrongCloseMarker,
    StrikethroughOpenMarker,
    StrikethroughCloseMarker,
    MarkOpenMarker,
    MarkCloseMarker,
    SupOpenMarker,
    SupCloseMarker,
    SubOpenMarker,
    SubCloseMarker,
    CodeSpanOpenMarker,
    CodeSpanContent,
    CodeSpanCloseMarker,
    CodeBlockFenceOpenMarker { len: u8 },
    CodeBlockFenceInfoMarker { info: String },
    CodeBlockCode,
    CodeBlockFenceCloseMarker { len: u8 },
    MathBlockOpenMarker,
    MathBlockContent,
    MathBlockCloseMarker,
    InlineMathOpenMarker,
    InlineMathContent,
    InlineMathCloseMarker,
    Bang,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    LinkDest,
    LinkSpace,
    LinkTitle,
    TaskListItemMarker { checked: bool },
}

impl NodeKind {
    /// Stable name used as the key for extension renderers.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "Document",
            NodeKind::Paragraph => "Paragraph",
            NodeKind::Blockquote => "Blockquote",
            NodeKind::List { .. } => "List",
            NodeKind::ListItem { .. } => "ListItem",
            NodeKind::Heading { .. } => "Heading",
            NodeKind::Table { .. } => "Table",
            NodeKind::TableHead => "TableHead",
            NodeKind::TableRow => "TableRow",
            NodeKind::TableCell { .. } => "TableCell",
            NodeKind::CodeBlock { .. } => "CodeBlock",
            NodeKind::MathBlock => "MathBlock",
            NodeKind::HtmlBlock => "HtmlBlock",
            NodeKind::ThematicBreak => "ThematicBreak",
            NodeKind::HardBreak => "HardBreak",
            NodeKind::Br => "Br",
            NodeKind::Text => "Text",
            NodeKind::LinkText => "LinkText",
            NodeKind::Emphasis => "Emphasis",
            NodeKind::Strong => "Strong",
            NodeKind::Strikethrough => "Strikethrough",
            NodeKind::Mark => "Mark",
            NodeKind::Sup => "Sup",
            NodeKind::Sub => "Sub",
            NodeKind::CodeSpan => "CodeSpan",
            NodeKind::InlineMath => "InlineMath",
            NodeKind::Link => "Link",
            NodeKind::Image => "Image",
            NodeKind::Emoji => "Emoji",
            NodeKind::EmojiImg => "EmojiImg",
            NodeKind::EmojiAlias => "EmojiAlias",
            NodeKind::HeadingHashMarker => "HeadingHashMarker",
            NodeKind::BlockquoteMarker => "BlockquoteMarker",
            NodeKind::EmOpenMarker => "EmOpenMarker",
            NodeKind::EmCloseMarker => "EmCloseMarker",
            NodeKind::StrongOpenMarker => "StrongOpenMarker",
            NodeKind::StrongCloseMarker => "StrongCloseMarker",
            NodeKind::StrikethroughOpenMarker => "StrikethroughOpenMarker",
            NodeKind::StrikethroughCloseMarker => "StrikethroughCloseMarker",
            NodeKind::MarkOpenMarker => "MarkOpenMarker",
            NodeKind::MarkCloseMarker => "MarkCloseMarker",
            NodeKind::SupOpenMarker => "SupOpenMarker",
            NodeKind::SupCloseMarker => "SupCloseMarker",
            NodeKind::SubOpenMarker => "SubOpenMarker",
            NodeKind::SubCloseMarker => "SubCloseMarker",
            NodeKind::CodeSpanOpenMarker => "CodeSpanOpenMarker",
            NodeKind::CodeSpanContent => "CodeSpanContent",
            NodeKind::CodeSpanCloseMarker => "CodeSpanCloseMarker",
            NodeKind::CodeBlockFenceOpenMarker { .. } => "CodeBlockFenceOpenMarker",
            NodeKind::CodeBlockFenceInfoMarker { .. } => "CodeBlockFenceInfoMarker",
            NodeKind::CodeBlockCode => "CodeBlockCode",
            NodeKind::CodeBlockFenceCloseMarker { .. } => "CodeBlockFenceCloseMarker",
            NodeKind::MathBlockOpenMarker => "MathBlockOpenMarker",
            NodeKind::MathBlockContent => "MathBlockContent",
            NodeKind::MathBlockCloseMarker => "MathBlockCloseMarker",
            NodeKind::InlineMathOpenMarker => "InlineMathOpenMarker",
            NodeKind::InlineMathContent => "InlineMathContent",
            NodeKind::InlineMathCloseMarker => "InlineMathCloseMarker",
            NodeKind::Bang => "Bang",
            NodeKind::OpenBracket => "OpenBracket",
            NodeKind::CloseBracket => "CloseBracket",
            NodeKind::OpenParen => "OpenParen",
            NodeKind::CloseParen => "CloseParen",
            NodeKind::LinkDest => "LinkDest",
            NodeKind::LinkSpace => "LinkSpace",
            NodeKind::LinkTitle => "LinkTitle",
            NodeKind::TaskListItemMarker { .. } => "TaskListItemMarker",
        }
    }

    /// Block-level kinds, container or leaf.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Document
                | NodeKind::Paragraph
                | NodeKind::Blockquote
                | NodeKind::List { .. }
                | NodeKind::ListItem { .. }
                | NodeKind::Heading { .. }
                | NodeKind::Table { .. }
                | NodeKind::TableHead
                | NodeKind::TableRow
                | NodeKind::TableCell { .. }
                | NodeKind::CodeBlock { .. }
                | NodeKind::MathBlock
                | NodeKind::HtmlBlock
                | NodeKind::ThematicBreak
        )
    }

    /// Blocks that may hold further blocks.
    pub fn is_container_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Document
                | NodeKind::Blockquote
                | NodeKind::List { .. }
                | NodeKind::ListItem { .. }
        )
    }

    /// Inline decorations that must not sit flush against a kindred sibling.
    pub fn is_emphasis_like(&self) -> bool {
        matches!(
            self,
            NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Strikethrough
                | NodeKind::Mark
                | NodeKind::Sup
                | NodeKind::Sub
        )
    }
}

/// Index handle into a [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single AST node. Links are arena indices; `tokens` holds literal text
/// for the kinds that carry it.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub tokens: String,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub previous: Option<NodeId>,
    pub next: Option<NodeId>,
}

/// Arena-backed Markdown AST. The root is always a `Document` node.
///
/// Unlinked nodes stay allocated until the tree is dropped; the tree lives
/// for a single conversion, so nothing bothers to reclaim them.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        let mut tree = Tree { nodes: Vec::new() };
        tree.new_node(NodeKind::Document);
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Allocate a detached node.
    pub fn new_node(&mut self, kind: NodeKind) -> NodeId {
        self.new_text_node(kind, String::new())
    }

    /// Allocate a detached node carrying literal tokens.
    pub fn new_text_node(&mut self, kind: NodeKind, tokens: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            tokens: tokens.into(),
            parent: None,
            first_child: None,
            last_child: None,
            previous: None,
            next: None,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].last_child
    }

    pub fn previous(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].previous
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next
    }

    /// Direct children, eagerly collected so callers may mutate while
    /// iterating.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.first_child(id);
        while let Some(c) = cursor {
            out.push(c);
            cursor = self.next(c);
        }
        out
    }

    /// First direct child whose kind matches the predicate.
    pub fn child_by(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.children(id).into_iter().find(|&c| pred(self.kind(c)))
    }

    /// All direct children whose kind matches the predicate.
    pub fn children_by(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
        self.children(id)
            .into_iter()
            .filter(|&c| pred(self.kind(c)))
            .collect()
    }

    /// Whether any ancestor of `id` matches the predicate.
    pub fn ancestor_is(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> bool {
        let mut cursor = self.parent(id);
        while let Some(a) = cursor {
            if pred(self.kind(a)) {
                return true;
            }
            cursor = self.parent(a);
        }
        false
    }

    /// Nearest ancestor matching the predicate.
    pub fn ancestor_by(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut cursor = self.parent(id);
        while let Some(a) = cursor {
            if pred(self.kind(a)) {
                return Some(a);
            }
            cursor = self.parent(a);
        }
        None
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        let prev_last = self.nodes[parent.0].last_child;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].previous = prev_last;
        if let Some(last) = prev_last {
            self.nodes[last.0].next = Some(child);
        } else {
            self.nodes[parent.0].first_child = Some(child);
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Append a freshly allocated node and return its id.
    pub fn append_new(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.new_node(kind);
        self.append(parent, id);
        id
    }

    /// Append a freshly allocated token-carrying node and return its id.
    pub fn append_text(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        tokens: impl Into<String>,
    ) -> NodeId {
        let id = self.new_text_node(kind, tokens);
        self.append(parent, id);
        id
    }

    pub fn insert_before(&mut self, sibling: NodeId, new: NodeId) {
        self.unlink(new);
        let parent = self.nodes[sibling.0].parent;
        let prev = self.nodes[sibling.0].previous;
        self.nodes[new.0].parent = parent;
        self.nodes[new.0].previous = prev;
        self.nodes[new.0].next = Some(sibling);
        self.nodes[sibling.0].previous = Some(new);
        match prev {
            Some(p) => self.nodes[p.0].next = Some(new),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = Some(new);
                }
            }
        }
    }

    pub fn insert_after(&mut self, sibling: NodeId, new: NodeId) {
        self.unlink(new);
        let parent = self.nodes[sibling.0].parent;
        let next = self.nodes[sibling.0].next;
        self.nodes[new.0].parent = parent;
        self.nodes[new.0].previous = Some(sibling);
        self.nodes[new.0].next = next;
        self.nodes[sibling.0].next = Some(new);
        match next {
            Some(n) => self.nodes[n.0].previous = Some(new),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = Some(new);
                }
            }
        }
    }

    /// Detach a node (and its subtree) from its parent and siblings.
    pub fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let n = &self.nodes[id.0];
            (n.parent, n.previous, n.next)
        };
        match prev {
            Some(p) => self.nodes[p.0].next = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = next;
                }
            }
        }
        match next {
            Some(n) => self.nodes[n.0].previous = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = prev;
                }
            }
        }
        let n = &mut self.nodes[id.0];
        n.parent = None;
        n.previous = None;
        n.next = None;
    }

    /// Pre-order walk of the subtree rooted at `id`, ids collected up front.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            let children = self.children(n);
            for c in children.into_iter().rev() {
                stack.push(c);
            }
        }
        out
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
