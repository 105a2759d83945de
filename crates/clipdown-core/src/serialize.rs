//! Markdown AST serialization
//!
//! Converts the arena AST into Markdown text. Most marker nodes carry their
//! literal tokens, so inline rendering is mostly concatenation in tree
//! order; the block layer adds line structure (quote prefixes, list
//! indentation, table pipes, fences).

use crate::ast::{Align, NodeId, NodeKind, Tree};
use crate::options::RenderOptions;

/// Serialize a tree to Markdown. Output uses LF line endings and ends with
/// exactly one newline; an empty document renders as the empty string.
pub fn serialize(tree: &Tree, options: &RenderOptions) -> String {
    let blocks = render_block_children(tree, tree.root(), options);
    if blocks.is_empty() {
        return String::new();
    }
    let mut out = blocks.join("\n\n");
    while out.ends_with('\n') || out.ends_with(' ') {
        out.pop();
    }
    out.push('\n');
    out
}

/// Consult the extension renderer registered for this node's kind, if any.
fn extension(tree: &Tree, id: NodeId, options: &RenderOptions) -> Option<String> {
    options
        .renderers
        .get(tree.kind(id).name())
        .and_then(|f| f(tree, id))
}

/// Render the children of a container that may hold both blocks and loose
/// inlines. Runs of consecutive inlines collapse into one implicit
/// paragraph string; empty results are dropped.
fn render_block_children(tree: &Tree, id: NodeId, options: &RenderOptions) -> Vec<String> {
    let mut out = Vec::new();
    let mut inline = String::new();

    let flush = |inline: &mut String, out: &mut Vec<String>| {
        let trimmed = inline.trim_matches(' ');
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        inline.clear();
    };

    for c in tree.children(id) {
        let kind = tree.kind(c);
        if matches!(kind, NodeKind::BlockquoteMarker) {
            continue;
        }
        if kind.is_block() && !matches!(kind, NodeKind::Document) {
            flush(&mut inline, &mut out);
            let rendered = render_block(tree, c, options);
            if !rendered.is_empty() {
                out.push(rendered);
            }
        } else {
            inline.push_str(&render_node(tree, c, options));
        }
    }
    flush(&mut inline, &mut out);
    out
}

fn render_block(tree: &Tree, id: NodeId, options: &RenderOptions) -> String {
    if let Some(replaced) = extension(tree, id, options) {
        return replaced;
    }

    match tree.kind(id) {
        NodeKind::Paragraph => render_inline_children(tree, id, options)
            .trim_matches(' ')
            .to_string(),

        NodeKind::Heading { level } => {
            let hashes = tree
                .child_by(id, |k| matches!(k, NodeKind::HeadingHashMarker))
                .map(|m| tree.node(m).tokens.clone())
                .unwrap_or_else(|| "#".repeat(*level as usize));
            let mut content = String::new();
            for c in tree.children(id) {
                if matches!(tree.kind(c), NodeKind::HeadingHashMarker) {
                    continue;
                }
                content.push_str(&render_node(tree, c, options));
            }
            format!("{} {}", hashes, content.trim_matches(' '))
        }

        NodeKind::Blockquote => {
            let inner = render_block_children(tree, id, options).join("\n\n");
            inner
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }

        NodeKind::List { .. } => render_list(tree, id, options),

        NodeKind::Table { aligns } => render_table(tree, id, aligns, options),

        NodeKind::CodeBlock { .. } => {
            let mut info = String::new();
            let mut code = String::new();
            for c in tree.children(id) {
                match tree.kind(c) {
                    NodeKind::CodeBlockFenceInfoMarker { info: i } => info = i.clone(),
                    NodeKind::CodeBlockCode => code = tree.node(c).tokens.clone(),
                    _ => {}
                }
            }
            let mut out = format!("```{}\n{}", info, code);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```");
            out
        }

        NodeKind::MathBlock => {
            let content = tree
                .child_by(id, |k| matches!(k, NodeKind::MathBlockContent))
                .map(|c| tree.node(c).tokens.clone())
                .unwrap_or_default();
            format!("$$\n{}\n$$", content)
        }

        NodeKind::HtmlBlock => tree.node(id).tokens.clone(),

        NodeKind::ThematicBreak => "---".to_string(),

        // Table internals are rendered by their table; a stray one renders
        // its inline content.
        NodeKind::TableHead | NodeKind::TableRow | NodeKind::TableCell { .. } => {
            render_inline_children(tree, id, options)
        }

        NodeKind::ListItem { .. } => render_inline_children(tree, id, options),

        _ => render_node(tree, id, options),
    }
}

fn render_list(tree: &Tree, id: NodeId, options: &RenderOptions) -> String {
    let mut lines = Vec::new();
    for item in tree.children(id) {
        let NodeKind::ListItem { marker, .. } = tree.kind(item) else {
            // A list the post-processor could not attach to an item (no
            // preceding sibling) renders at the same level.
            if matches!(tree.kind(item), NodeKind::List { .. }) {
                let nested = render_list(tree, item, options);
                if !nested.is_empty() {
                    lines.push(nested);
                }
            }
            continue;
        };
        let marker = marker.clone();
        let indent = " ".repeat(marker.len() + 1);
        let content = render_block_children(tree, item, options).join("\n");

        let mut item_lines = content.lines();
        match item_lines.next() {
            Some(first) => lines.push(format!("{} {}", marker, first)),
            None => lines.push(marker.clone()),
        }
        for line in item_lines {
            if line.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{}{}", indent, line));
            }
        }
    }
    lines.join("\n")
}

fn render_table(tree: &Tree, id: NodeId, aligns: &[Align], options: &RenderOptions) -> String {
    // Collect rows in document order; thead is transparent here.
    let mut rows = Vec::new();
    for c in tree.children(id) {
        match tree.kind(c) {
            NodeKind::TableHead => {
                for r in tree.children(c) {
                    if matches!(tree.kind(r), NodeKind::TableRow) {
                        rows.push(r);
                    }
                }
            }
            NodeKind::TableRow => rows.push(c),
            _ => {}
        }
    }
    let Some(&header) = rows.first() else {
        return String::new();
    };

    let render_row = |row: NodeId| -> String {
        let mut line = String::from("|");
        for cell in tree.children(row) {
            if !matches!(tree.kind(cell), NodeKind::TableCell { .. }) {
                continue;
            }
            line.push_str(render_inline_children(tree, cell, options).trim_matches(' '));
            line.push('|');
        }
        line
    };

    let ncols = tree
        .children(header)
        .iter()
        .filter(|&&c| matches!(tree.kind(c), NodeKind::TableCell { .. }))
        .count();

    let mut out = render_row(header);
    out.push('\n');
    out.push('|');
    for i in 0..ncols {
        out.push_str(match aligns.get(i).copied().unwrap_or(Align::None) {
            Align::None => "---",
            Align::Left => ":---",
            Align::Center => ":---:",
            Align::Right => "---:",
        });
        out.push('|');
    }
    for row in &rows[1..] {
        out.push('\n');
        out.push_str(&render_row(*row));
    }
    out
}

fn render_inline_children(tree: &Tree, id: NodeId, options: &RenderOptions) -> String {
    let mut out = String::new();
    for c in tree.children(id) {
        out.push_str(&render_node(tree, c, options));
    }
    out
}

fn render_node(tree: &Tree, id: NodeId, options: &RenderOptions) -> String {
    if let Some(replaced) = extension(tree, id, options) {
        return replaced;
    }

    match tree.kind(id) {
        NodeKind::Text
        | NodeKind::LinkText
        | NodeKind::CodeSpanContent
        | NodeKind::InlineMathContent
        | NodeKind::MathBlockContent
        | NodeKind::CodeBlockCode
        | NodeKind::EmojiAlias
        | NodeKind::LinkDest => tree.node(id).tokens.clone(),

        // Paired decoration markers carry their literal tokens.
        NodeKind::HeadingHashMarker
        | NodeKind::BlockquoteMarker
        | NodeKind::EmOpenMarker
        | NodeKind::EmCloseMarker
        | NodeKind::StrongOpenMarker
        | NodeKind::StrongCloseMarker
        | NodeKind::StrikethroughOpenMarker
        | NodeKind::StrikethroughCloseMarker
        | NodeKind::MarkOpenMarker
        | NodeKind::MarkCloseMarker
        | NodeKind::SupOpenMarker
        | NodeKind::SupCloseMarker
        | NodeKind::SubOpenMarker
        | NodeKind::SubCloseMarker
        | NodeKind::CodeSpanOpenMarker
        | NodeKind::CodeSpanCloseMarker
        | NodeKind::CodeBlockFenceOpenMarker { .. }
        | NodeKind::CodeBlockFenceCloseMarker { .. }
        | NodeKind::MathBlockOpenMarker
        | NodeKind::MathBlockCloseMarker
        | NodeKind::InlineMathOpenMarker
        | NodeKind::InlineMathCloseMarker => tree.node(id).tokens.clone(),

        NodeKind::CodeBlockFenceInfoMarker { info } => info.clone(),

        NodeKind::Bang => "!".to_string(),
        NodeKind::OpenBracket => "[".to_string(),
        NodeKind::CloseBracket => "]".to_string(),
        NodeKind::OpenParen => "(".to_string(),
        NodeKind::CloseParen => ")".to_string(),
        NodeKind::LinkSpace => " ".to_string(),
        NodeKind::LinkTitle => format!("\"{}\"", tree.node(id).tokens),

        NodeKind::HardBreak => "\n".to_string(),
        NodeKind::Br => "<br />".to_string(),

        NodeKind::TaskListItemMarker { checked } => {
            if *checked { "[X]" } else { "[ ]" }.to_string()
        }

        // EmojiImg tokens hold the resolved rendering for tree consumers;
        // the text output keeps the alias.
        NodeKind::Emphasis
        | NodeKind::Strong
        | NodeKind::Strikethrough
        | NodeKind::Mark
        | NodeKind::Sup
        | NodeKind::Sub
        | NodeKind::CodeSpan
        | NodeKind::InlineMath
        | NodeKind::Link
        | NodeKind::Image
        | NodeKind::Emoji
        | NodeKind::EmojiImg
        | NodeKind::Document => render_inline_children(tree, id, options),

        kind if kind.is_block() => render_block(tree, id, options),

        _ => render_inline_children(tree, id, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ListType;

    fn options() -> RenderOptions {
        RenderOptions::default()
    }

    fn paragraph_with_text(tree: &mut Tree, text: &str) -> NodeId {
        let root = tree.root();
        let p = tree.append_new(root, NodeKind::Paragraph);
        tree.append_text(p, NodeKind::Text, text);
        p
    }

    #[test]
    fn test_empty_document() {
        let tree = Tree::new();
        assert_eq!(serialize(&tree, &options()), "");
    }

    #[test]
    fn test_paragraph() {
        let mut tree = Tree::new();
        paragraph_with_text(&mut tree, "foo");
        assert_eq!(serialize(&tree, &options()), "foo\n");
    }

    #[test]
    fn test_two_blocks_blank_line() {
        let mut tree = Tree::new();
        paragraph_with_text(&mut tree, "a");
        paragraph_with_text(&mut tree, "b");
        assert_eq!(serialize(&tree, &options()), "a\n\nb\n");
    }

    #[test]
    fn test_heading() {
        let mut tree = Tree::new();
        let root = tree.root();
        let h = tree.append_new(root, NodeKind::Heading { level: 2 });
        tree.append_text(h, NodeKind::HeadingHashMarker, "##");
        tree.append_text(h, NodeKind::Text, "foo");
        assert_eq!(serialize(&tree, &options()), "## foo\n");
    }

    #[test]
    fn test_strong_markers() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append_new(root, NodeKind::Paragraph);
        let strong = tree.append_new(p, NodeKind::Strong);
        tree.append_text(strong, NodeKind::StrongOpenMarker, "**");
        tree.append_text(strong, NodeKind::Text, "foo");
        tree.append_text(strong, NodeKind::StrongCloseMarker, "**");
        assert_eq!(serialize(&tree, &options()), "**foo**\n");
    }

    #[test]
    fn test_blockquote() {
        let mut tree = Tree::new();
        let root = tree.root();
        let quote = tree.append_new(root, NodeKind::Blockquote);
        tree.append_text(quote, NodeKind::BlockquoteMarker, ">");
        tree.append_text(quote, NodeKind::Text, "foo");
        assert_eq!(serialize(&tree, &options()), "> foo\n");
    }

    #[test]
    fn test_nested_list_indent() {
        let mut tree = Tree::new();
        let root = tree.root();
        let list = tree.append_new(root, NodeKind::List {
            typ: ListType::Bullet,
            tight: true,
        });
        let item = tree.append_new(list, NodeKind::ListItem {
            marker: "*".to_string(),
            bullet: Some('*'),
        });
        tree.append_text(item, NodeKind::Text, "foo");
        let inner = tree.append_new(item, NodeKind::List {
            typ: ListType::Bullet,
            tight: true,
        });
        let inner_item = tree.append_new(inner, NodeKind::ListItem {
            marker: "*".to_string(),
            bullet: Some('*'),
        });
        tree.append_text(inner_item, NodeKind::Text, "bar");

        assert_eq!(serialize(&tree, &options()), "* foo\n  * bar\n");
    }

    #[test]
    fn test_task_list_marker() {
        let mut tree = Tree::new();
        let root = tree.root();
        let list = tree.append_new(root, NodeKind::List {
            typ: ListType::Task,
            tight: true,
        });
        let item = tree.append_new(list, NodeKind::ListItem {
            marker: "*".to_string(),
            bullet: Some('*'),
        });
        tree.append_new(item, NodeKind::TaskListItemMarker { checked: true });
        tree.append_text(item, NodeKind::Text, " foo");

        assert_eq!(serialize(&tree, &options()), "* [X] foo\n");
    }

    #[test]
    fn test_code_block() {
        let mut tree = Tree::new();
        let root = tree.root();
        let block = tree.append_new(root, NodeKind::CodeBlock { fenced: true });
        tree.append_text(block, NodeKind::CodeBlockFenceOpenMarker { len: 3 }, "```");
        tree.append_new(block, NodeKind::CodeBlockFenceInfoMarker {
            info: "go".to_string(),
        });
        tree.append_text(block, NodeKind::CodeBlockCode, "x");
        tree.append_text(block, NodeKind::CodeBlockFenceCloseMarker { len: 3 }, "```");

        assert_eq!(serialize(&tree, &options()), "```go\nx\n```\n");
    }

    #[test]
    fn test_code_block_empty_body() {
        let mut tree = Tree::new();
        let root = tree.root();
        let block = tree.append_new(root, NodeKind::CodeBlock { fenced: true });
        tree.append_text(block, NodeKind::CodeBlockFenceOpenMarker { len: 3 }, "```");
        tree.append_new(block, NodeKind::CodeBlockFenceInfoMarker {
            info: "go".to_string(),
        });
        tree.append_text(block, NodeKind::CodeBlockCode, "");
        tree.append_text(block, NodeKind::CodeBlockFenceCloseMarker { len: 3 }, "```");

        assert_eq!(serialize(&tree, &options()), "```go\n\n```\n");
    }

    #[test]
    fn test_table() {
        let mut tree = Tree::new();
        let root = tree.root();
        let table = tree.append_new(root, NodeKind::Table {
            aligns: vec![Align::None, Align::Right],
        });
        let head = tree.append_new(table, NodeKind::TableHead);
        let row = tree.append_new(head, NodeKind::TableRow);
        for text in ["abc", "def"] {
            let cell = tree.append_new(row, NodeKind::TableCell { align: Align::None });
            tree.append_text(cell, NodeKind::Text, text);
        }
        let body_row = tree.append_new(table, NodeKind::TableRow);
        for text in ["1", "2"] {
            let cell = tree.append_new(body_row, NodeKind::TableCell { align: Align::None });
            tree.append_text(cell, NodeKind::Text, text);
        }

        assert_eq!(
            serialize(&tree, &options()),
            "|abc|def|\n|---|---:|\n|1|2|\n"
        );
    }

    #[test]
    fn test_math_block() {
        let mut tree = Tree::new();
        let root = tree.root();
        let math = tree.append_new(root, NodeKind::MathBlock);
        tree.append_text(math, NodeKind::MathBlockOpenMarker, "$$");
        tree.append_text(math, NodeKind::MathBlockContent, "E=mc^2");
        tree.append_text(math, NodeKind::MathBlockCloseMarker, "$$");

        assert_eq!(serialize(&tree, &options()), "$$\nE=mc^2\n$$\n");
    }

    #[test]
    fn test_emoji_renders_alias() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.append_new(root, NodeKind::Paragraph);
        let emoji = tree.append_new(p, NodeKind::Emoji);
        let img = tree.append_text(emoji, NodeKind::EmojiImg, "<img src=\"octocat.png\">");
        tree.append_text(img, NodeKind::EmojiAlias, ":octocat:");

        assert_eq!(serialize(&tree, &options()), ":octocat:\n");
    }

    #[test]
    fn test_loose_inlines_group_into_paragraph() {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.append_text(root, NodeKind::Text, "foo");
        let hard = tree.append_new(root, NodeKind::HardBreak);
        tree.node_mut(hard).tokens = "\n".to_string();
        tree.append_text(root, NodeKind::Text, "bar");

        assert_eq!(serialize(&tree, &options()), "foo\nbar\n");
    }

    #[test]
    fn test_extension_renderer_overrides() {
        let mut tree = Tree::new();
        paragraph_with_text(&mut tree, "ignored");
        let options = RenderOptions::new().renderer("Paragraph", |_, _| Some("custom".to_string()));
        assert_eq!(serialize(&tree, &options), "custom\n");
    }
}
