//! The conversion walk: depth-first over the DOM, growing the Markdown AST
//! behind a movable insertion point (the "tip").
//!
//! Each element either appends nodes at the tip, descends the tip into a
//! freshly opened container, or is traversed transparently. Post-visit
//! restores the tip and emits closing markers. The walk never fails;
//! malformed shapes fall through to the transparent path.

use clipdown_core::{Align, ListType, NodeId, NodeKind, Tree, ZWSP};

use crate::classify;
use crate::dom::{DomId, DomTree, Tag};
use crate::normalize::is_ignorable;
use crate::service::ConvertOptions;
use crate::text;

const HEADING_TAGS: [Tag; 6] = [Tag::H1, Tag::H2, Tag::H3, Tag::H4, Tag::H5, Tag::H6];

/// Build the Markdown AST from a normalized DOM.
pub(crate) fn build_tree(dom: DomTree, options: &ConvertOptions) -> Tree {
    let tree = Tree::new();
    let tip = tree.root();
    let mut builder = AstBuilder {
        dom,
        tree,
        options,
        tip,
    };
    let root = builder.dom.root();
    builder.walk_children(root);
    builder.tree
}

struct AstBuilder<'a> {
    dom: DomTree,
    tree: Tree,
    options: &'a ConvertOptions,
    tip: NodeId,
}

impl AstBuilder<'_> {
    fn walk_children(&mut self, n: DomId) {
        // The next pointer is re-read after each visit: a few cases detach
        // the upcoming sibling (consumed math scripts).
        let mut cursor = self.dom.first_child(n);
        while let Some(c) = cursor {
            self.walk(c);
            cursor = self.dom.next_sibling(c);
        }
    }

    fn pop_tip(&mut self) {
        if let Some(parent) = self.tree.parent(self.tip) {
            self.tip = parent;
        }
    }

    fn walk(&mut self, n: DomId) {
        if is_ignorable(&self.dom, n) {
            return;
        }
        if self.dom.is_text(n) {
            self.visit_text(n);
            return;
        }
        if !self.dom.is_element(n) {
            return;
        }

        let tag = self.dom.tag(n);
        if tag == Tag::Unknown {
            // Custom elements are traversed transparently.
            self.walk_children(n);
            return;
        }

        // Container node opened by this element, if any; closing markers
        // attach to it on post-visit.
        let mut created: Option<NodeId> = None;
        // How many tip levels this element descended.
        let mut pops = 0usize;

        match tag {
            Tag::P | Tag::Div | Tag::Section => {
                if matches!(self.tree.kind(self.tip), NodeKind::Link) {
                    // paragraphs never nest in links
                } else if self.dom.parent_is(n, &[Tag::Table]) {
                    let prev_nl = self
                        .dom
                        .prev_sibling(n)
                        .map(|p| self.dom.data(p).contains('\n'))
                        .unwrap_or(false);
                    let next_nl = self
                        .dom
                        .next_sibling(n)
                        .map(|s| self.dom.data(s).contains('\n'))
                        .unwrap_or(false);
                    if !prev_nl && !next_nl && self.tree.first_child(self.tip).is_some() {
                        self.tree.append_new(self.tip, NodeKind::Br);
                    }
                } else if matches!(self.tree.kind(self.tip), NodeKind::Heading { .. }) {
                    // block splits inside a heading are ignored
                } else {
                    let class = self.dom.attr_or_empty(n, "class").to_string();
                    if tag == Tag::Div {
                        // GitHub-style highlighted source blocks
                        if let Some(language) = classify::highlight_div_language(&class) {
                            let content = self.dom.text(n);
                            let block = self.new_code_block(language, content);
                            self.tree.append(self.tip, block);
                            return;
                        }
                        // CSDN formula: a MathJax div with its source in the
                        // adjacent script element
                        if class.contains("MathJax") {
                            if let Some(next) = self.dom.next_sibling(n) {
                                if self.dom.tag(next) == Tag::Script
                                    && self.dom.attr_or_empty(next, "type").contains("math/tex")
                                {
                                    let tex = self.dom.text(next);
                                    self.append_math_block(&tex);
                                    self.dom.unlink(next);
                                    return;
                                }
                            }
                        }
                        // Wikipedia formula clipping
                        let tex = self.dom.attr_or_empty(n, "data-tex").trim().to_string();
                        if !tex.is_empty() {
                            self.append_math_block(&tex);
                            return;
                        }
                    }
                    if class.to_lowercase().contains("mathjax") {
                        return;
                    }
                    if self.dom.text(n).trim().is_empty()
                        && !self
                            .dom
                            .has_descendant_tag(n, &[Tag::Img, Tag::Picture, Tag::Annotation])
                    {
                        return;
                    }
                    let node = self.tree.append_new(self.tip, NodeKind::Paragraph);
                    self.tip = node;
                    pops = 1;
                }
            }

            Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4 | Tag::H5 | Tag::H6 => {
                if !matches!(self.tree.kind(self.tip), NodeKind::Link) {
                    let level = tag.heading_level().unwrap_or(1);
                    let node = self.tree.append_new(self.tip, NodeKind::Heading { level });
                    self.tree.append_text(
                        node,
                        NodeKind::HeadingHashMarker,
                        "#".repeat(level as usize),
                    );
                    self.tip = node;
                    pops = 1;
                }
            }

            Tag::Hr => {
                self.tree.append_new(self.tip, NodeKind::ThematicBreak);
            }

            Tag::Blockquote => {
                let node = self.tree.append_new(self.tip, NodeKind::Blockquote);
                self.tree.append_text(node, NodeKind::BlockquoteMarker, ">");
                self.tip = node;
                pops = 1;
            }

            Tag::Ol | Tag::Ul => {
                let typ = if tag == Tag::Ol {
                    ListType::Ordered
                } else {
                    ListType::Bullet
                };
                let node = self
                    .tree
                    .append_new(self.tip, NodeKind::List { typ, tight: true });
                self.tip = node;
                pops = 1;
            }

            Tag::Li => {
                let (marker, bullet) = self.list_item_marker(n);
                let node = self
                    .tree
                    .append_new(self.tip, NodeKind::ListItem { marker, bullet });
                self.tip = node;
                pops = 1;
            }

            Tag::Pre => {
                self.visit_pre(n);
                return;
            }

            Tag::Em | Tag::I => {
                if !self.dom.text(n).trim().is_empty()
                    && !matches!(self.tree.kind(self.tip), NodeKind::Emphasis)
                    && !self
                        .tree
                        .ancestor_is(self.tip, |k| matches!(k, NodeKind::Emphasis))
                {
                    self.zwsp_if_last_is(|k| matches!(k, NodeKind::Strong | NodeKind::Emphasis));
                    let node = self.tree.append_new(self.tip, NodeKind::Emphasis);
                    self.tree.append_text(node, NodeKind::EmOpenMarker, "*");
                    self.tip = node;
                    created = Some(node);
                    pops = 1;
                }
            }

            Tag::Strong | Tag::B => {
                if !self.dom.text(n).trim().is_empty()
                    && !matches!(self.tree.kind(self.tip), NodeKind::Strong)
                    && !self
                        .tree
                        .ancestor_is(self.tip, |k| matches!(k, NodeKind::Strong))
                {
                    self.zwsp_if_last_is(|k| matches!(k, NodeKind::Strong | NodeKind::Emphasis));
                    let node = self.tree.append_new(self.tip, NodeKind::Strong);
                    self.tree.append_text(node, NodeKind::StrongOpenMarker, "**");
                    self.tip = node;
                    created = Some(node);
                    pops = 1;
                }
            }

            Tag::Del | Tag::S | Tag::Strike => {
                let node = self.tree.append_new(self.tip, NodeKind::Strikethrough);
                self.tree
                    .append_text(node, NodeKind::StrikethroughOpenMarker, "~~");
                self.tip = node;
                created = Some(node);
                pops = 1;
            }

            Tag::Mark => {
                let node = self.tree.append_new(self.tip, NodeKind::Mark);
                self.tree.append_text(node, NodeKind::MarkOpenMarker, "==");
                self.tip = node;
                created = Some(node);
                pops = 1;
            }

            Tag::Sup => {
                let node = self.tree.append_new(self.tip, NodeKind::Sup);
                self.tree.append_text(node, NodeKind::SupOpenMarker, "^");
                self.tip = node;
                created = Some(node);
                pops = 1;
            }

            Tag::Sub => {
                let node = self.tree.append_new(self.tip, NodeKind::Sub);
                self.tree.append_text(node, NodeKind::SubOpenMarker, "~");
                self.tip = node;
                created = Some(node);
                pops = 1;
            }

            Tag::Code => {
                self.visit_code_span(n);
                return;
            }

            Tag::Br => {
                if !matches!(self.tree.kind(self.tip), NodeKind::Link)
                    && self.dom.next_sibling(n).is_some()
                {
                    if self.options.protyle_wysiwyg && self.dom.parent_is(n, &[Tag::Table]) {
                        self.tree.append_new(self.tip, NodeKind::Br);
                    } else {
                        self.tree.append_text(self.tip, NodeKind::HardBreak, "\n");
                    }
                }
            }

            Tag::A => {
                let text_content = self.dom.text(n);
                let trimmed = text_content.trim();
                let mut anchor_ancestors = HEADING_TAGS.to_vec();
                anchor_ancestors.push(Tag::Div);
                anchor_ancestors.push(Tag::Section);
                // Empty-text anchors inside headings or containers are bare
                // anchor points, not links.
                if trimmed.is_empty()
                    && self.dom.parent_is(n, &anchor_ancestors)
                    && self.dom.descendants_by_tag(n, Tag::Img).is_empty()
                {
                    return;
                }
                if trimmed.is_empty() && self.dom.first_child(n).is_none() {
                    return;
                }
                let node = self.tree.append_new(self.tip, NodeKind::Link);
                self.tree.append_new(node, NodeKind::OpenBracket);
                self.tip = node;
                created = Some(node);
                pops = 1;
            }

            Tag::Img => {
                self.visit_img(n);
                return;
            }

            Tag::Input => {
                let checked = self.dom.has_attr(n, "checked");
                let marker = self
                    .tree
                    .append_new(self.tip, NodeKind::TaskListItemMarker { checked });
                if let Some(item) = self.tree.parent(marker) {
                    if let Some(list) = self.tree.parent(item) {
                        if let NodeKind::List { typ, .. } = &mut self.tree.node_mut(list).kind {
                            *typ = ListType::Task;
                        }
                    }
                }
            }

            Tag::Table => {
                let aligns = self.table_aligns(n);
                let node = self.tree.append_new(self.tip, NodeKind::Table { aligns });
                self.tip = node;
                pops = 1;
            }

            Tag::Thead => {
                if self.dom.first_child(n).is_some() {
                    let node = self.tree.append_new(self.tip, NodeKind::TableHead);
                    self.tip = node;
                    pops = 1;
                }
            }

            Tag::Tbody => {}

            Tag::Tr => {
                if self.dom.first_child(n).is_some() {
                    let has_head = self
                        .tree
                        .child_by(self.tip, |k| matches!(k, NodeKind::TableHead))
                        .is_some();
                    let dom_has_thead = self
                        .dom
                        .ancestor_by_tag(n, Tag::Table)
                        .map(|t| !self.dom.descendants_by_tag(t, Tag::Thead).is_empty())
                        .unwrap_or(false);
                    if !has_head && !dom_has_thead {
                        // header row missing: synthesize one for this row
                        let head = self.tree.append_new(self.tip, NodeKind::TableHead);
                        self.tip = head;
                        pops += 1;
                    }
                    let row = self.tree.append_new(self.tip, NodeKind::TableRow);
                    self.tip = row;
                    pops += 1;
                }
            }

            Tag::Th | Tag::Td => {
                let align = Align::from_attr(self.dom.attr_or_empty(n, "align"));
                let node = self.tree.append_new(self.tip, NodeKind::TableCell { align });
                self.tip = node;
                pops = 1;
            }

            Tag::Span => {
                if self.visit_span(n) {
                    return;
                }
            }

            Tag::Font => {
                let mut tokens = self.dom.text(n);
                while tokens.contains("\n\n") {
                    tokens = tokens.replace("\n\n", "\n");
                }
                while tokens.contains("\n  ") {
                    tokens = tokens.replace("\n  ", "\n ");
                }
                tokens = tokens.replace("\n ", "\n");
                tokens = tokens.replace('\n', " ");
                self.tree.append_text(self.tip, NodeKind::Text, tokens);
                return;
            }

            Tag::Details => {
                let html = self.dom.outer_html(n);
                let open = match html.find("</summary>") {
                    Some(idx) => html[..idx + "</summary>".len()].to_string(),
                    None => html,
                };
                self.tree.append_text(self.tip, NodeKind::HtmlBlock, open);
            }

            Tag::Iframe | Tag::Audio | Tag::Video => {
                let html = self.dom.outer_html(n);
                self.tree.append_text(self.tip, NodeKind::HtmlBlock, html);
                return;
            }

            Tag::Script => {
                if let Some(first) = self.dom.first_child(n) {
                    let tex = self.dom.text(first);
                    if !tex.is_empty() {
                        self.append_inline_math(&tex);
                        return;
                    }
                }
            }

            Tag::Figcaption => {
                if self.tree.kind(self.tip).is_container_block() {
                    let p = self.tree.append_new(self.tip, NodeKind::Paragraph);
                    self.tree.append_new(p, NodeKind::HardBreak);
                    let caption = self.dom.text(n);
                    self.tree.append_text(p, NodeKind::Text, caption);
                    return;
                }
            }

            Tag::Figure => {
                if self.tree.kind(self.tip).is_container_block() {
                    let node = self.tree.append_new(self.tip, NodeKind::Paragraph);
                    self.tip = node;
                    pops = 1;
                }
            }

            _ => {}
        }

        self.walk_children(n);
        self.post_visit(n, tag, created);
        for _ in 0..pops {
            self.pop_tip();
        }
    }

    fn post_visit(&mut self, n: DomId, tag: Tag, created: Option<NodeId>) {
        if tag == Tag::Details {
            self.tree
                .append_text(self.tip, NodeKind::HtmlBlock, "</details>");
            return;
        }
        let Some(node) = created else {
            return;
        };
        match tag {
            Tag::Em | Tag::I => {
                self.tree.append_text(node, NodeKind::EmCloseMarker, "*");
                self.append_space(n);
            }
            Tag::Strong | Tag::B => {
                self.tree.append_text(node, NodeKind::StrongCloseMarker, "**");
                self.append_space(n);
            }
            Tag::Del | Tag::S | Tag::Strike => {
                self.tree
                    .append_text(node, NodeKind::StrikethroughCloseMarker, "~~");
                self.append_space(n);
            }
            Tag::Mark => {
                self.tree.append_text(node, NodeKind::MarkCloseMarker, "==");
                self.append_space(n);
            }
            Tag::Sup => {
                self.tree.append_text(node, NodeKind::SupCloseMarker, "^");
                self.append_space(n);
            }
            Tag::Sub => {
                self.tree.append_text(node, NodeKind::SubCloseMarker, "~");
                self.append_space(n);
            }
            Tag::A => {
                self.tree.append_new(node, NodeKind::CloseBracket);
                self.tree.append_new(node, NodeKind::OpenParen);
                let dest = text::sanitize_link_dest(self.dom.attr_or_empty(n, "href"));
                self.tree.append_text(node, NodeKind::LinkDest, dest);
                let title = self.dom.attr_or_empty(n, "title").to_string();
                if !title.is_empty() {
                    self.tree.append_new(node, NodeKind::LinkSpace);
                    self.tree.append_text(node, NodeKind::LinkTitle, title);
                }
                self.tree.append_new(node, NodeKind::CloseParen);
            }
            _ => {}
        }
    }

    /// The text pipeline.
    fn visit_text(&mut self, n: DomId) {
        let raw = self.dom.data(n).to_string();
        let parent_tag = self.dom.parent(n).map(|p| self.dom.tag(p));
        let kind = if parent_tag == Some(Tag::A) {
            NodeKind::LinkText
        } else {
            NodeKind::Text
        };

        let mut tokens = raw.clone();
        while tokens.contains("\n  ") {
            tokens = tokens.replace("\n  ", "\n ");
        }
        tokens = tokens.replace("\n ", "\n");
        tokens = tokens.trim_matches(['\t', '\n']).to_string();

        let in_table = self.dom.parent_is(n, &[Tag::Table]);
        if in_table {
            if raw == "\n" {
                // A formatting newline becomes a soft break only between
                // existing content.
                if self.tree.first_child(self.tip).is_none() || self.dom.next_sibling(n).is_none() {
                    return;
                }
                self.tree.append_new(self.tip, NodeKind::Br);
                return;
            }
            if raw.trim().is_empty() {
                self.tree.append_text(self.tip, kind, " ");
                return;
            }
            tokens = tokens.trim().to_string();
            tokens = tokens.replace('\n', " ");
        }

        tokens = tokens.replace('\u{a0}', " ");
        tokens = tokens.replace('\n', " ");

        // A trailing space at the very end of an inline decoration would
        // let the closing marker drift; pin it with a separator.
        if self.tree.kind(self.tip).is_emphasis_like()
            && tokens.ends_with(' ')
            && self.dom.next_sibling(n).is_none()
        {
            tokens.push_str(ZWSP);
        }

        if self.options.protyle_wysiwyg {
            tokens = text::escape_protyle_markers(&tokens);
        } else {
            tokens = text::escape_markers(&tokens);
            if in_table {
                tokens = tokens.replace("\\|", "|").replace('|', "\\|");
            }
        }

        // Inter-element whitespace at block level is layout, not content.
        if self.tree.kind(self.tip).is_block()
            && parent_tag != Some(Tag::Span)
            && tokens.trim().is_empty()
        {
            return;
        }

        self.tree.append_text(self.tip, kind, tokens);
    }

    fn list_item_marker(&self, n: DomId) -> (String, Option<char>) {
        let marker_attr = self.dom.attr_or_empty(n, "data-marker").to_string();
        let parent = self.dom.parent(n);
        let parent_tag = parent.map(|p| self.dom.tag(p));
        if marker_attr.is_empty() {
            if parent_tag == Some(Tag::Ol) {
                let start = parent
                    .map(|p| self.dom.attr_or_empty(p, "start"))
                    .unwrap_or("");
                if start.is_empty() {
                    ("1.".to_string(), None)
                } else {
                    (format!("{}.", start), None)
                }
            } else {
                ("*".to_string(), Some('*'))
            }
        } else {
            let grandparent_is_list = parent
                .and_then(|p| self.dom.parent(p))
                .map(|g| matches!(self.dom.tag(g), Tag::Ol | Tag::Ul))
                .unwrap_or(false);
            // nested ordered lists always restart at 1
            if parent_tag == Some(Tag::Ol) && marker_attr != "1." && grandparent_is_list {
                ("1.".to_string(), None)
            } else {
                (marker_attr, None)
            }
        }
    }

    fn visit_pre(&mut self, n: DomId) {
        let Some(firstc) = self.dom.first_child(n) else {
            return;
        };
        let ftag = self.dom.tag(firstc);
        let code_like = self.dom.is_text(firstc)
            || matches!(
                ftag,
                Tag::Span | Tag::Code | Tag::Section | Tag::Pre | Tag::A
            );
        if !code_like {
            let html = self.dom.outer_html(n);
            self.tree.append_text(self.tip, NodeKind::HtmlBlock, html);
            return;
        }

        let info = if matches!(ftag, Tag::Code | Tag::Span | Tag::A) {
            classify::code_block_info(&self.dom, n, firstc)
        } else {
            String::new()
        };

        let content = self.dom.text(n).replace('\u{a0}', " ");
        let block = self.new_code_block(info, content.clone());

        if !self
            .tree
            .ancestor_is(self.tip, |k| matches!(k, NodeKind::Table { .. }))
        {
            self.tree.append(self.tip, block);
            return;
        }

        // A table whose only content is this code block is dropped in favor
        // of the block itself.
        let mut ancestor = self.tree.parent(self.tip);
        while let Some(table) = ancestor {
            if matches!(self.tree.kind(table), NodeKind::Table { .. })
                && self.single_header_cell_table(table)
            {
                self.tree.insert_before(table, block);
                self.tree.unlink(table);
                self.tip = block;
                return;
            }
            ancestor = self.tree.parent(table);
        }

        // Otherwise no block element fits in a table cell; degrade to one
        // code span per line.
        let lines: Vec<&str> = content.split('\n').collect();
        let count = lines.len();
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let span = self.new_code_span(line.to_string());
            self.tree.append(self.tip, span);
            if i < count - 1 {
                if self.options.protyle_wysiwyg {
                    self.tree.append_new(self.tip, NodeKind::Br);
                } else {
                    self.tree.append_text(self.tip, NodeKind::HardBreak, "\n");
                }
            }
        }
    }

    fn single_header_cell_table(&self, table: NodeId) -> bool {
        let Some(head) = self.tree.first_child(table) else {
            return false;
        };
        if Some(head) != self.tree.last_child(table)
            || !matches!(self.tree.kind(head), NodeKind::TableHead)
        {
            return false;
        }
        let Some(row) = self.tree.first_child(head) else {
            return false;
        };
        if Some(row) != self.tree.last_child(head) {
            return false;
        }
        self.tree
            .first_child(row)
            .map(|c| matches!(self.tree.kind(c), NodeKind::TableCell { .. }))
            .unwrap_or(false)
    }

    fn visit_code_span(&mut self, n: DomId) {
        if self.dom.first_child(n).is_none() {
            return;
        }
        self.zwsp_if_last_is(|k| matches!(k, NodeKind::CodeSpan));

        let all_span = self
            .dom
            .children(n)
            .iter()
            .all(|&c| self.dom.is_text(c) || self.dom.tag(c) == Tag::Span);
        let content = if all_span {
            // highlighter spans carry the interesting text directly
            self.dom.text(n).replace('\u{a0}', " ")
        } else {
            self.dom.raw_inner_html(n)
        };
        let span = self.new_code_span(content);
        self.tree.append(self.tip, span);
    }

    /// Inert wrapper unless it carries one of its known encodings.
    /// Returns true when the span was consumed.
    fn visit_span(&mut self, n: DomId) -> bool {
        if self.dom.first_child(n).is_none() {
            return true;
        }
        if self.dom.attr_or_empty(n, "data-type") == "code" {
            self.zwsp_if_last_is(|k| matches!(k, NodeKind::CodeSpan));
            let content = self.dom.text(n);
            let span = self.new_code_span(content);
            self.tree.append(self.tip, span);
            return true;
        }
        // Zhihu formula
        let tex = self.dom.attr_or_empty(n, "data-tex").trim().to_string();
        if !tex.is_empty() {
            self.append_inline_math(&tex);
            return true;
        }
        let class = self.dom.attr_or_empty(n, "class").trim().to_lowercase();
        if class.contains("katex") {
            if let Some(formula) = classify::katex_formula(&self.dom, n) {
                self.append_inline_math(&formula);
                return true;
            }
        }
        if class.contains("mathjax") {
            if let Some(formula) = classify::mathjax_formula(&self.dom, n) {
                self.append_inline_math(&formula);
            }
            return true;
        }
        false
    }

    fn visit_img(&mut self, n: DomId) {
        let class = self.dom.attr_or_empty(n, "class").to_string();
        let alt = self.dom.attr_or_empty(n, "alt").to_string();

        let node = if class == "emoji" {
            let node = self.tree.new_node(NodeKind::Emoji);
            let src = self.dom.attr_or_empty(n, "src").to_string();
            let tokens = match &self.options.emoji_resolver {
                Some(resolver) => resolver(&alt, &src),
                None => format!(":{}:", alt),
            };
            let img = self.tree.new_text_node(NodeKind::EmojiImg, tokens);
            self.tree.append(node, img);
            let alias = self
                .tree
                .new_text_node(NodeKind::EmojiAlias, format!(":{}:", alt));
            self.tree.append(img, alias);
            node
        } else {
            let node = self.tree.new_node(NodeKind::Image);
            self.tree.append_new(node, NodeKind::Bang);
            self.tree.append_new(node, NodeKind::OpenBracket);
            if !alt.is_empty() {
                self.tree.append_text(node, NodeKind::LinkText, alt);
            }
            self.tree.append_new(node, NodeKind::CloseBracket);
            self.tree.append_new(node, NodeKind::OpenParen);
            let src = classify::image_source(&self.dom, n);
            let dest = text::sanitize_link_dest(&src);
            self.tree.append_text(node, NodeKind::LinkDest, dest);
            let title = self.dom.attr_or_empty(n, "title").to_string();
            if !title.is_empty() {
                self.tree.append_new(node, NodeKind::LinkSpace);
                self.tree.append_text(node, NodeKind::LinkTitle, title);
            }
            self.tree.append_new(node, NodeKind::CloseParen);
            node
        };

        // a bare image still needs a paragraph to live in
        let target = if matches!(self.tree.kind(self.tip), NodeKind::Document) {
            self.tree.append_new(self.tip, NodeKind::Paragraph)
        } else {
            self.tip
        };
        self.tree.append(target, node);
    }

    fn table_aligns(&self, table: DomId) -> Vec<Align> {
        let mut aligns = Vec::new();
        let first_row = self
            .dom
            .first_child(table)
            .and_then(|c| self.dom.first_child(c));
        if let Some(row) = first_row {
            let mut cursor = self.dom.first_child(row);
            while let Some(cell) = cursor {
                aligns.push(Align::from_attr(self.dom.attr_or_empty(cell, "align")));
                cursor = self.dom.next_sibling(cell);
            }
        }
        aligns
    }

    /// Adjacent-space normalizer, run after closing an inline decoration
    /// while the tip still points at it.
    fn append_space(&mut self, n: DomId) {
        let Some(next) = self.dom.next_sibling(n) else {
            return;
        };
        let next_text = self.dom.text(next);
        let Some(first) = next_text.chars().next() else {
            return;
        };
        if first.is_whitespace() {
            return;
        }

        if text::is_punct_or_symbol(first) {
            let tip = self.tip;
            let before = self.tree.new_text_node(NodeKind::Text, ZWSP);
            self.tree.insert_before(tip, before);
            let after = self.tree.new_text_node(NodeKind::Text, ZWSP);
            self.tree.insert_after(tip, after);
            return;
        }

        let cur_text = self.dom.text(n);
        let Some(last) = cur_text.chars().last() else {
            return;
        };
        if text::is_punct_or_symbol(last) {
            if let Some(t) = self.tree.child_by(self.tip, |k| matches!(k, NodeKind::Text)) {
                let tokens = &self.tree.node(t).tokens;
                let wrapped = format!("{}{}{}", ZWSP, tokens, ZWSP);
                self.tree.node_mut(t).tokens = wrapped;
            }
            return;
        }

        // Spaces at the edges of the decorated text belong outside the
        // markers.
        let leading = text::prefix_spaces(&cur_text).to_string();
        if !leading.is_empty() {
            match self.tree.previous(self.tip) {
                Some(prev) if matches!(self.tree.kind(prev), NodeKind::Text) => {
                    self.tree.node_mut(prev).tokens.push_str(&leading);
                }
                Some(prev) => {
                    let t = self.tree.new_text_node(NodeKind::Text, leading);
                    self.tree.insert_after(prev, t);
                }
                None => {
                    let t = self.tree.new_text_node(NodeKind::Text, leading);
                    self.tree.append(self.tip, t);
                }
            }
            if let Some(t) = self.tree.child_by(self.tip, |k| matches!(k, NodeKind::Text)) {
                let trimmed = self
                    .tree
                    .node(t)
                    .tokens
                    .trim_start_matches([' ', '\u{a0}'])
                    .to_string();
                self.tree.node_mut(t).tokens = trimmed;
            }
        }

        let trailing = text::suffix_spaces(&cur_text).to_string();
        if !trailing.is_empty() {
            let texts: Vec<NodeId> = self
                .tree
                .descendants(self.tip)
                .into_iter()
                .filter(|&d| matches!(self.tree.kind(d), NodeKind::Text))
                .collect();
            if let Some(&last_text) = texts.last() {
                let trimmed = self
                    .tree
                    .node(last_text)
                    .tokens
                    .trim_end_matches([' ', '\u{a0}'])
                    .to_string();
                if trimmed.is_empty() {
                    self.tree.unlink(last_text);
                } else {
                    self.tree.node_mut(last_text).tokens = trimmed;
                }
            }
            if self.dom.is_text(next) {
                self.dom.prepend_text(next, &trailing);
            } else {
                let t = self.tree.new_text_node(NodeKind::Text, trailing);
                self.tree.insert_after(self.tip, t);
            }
        }
    }

    fn zwsp_if_last_is(&mut self, pred: impl Fn(&NodeKind) -> bool) {
        if let Some(last) = self.tree.last_child(self.tip) {
            if pred(self.tree.kind(last)) {
                self.tree.append_text(self.tip, NodeKind::Text, ZWSP);
            }
        }
    }

    fn new_code_block(&mut self, info: String, content: String) -> NodeId {
        let node = self.tree.new_node(NodeKind::CodeBlock { fenced: true });
        self.tree
            .append_text(node, NodeKind::CodeBlockFenceOpenMarker { len: 3 }, "```");
        let marker = self
            .tree
            .new_node(NodeKind::CodeBlockFenceInfoMarker { info });
        self.tree.append(node, marker);
        self.tree.append_text(node, NodeKind::CodeBlockCode, content);
        self.tree
            .append_text(node, NodeKind::CodeBlockFenceCloseMarker { len: 3 }, "```");
        node
    }

    fn new_code_span(&mut self, content: String) -> NodeId {
        let node = self.tree.new_node(NodeKind::CodeSpan);
        self.tree.append_text(node, NodeKind::CodeSpanOpenMarker, "`");
        self.tree.append_text(node, NodeKind::CodeSpanContent, content);
        self.tree
            .append_text(node, NodeKind::CodeSpanCloseMarker, "`");
        node
    }

    fn append_inline_math(&mut self, tex: &str) {
        let tex = tex.trim();
        if tex.is_empty() {
            return;
        }
        let node = self.tree.append_new(self.tip, NodeKind::InlineMath);
        self.tree.append_text(node, NodeKind::InlineMathOpenMarker, "$");
        self.tree.append_text(node, NodeKind::InlineMathContent, tex);
        self.tree
            .append_text(node, NodeKind::InlineMathCloseMarker, "$");
    }

    fn append_math_block(&mut self, tex: &str) {
        let tex = tex.trim();
        if tex.is_empty() {
            return;
        }
        let node = self.tree.append_new(self.tip, NodeKind::MathBlock);
        self.tree.append_text(node, NodeKind::MathBlockOpenMarker, "$$");
        self.tree.append_text(node, NodeKind::MathBlockContent, tex);
        self.tree
            .append_text(node, NodeKind::MathBlockCloseMarker, "$$");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomTree;
    use crate::normalize;
    use crate::service::ConvertOptions;

    fn tree_for(html: &str) -> Tree {
        let mut dom = DomTree::parse(html);
        normalize::normalize(&mut dom);
        build_tree(dom, &ConvertOptions::default())
    }

    fn kinds_of_children(tree: &Tree, id: NodeId) -> Vec<&'static str> {
        tree.children(id)
            .into_iter()
            .map(|c| tree.kind(c).name())
            .collect()
    }

    #[test]
    fn test_tip_returns_to_document() {
        let tree = tree_for("<p>a</p><ul><li>b</li></ul><blockquote>c</blockquote>");
        assert_eq!(
            kinds_of_children(&tree, tree.root()),
            vec!["Paragraph", "List", "Blockquote"]
        );
    }

    #[test]
    fn test_text_under_anchor_is_link_text() {
        let tree = tree_for("<a href=\"/x\">foo</a>");
        let link = tree.first_child(tree.root()).unwrap();
        assert!(matches!(tree.kind(link), NodeKind::Link));
        let label = tree
            .child_by(link, |k| matches!(k, NodeKind::LinkText))
            .unwrap();
        assert_eq!(tree.node(label).tokens, "foo");
    }

    #[test]
    fn test_adjacent_emphasis_separated() {
        let tree = tree_for("<p><em>a</em><em>b</em></p>");
        let p = tree.first_child(tree.root()).unwrap();
        assert_eq!(
            kinds_of_children(&tree, p),
            vec!["Emphasis", "Text", "Emphasis"]
        );
        let sep = tree.children(p)[1];
        assert_eq!(tree.node(sep).tokens, ZWSP);
    }

    #[test]
    fn test_adjacent_code_spans_separated() {
        let tree = tree_for("<p><code>a</code><code>b</code></p>");
        let p = tree.first_child(tree.root()).unwrap();
        assert_eq!(
            kinds_of_children(&tree, p),
            vec!["CodeSpan", "Text", "CodeSpan"]
        );
    }

    #[test]
    fn test_nested_same_emphasis_collapsed() {
        let tree = tree_for("<p><strong><strong>x</strong></strong></p>");
        let p = tree.first_child(tree.root()).unwrap();
        let strongs = tree.children_by(p, |k| matches!(k, NodeKind::Strong));
        assert_eq!(strongs.len(), 1);
        assert!(tree
            .children_by(strongs[0], |k| matches!(k, NodeKind::Strong))
            .is_empty());
    }

    #[test]
    fn test_task_list_marks_list() {
        let tree = tree_for(
            "<ul><li class=\"vditor-task\"><input checked type=\"checkbox\"/> foo</li></ul>",
        );
        let list = tree.first_child(tree.root()).unwrap();
        assert!(matches!(
            tree.kind(list),
            NodeKind::List {
                typ: ListType::Task,
                ..
            }
        ));
        let item = tree.first_child(list).unwrap();
        let marker = tree.first_child(item).unwrap();
        assert!(matches!(
            tree.kind(marker),
            NodeKind::TaskListItemMarker { checked: true }
        ));
    }

    #[test]
    fn test_ordered_list_inside_list_restarts_numbering() {
        // An <ol> dropped directly into a <ul> keeps its items but their
        // markers are forced back to 1.
        let tree = tree_for("<ul><ol><li data-marker=\"3.\">b</li></ol></ul>");
        let outer = tree.first_child(tree.root()).unwrap();
        let inner = tree.first_child(outer).unwrap();
        assert!(matches!(tree.kind(inner), NodeKind::List { .. }));
        let inner_item = tree.first_child(inner).unwrap();
        match tree.kind(inner_item) {
            NodeKind::ListItem { marker, .. } => assert_eq!(marker, "1."),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_empty_heading_anchor_dropped() {
        let tree = tree_for("<h2><a href=\"#anchor\"></a>Title</h2>");
        let heading = tree.first_child(tree.root()).unwrap();
        assert!(tree
            .child_by(heading, |k| matches!(k, NodeKind::Link))
            .is_none());
    }

    #[test]
    fn test_mathjax_script_sibling_consumed() {
        let tree = tree_for(
            "<div class=\"MathJax\">rendered</div><script type=\"math/tex; mode=display\">x^2</script>",
        );
        assert_eq!(kinds_of_children(&tree, tree.root()), vec!["MathBlock"]);
        let math = tree.first_child(tree.root()).unwrap();
        let content = tree
            .child_by(math, |k| matches!(k, NodeKind::MathBlockContent))
            .unwrap();
        assert_eq!(tree.node(content).tokens, "x^2");
    }

    #[test]
    fn test_table_degrades_code_block_in_multi_row_table() {
        let tree = tree_for(
            "<table><thead><tr><th>h</th></tr></thead><tbody><tr><td><pre><code>a\nb</code></pre></td></tr></tbody></table>",
        );
        let table = tree.first_child(tree.root()).unwrap();
        assert!(matches!(tree.kind(table), NodeKind::Table { .. }));
        let rows: Vec<NodeId> = tree
            .descendants(table)
            .into_iter()
            .filter(|&d| matches!(tree.kind(d), NodeKind::TableRow))
            .collect();
        assert_eq!(rows.len(), 2);
        let body_cell = tree.first_child(rows[1]).unwrap();
        assert_eq!(
            kinds_of_children(&tree, body_cell),
            vec!["CodeSpan", "HardBreak", "CodeSpan"]
        );
    }

    #[test]
    fn test_single_cell_table_replaced_by_code_block() {
        let tree = tree_for(
            "<table><tbody><tr><td><pre><code class=\"language-js\">x</code></pre></td></tr></tbody></table>",
        );
        assert_eq!(kinds_of_children(&tree, tree.root()), vec!["CodeBlock"]);
    }

    #[test]
    fn test_punctuation_after_inline_gets_separators() {
        let tree = tree_for("<p><strong>bold</strong>!rest</p>");
        let p = tree.first_child(tree.root()).unwrap();
        let kinds = kinds_of_children(&tree, p);
        assert_eq!(kinds, vec!["Text", "Strong", "Text", "Text"]);
        let children = tree.children(p);
        assert_eq!(tree.node(children[0]).tokens, ZWSP);
        assert_eq!(tree.node(children[2]).tokens, ZWSP);
    }

    #[test]
    fn test_leading_space_lifted_out_of_inline() {
        let tree = tree_for("<p>x<em> a</em>b</p>");
        let p = tree.first_child(tree.root()).unwrap();
        let children = tree.children(p);
        assert_eq!(tree.node(children[0]).tokens, "x ");
        let em = children[1];
        let inner = tree
            .child_by(em, |k| matches!(k, NodeKind::Text))
            .unwrap();
        assert_eq!(tree.node(inner).tokens, "a");
    }
}
