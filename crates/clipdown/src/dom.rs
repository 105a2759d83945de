//! DOM arena for HTML to Markdown conversion.
//!
//! The `scraper` fragment tree is read-only, but the normalizer has to
//! rewrite structure and the builder has to consult parent/sibling links, so
//! the parsed fragment is copied into this owned arena up front. Any parser
//! producing element/text/comment nodes could be converted the same way.

use scraper::{ElementRef, Html, Node as ScraperNode};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Element kinds the dispatcher distinguishes. Anything else maps to
/// `Unknown` and is traversed transparently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Tag {
    A,
    Annotation,
    Audio,
    B,
    Blockquote,
    Br,
    Code,
    Col,
    Colgroup,
    Del,
    Details,
    Div,
    Em,
    Figcaption,
    Figure,
    Font,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Hr,
    I,
    Iframe,
    Img,
    Input,
    Li,
    Mark,
    Meta,
    Noscript,
    Ol,
    P,
    Picture,
    Pre,
    S,
    Script,
    Section,
    Span,
    Strike,
    Strong,
    Sub,
    Summary,
    Sup,
    Table,
    Tbody,
    Td,
    Th,
    Thead,
    Tr,
    Ul,
    Video,
    Unknown,
}

impl Tag {
    pub(crate) fn from_name(name: &str) -> Self {
        match name {
            "a" => Tag::A,
            "annotation" => Tag::Annotation,
            "audio" => Tag::Audio,
            "b" => Tag::B,
            "blockquote" => Tag::Blockquote,
            "br" => Tag::Br,
            "code" => Tag::Code,
            "col" => Tag::Col,
            "colgroup" => Tag::Colgroup,
            "del" => Tag::Del,
            "details" => Tag::Details,
            "div" => Tag::Div,
            "em" => Tag::Em,
            "figcaption" => Tag::Figcaption,
            "figure" => Tag::Figure,
            "font" => Tag::Font,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "h5" => Tag::H5,
            "h6" => Tag::H6,
            "hr" => Tag::Hr,
            "i" => Tag::I,
            "iframe" => Tag::Iframe,
            "img" => Tag::Img,
            "input" => Tag::Input,
            "li" => Tag::Li,
            "mark" => Tag::Mark,
            "meta" => Tag::Meta,
            "noscript" => Tag::Noscript,
            "ol" => Tag::Ol,
            "p" => Tag::P,
            "picture" => Tag::Picture,
            "pre" => Tag::Pre,
            "s" => Tag::S,
            "script" => Tag::Script,
            "section" => Tag::Section,
            "span" => Tag::Span,
            "strike" => Tag::Strike,
            "strong" => Tag::Strong,
            "sub" => Tag::Sub,
            "summary" => Tag::Summary,
            "sup" => Tag::Sup,
            "table" => Tag::Table,
            "tbody" => Tag::Tbody,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "thead" => Tag::Thead,
            "tr" => Tag::Tr,
            "ul" => Tag::Ul,
            "video" => Tag::Video,
            _ => Tag::Unknown,
        }
    }

    pub(crate) fn heading_level(self) -> Option<u8> {
        match self {
            Tag::H1 => Some(1),
            Tag::H2 => Some(2),
            Tag::H3 => Some(3),
            Tag::H4 => Some(4),
            Tag::H5 => Some(5),
            Tag::H6 => Some(6),
            _ => None,
        }
    }

    fn is_void(self) -> bool {
        matches!(
            self,
            Tag::Br | Tag::Col | Tag::Hr | Tag::Img | Tag::Input | Tag::Meta
        )
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ElementData {
    pub(crate) tag: Tag,
    pub(crate) name: String,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) svg: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum DomKind {
    Element(ElementData),
    Text(String),
    Comment,
}

/// Index handle into a [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct DomId(usize);

#[derive(Debug)]
pub(crate) struct DomNode {
    pub(crate) kind: DomKind,
    parent: Option<DomId>,
    first_child: Option<DomId>,
    last_child: Option<DomId>,
    prev_sibling: Option<DomId>,
    next_sibling: Option<DomId>,
}

/// Owned DOM tree. Node 0 is a synthetic fragment root.
#[derive(Debug)]
pub(crate) struct DomTree {
    nodes: Vec<DomNode>,
}

impl DomTree {
    /// Parse an HTML fragment into an owned tree.
    pub(crate) fn parse(html: &str) -> Self {
        let document = Html::parse_fragment(html);
        let mut tree = DomTree { nodes: Vec::new() };
        tree.push_node(DomKind::Element(ElementData {
            tag: Tag::Unknown,
            name: "#root".to_string(),
            attrs: Vec::new(),
            svg: false,
        }));
        let root = DomId(0);
        copy_children(&mut tree, root, document.root_element());
        tree
    }

    fn push_node(&mut self, kind: DomKind) -> DomId {
        let id = DomId(self.nodes.len());
        self.nodes.push(DomNode {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        });
        id
    }

    pub(crate) fn root(&self) -> DomId {
        DomId(0)
    }

    /// Synthesize a detached element, as the normalizer rewrites require.
    pub(crate) fn new_element(&mut self, tag: Tag, name: &str) -> DomId {
        self.push_node(DomKind::Element(ElementData {
            tag,
            name: name.to_string(),
            attrs: Vec::new(),
            svg: false,
        }))
    }

    pub(crate) fn kind(&self, id: DomId) -> &DomKind {
        &self.nodes[id.0].kind
    }

    pub(crate) fn parent(&self, id: DomId) -> Option<DomId> {
        self.nodes[id.0].parent
    }

    pub(crate) fn first_child(&self, id: DomId) -> Option<DomId> {
        self.nodes[id.0].first_child
    }

    pub(crate) fn last_child(&self, id: DomId) -> Option<DomId> {
        self.nodes[id.0].last_child
    }

    pub(crate) fn prev_sibling(&self, id: DomId) -> Option<DomId> {
        self.nodes[id.0].prev_sibling
    }

    pub(crate) fn next_sibling(&self, id: DomId) -> Option<DomId> {
        self.nodes[id.0].next_sibling
    }

    pub(crate) fn children(&self, id: DomId) -> Vec<DomId> {
        let mut out = Vec::new();
        let mut cursor = self.first_child(id);
        while let Some(c) = cursor {
            out.push(c);
            cursor = self.next_sibling(c);
        }
        out
    }

    pub(crate) fn is_element(&self, id: DomId) -> bool {
        matches!(self.kind(id), DomKind::Element(_))
    }

    pub(crate) fn is_text(&self, id: DomId) -> bool {
        matches!(self.kind(id), DomKind::Text(_))
    }

    /// Element kind, `Unknown` for non-elements.
    pub(crate) fn tag(&self, id: DomId) -> Tag {
        match self.kind(id) {
            DomKind::Element(el) => el.tag,
            _ => Tag::Unknown,
        }
    }

    pub(crate) fn is_svg(&self, id: DomId) -> bool {
        matches!(self.kind(id), DomKind::Element(el) if el.svg)
    }

    /// Node data: text for text nodes, element name for elements.
    pub(crate) fn data(&self, id: DomId) -> &str {
        match self.kind(id) {
            DomKind::Text(text) => text,
            DomKind::Element(el) => &el.name,
            DomKind::Comment => "",
        }
    }

    pub(crate) fn attr(&self, id: DomId, name: &str) -> Option<&str> {
        match self.kind(id) {
            DomKind::Element(el) => el
                .attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Attribute value or the empty string, matching how lookups chain.
    pub(crate) fn attr_or_empty(&self, id: DomId, name: &str) -> &str {
        self.attr(id, name).unwrap_or("")
    }

    pub(crate) fn has_attr(&self, id: DomId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub(crate) fn set_attr(&mut self, id: DomId, name: &str, value: &str) {
        if let DomKind::Element(el) = &mut self.nodes[id.0].kind {
            if let Some(entry) = el.attrs.iter_mut().find(|(k, _)| k == name) {
                entry.1 = value.to_string();
            } else {
                el.attrs.push((name.to_string(), value.to_string()));
            }
        }
    }

    /// Prefix a text node's data in place.
    pub(crate) fn prepend_text(&mut self, id: DomId, prefix: &str) {
        if let DomKind::Text(text) = &mut self.nodes[id.0].kind {
            text.insert_str(0, prefix);
        }
    }

    /// Whether any ancestor element carries one of the given tags.
    pub(crate) fn parent_is(&self, id: DomId, tags: &[Tag]) -> bool {
        let mut cursor = self.parent(id);
        while let Some(a) = cursor {
            if tags.contains(&self.tag(a)) {
                return true;
            }
            cursor = self.parent(a);
        }
        false
    }

    /// Nearest ancestor element carrying the given tag.
    pub(crate) fn ancestor_by_tag(&self, id: DomId, tag: Tag) -> Option<DomId> {
        let mut cursor = self.parent(id);
        while let Some(a) = cursor {
            if self.tag(a) == tag {
                return Some(a);
            }
            cursor = self.parent(a);
        }
        None
    }

    /// Text content of the subtree; `<br>` contributes a newline.
    pub(crate) fn text(&self, id: DomId) -> String {
        let mut out = String::new();
        self.text_into(id, &mut out);
        out
    }

    fn text_into(&self, id: DomId, out: &mut String) {
        match self.kind(id) {
            DomKind::Text(text) => out.push_str(text),
            DomKind::Element(el) if el.tag == Tag::Br => out.push('\n'),
            _ => {}
        }
        let mut cursor = self.first_child(id);
        while let Some(c) = cursor {
            self.text_into(c, out);
            cursor = self.next_sibling(c);
        }
    }

    /// All descendant elements of a given tag, in document order.
    pub(crate) fn descendants_by_tag(&self, id: DomId, tag: Tag) -> Vec<DomId> {
        let mut out = Vec::new();
        self.descendants_by_tag_into(id, tag, &mut out);
        out
    }

    fn descendants_by_tag_into(&self, id: DomId, tag: Tag, out: &mut Vec<DomId>) {
        let mut cursor = self.first_child(id);
        while let Some(c) = cursor {
            if self.tag(c) == tag {
                out.push(c);
            }
            self.descendants_by_tag_into(c, tag, out);
            cursor = self.next_sibling(c);
        }
    }

    /// Whether a descendant with any of the given tags exists.
    pub(crate) fn has_descendant_tag(&self, id: DomId, tags: &[Tag]) -> bool {
        let mut cursor = self.first_child(id);
        while let Some(c) = cursor {
            if tags.contains(&self.tag(c)) || self.has_descendant_tag(c, tags) {
                return true;
            }
            cursor = self.next_sibling(c);
        }
        false
    }

    /// First descendant element of the given tag whose class attribute
    /// contains `class`.
    pub(crate) fn descendant_by_tag_and_class(
        &self,
        id: DomId,
        tag: Tag,
        class: &str,
    ) -> Option<DomId> {
        self.descendants_by_tag(id, tag)
            .into_iter()
            .find(|&c| self.attr_or_empty(c, "class").contains(class))
    }

    pub(crate) fn append(&mut self, parent: DomId, child: DomId) {
        self.unlink(child);
        let prev_last = self.nodes[parent.0].last_child;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].prev_sibling = prev_last;
        if let Some(last) = prev_last {
            self.nodes[last.0].next_sibling = Some(child);
        } else {
            self.nodes[parent.0].first_child = Some(child);
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    pub(crate) fn insert_before(&mut self, sibling: DomId, new: DomId) {
        self.unlink(new);
        let parent = self.nodes[sibling.0].parent;
        let prev = self.nodes[sibling.0].prev_sibling;
        self.nodes[new.0].parent = parent;
        self.nodes[new.0].prev_sibling = prev;
        self.nodes[new.0].next_sibling = Some(sibling);
        self.nodes[sibling.0].prev_sibling = Some(new);
        match prev {
            Some(p) => self.nodes[p.0].next_sibling = Some(new),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = Some(new);
                }
            }
        }
    }

    /// Detach a node and its subtree.
    pub(crate) fn unlink(&mut self, id: DomId) {
        let (parent, prev, next) = {
            let n = &self.nodes[id.0];
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        match prev {
            Some(p) => self.nodes[p.0].next_sibling = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = next;
                }
            }
        }
        match next {
            Some(n) => self.nodes[n.0].prev_sibling = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = prev;
                }
            }
        }
        let n = &mut self.nodes[id.0];
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    /// Reconstruct outer HTML with entities re-encoded.
    pub(crate) fn outer_html(&self, id: DomId) -> String {
        let mut out = String::new();
        self.html_into(id, true, &mut out);
        out
    }

    /// Inner HTML without re-encoding text, i.e. the unescaped form the code
    /// span extraction wants.
    pub(crate) fn raw_inner_html(&self, id: DomId) -> String {
        let mut out = String::new();
        let mut cursor = self.first_child(id);
        while let Some(c) = cursor {
            self.html_into(c, false, &mut out);
            cursor = self.next_sibling(c);
        }
        out
    }

    fn html_into(&self, id: DomId, escape: bool, out: &mut String) {
        match self.kind(id) {
            DomKind::Text(text) => {
                if escape {
                    out.push_str(&escape_html_text(text));
                } else {
                    out.push_str(text);
                }
            }
            DomKind::Comment => {}
            DomKind::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (k, v) in &el.attrs {
                    out.push(' ');
                    out.push_str(k);
                    if !v.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_html_attr(v));
                        out.push('"');
                    }
                }
                out.push('>');
                if el.tag.is_void() {
                    return;
                }
                let mut cursor = self.first_child(id);
                while let Some(c) = cursor {
                    self.html_into(c, escape, out);
                    cursor = self.next_sibling(c);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
    }
}

fn copy_children(tree: &mut DomTree, parent: DomId, element: ElementRef) {
    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => {
                let id = tree.push_node(DomKind::Text(text.text.to_string()));
                tree.append(parent, id);
            }
            ScraperNode::Comment(_) => {
                let id = tree.push_node(DomKind::Comment);
                tree.append(parent, id);
            }
            ScraperNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    let el = child_element.value();
                    let name = el.name().to_string();
                    let id = tree.push_node(DomKind::Element(ElementData {
                        tag: Tag::from_name(&name),
                        name,
                        attrs: el
                            .attrs()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect(),
                        svg: &*el.name.ns == SVG_NAMESPACE,
                    }));
                    tree.append(parent, id);
                    copy_children(tree, id, child_element);
                }
            }
            _ => {}
        }
    }
}

fn escape_html_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_html_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}
