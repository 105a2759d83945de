//! DOM normalization ahead of the conversion walk.
//!
//! Two jobs: decide which nodes are never emitted, and rewrite the known
//! malformed `<pre>` shapes that syntax highlighters and clipped pages
//! produce into the canonical `<pre><code>` form the builder expects.

use tracing::trace;

use crate::dom::{DomId, DomKind, DomTree, Tag};

/// Attribute set on `<code>` elements synthesized from highlighted span
/// rows, so the info-string rules can tell them from author-written ones.
pub(crate) const SPAN_ORIGIN_ATTR: &str = "data-span-origin";

/// Nodes that are suppressed before emission.
pub(crate) fn is_ignorable(dom: &DomTree, id: DomId) -> bool {
    match dom.kind(id) {
        DomKind::Comment => true,
        DomKind::Text(_) => false,
        DomKind::Element(_) => {
            if dom.is_svg(id) {
                return true;
            }
            if matches!(
                dom.tag(id),
                Tag::Meta | Tag::Noscript | Tag::Colgroup | Tag::Col | Tag::Summary
            ) {
                return true;
            }
            if dom.attr_or_empty(id, "data-render") == "1" {
                return true;
            }
            let class = dom.attr_or_empty(id, "class");
            // Highlighter gutters, but not the `line-numbers` wrapper some
            // sites put around the whole block.
            if class.starts_with("line-number") && !class.starts_with("line-numbers") {
                return true;
            }
            // Wikipedia section [edit] links.
            if class.contains("mw-editsection") {
                return true;
            }
            false
        }
    }
}

/// Apply the structural rewrites. Runs once over the whole tree before the
/// builder walk.
pub(crate) fn normalize(dom: &mut DomTree) {
    let pres: Vec<DomId> = dom
        .descendants_by_tag(dom.root(), Tag::Pre)
        .into_iter()
        .filter(|&pre| !dom.parent_is(pre, &[Tag::Pre]))
        .collect();
    for pre in pres {
        normalize_pre(dom, pre);
    }
}

fn normalize_pre(dom: &mut DomTree, pre: DomId) {
    let Some(mut firstc) = dom.first_child(pre) else {
        return;
    };

    // <pre><div></div><code>: drop the decorative leading div.
    if dom.tag(firstc) == Tag::Div {
        if let Some(next) = dom.next_sibling(firstc) {
            if dom.tag(next) == Tag::Code {
                dom.unlink(firstc);
                firstc = next;
            }
        }
    }

    // A single <div> wrapper holding exactly one <code> descendant: the
    // code is reparented directly under the pre.
    if dom.tag(firstc) == Tag::Div && dom.next_sibling(firstc).is_none() {
        let codes = dom.descendants_by_tag(pre, Tag::Code);
        if codes.len() == 1 {
            trace!("unwrapping pre > div > code");
            let code = codes[0];
            dom.unlink(code);
            dom.append(pre, code);
            dom.unlink(firstc);
            firstc = match dom.first_child(pre) {
                Some(c) => c,
                None => return,
            };
        }
    }

    // Highlighted rows as <pre><ol><li><p><span>: wrap each row's spans in
    // a synthesized <code>, then let the flattening below take over.
    if dom.tag(firstc) == Tag::Ol
        && dom.next_sibling(firstc).is_none()
        && row_shape_is(dom, firstc, Tag::Span)
    {
        trace!("wrapping highlighted span rows in synthesized code elements");
        for li in dom.children(firstc) {
            let Some(p) = dom.first_child(li) else {
                continue;
            };
            let code = dom.new_element(Tag::Code, "code");
            dom.set_attr(code, SPAN_ORIGIN_ATTR, "1");
            for span in dom.children(p) {
                dom.unlink(span);
                dom.append(code, span);
            }
            dom.append(p, code);
        }
    }

    // <pre><ol><li><p><code>: flatten every row's code to a direct child
    // of the pre and drop the list scaffolding.
    if dom.tag(firstc) == Tag::Ol
        && dom.next_sibling(firstc).is_none()
        && row_shape_is(dom, firstc, Tag::Code)
    {
        trace!("flattening pre > ol > li > p > code rows");
        let mut codes = Vec::new();
        for li in dom.children(firstc) {
            if let Some(p) = dom.first_child(li) {
                if let Some(code) = dom.first_child(p) {
                    codes.push(code);
                }
            }
        }
        for li in dom.children(firstc) {
            dom.unlink(li);
        }
        for code in codes {
            dom.unlink(code);
            dom.append(pre, code);
        }
        dom.unlink(firstc);
        firstc = match dom.first_child(pre) {
            Some(c) => c,
            None => return,
        };
    }

    if dom.tag(firstc) == Tag::Code {
        // One <code> per line: join the lines with synthetic <br>s.
        if dom
            .next_sibling(firstc)
            .map(|s| dom.tag(s) == Tag::Code)
            .unwrap_or(false)
        {
            let mut cursor = dom.next_sibling(firstc);
            let mut following = Vec::new();
            while let Some(c) = cursor {
                following.push(c);
                cursor = dom.next_sibling(c);
            }
            for c in following {
                let br = dom.new_element(Tag::Br, "br");
                dom.insert_before(c, br);
            }
        }
        // Per-line list rows inside the code element itself.
        if let Some(inner) = dom.first_child(firstc) {
            if dom.tag(inner) == Tag::Ol {
                for li in dom.children(inner).into_iter().skip(1) {
                    let br = dom.new_element(Tag::Br, "br");
                    dom.insert_before(li, br);
                }
            }
        }
        // Trailing <ul> line-number gutter.
        if let Some(last) = dom.last_child(pre) {
            if dom.tag(last) == Tag::Ul {
                trace!("dropping trailing line-number gutter");
                dom.unlink(last);
            }
        }
    }

    // Nested pre holding one element per line.
    if dom.tag(firstc) == Tag::Pre && dom.first_child(firstc).is_some() {
        for c in dom.children(firstc).into_iter().skip(1) {
            let br = dom.new_element(Tag::Br, "br");
            dom.insert_before(c, br);
        }
    }
}

/// Whether every row of `ol` matches `li > p > <row_tag>` (checked on the
/// first row, as the sources that produce this shape are uniform).
fn row_shape_is(dom: &DomTree, ol: DomId, row_tag: Tag) -> bool {
    let Some(li) = dom.first_child(ol) else {
        return false;
    };
    if dom.tag(li) != Tag::Li {
        return false;
    }
    let Some(p) = dom.first_child(li) else {
        return false;
    };
    if dom.tag(p) != Tag::P {
        return false;
    }
    dom.first_child(p)
        .map(|c| dom.tag(c) == row_tag)
        .unwrap_or(false)
}
