//! Classification helpers for the element dispatch.
//!
//! These interpret the idiosyncratic markup dialects the walk has to cope
//! with: highlighter class conventions for code-block info strings, the
//! KaTeX/MathJax embeddings of formulas, and image source fallbacks.

use crate::dom::{DomId, DomTree, Tag};
use crate::normalize::SPAN_ORIGIN_ATTR;

/// Language of a GitHub-style highlighted `<div>`, from its class.
pub(crate) fn highlight_div_language(class: &str) -> Option<String> {
    if let Some(idx) = class.rfind("-source-") {
        return Some(class[idx + "-source-".len()..].to_string());
    }
    if class.contains("-text-html-basic") {
        return Some("html".to_string());
    }
    None
}

/// Info string for a fenced code block built from `<pre>` with meaningful
/// first child `firstc`. Tried in order: the child's `language-X` class, the
/// pre's `language-X` class, the child's single-token class (unless the code
/// was synthesized from span rows), the pre's single-token class. An info
/// string containing whitespace, hyphen or underscore is discarded.
pub(crate) fn code_block_info(dom: &DomTree, pre: DomId, firstc: DomId) -> String {
    let mut info = String::new();

    let mut class = dom.attr_or_empty(firstc, "class").to_string();
    if !class.contains("language-") {
        class = dom.attr_or_empty(pre, "class").to_string();
    }
    if let Some(idx) = class.find("language-") {
        info = class[idx + "language-".len()..]
            .split(' ')
            .next()
            .unwrap_or("")
            .to_string();
    } else if dom.tag(firstc) == Tag::Code && !dom.has_attr(firstc, SPAN_ORIGIN_ATTR) {
        let child_class = dom.attr_or_empty(firstc, "class");
        if !child_class.contains(' ') {
            info = child_class.to_string();
        }
    }

    if info.is_empty() {
        let pre_class = dom.attr_or_empty(pre, "class");
        if !pre_class.contains(' ') {
            info = pre_class.to_string();
        }
    }

    if info.contains([' ', '-', '_']) {
        info.clear();
    }
    info
}

/// Formula embedded in a KaTeX span: the MathML text after the last
/// four-newline separator.
pub(crate) fn katex_formula(dom: &DomTree, span: DomId) -> Option<String> {
    let mathml = dom.descendant_by_tag_and_class(span, Tag::Span, "katex-mathml")?;
    let first = dom.first_child(mathml)?;
    let tex = dom.text(first);
    if tex.is_empty() {
        return None;
    }
    let mut tex = tex.trim().to_string();
    while tex.contains("\n ") {
        tex = tex.replace("\n ", "\n");
    }
    let idx = tex.rfind("\n\n\n\n")?;
    if idx == 0 {
        return None;
    }
    Some(tex[idx + 4..].trim().to_string())
}

/// Formula embedded in a MathJax span: the text of its first `<script>`.
pub(crate) fn mathjax_formula(dom: &DomTree, span: DomId) -> Option<String> {
    let scripts = dom.descendants_by_tag(span, Tag::Script);
    let script = scripts.first()?;
    let first = dom.first_child(*script)?;
    let tex = dom.text(first);
    if tex.is_empty() {
        None
    } else {
        Some(tex)
    }
}

/// Resolve an image source: `src`, then `data-src` for lazy-loaded
/// placeholders, then the last `srcset` candidate with its width/density
/// descriptor stripped.
pub(crate) fn image_source(dom: &DomTree, img: DomId) -> String {
    let mut src = dom.attr_or_empty(img, "src").to_string();
    if src.starts_with("data:image") {
        let data_src = dom.attr_or_empty(img, "data-src");
        if !data_src.is_empty() {
            src = data_src.to_string();
        }
    }
    if src.is_empty() {
        let srcset = dom.attr_or_empty(img, "srcset");
        if !srcset.is_empty() {
            let candidate = srcset.split(',').next_back().unwrap_or("").trim();
            src = candidate
                .split(' ')
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
        }
    }
    src
}
