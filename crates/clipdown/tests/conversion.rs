//! End-to-end conversion tests: HTML fragment in, Markdown out.

use clipdown::{html_to_markdown, html_to_tree, ConvertOptions, NodeKind};
use pretty_assertions::assert_eq;

fn convert(html: &str) -> String {
    html_to_markdown(html, &ConvertOptions::default()).unwrap()
}

fn convert_wysiwyg(html: &str) -> String {
    let options = ConvertOptions {
        protyle_wysiwyg: true,
        ..Default::default()
    };
    html_to_markdown(html, &options).unwrap()
}

#[test]
fn test_paragraph() {
    assert_eq!(convert("<p>foo</p>"), "foo\n");
}

#[test]
fn test_strong() {
    assert_eq!(convert("<p><strong>foo</strong></p>"), "**foo**\n");
}

#[test]
fn test_heading_then_paragraph() {
    assert_eq!(
        convert("<h2>foo</h2><p>para<em>em</em></p>"),
        "## foo\n\npara*em*\n"
    );
}

#[test]
fn test_nested_list() {
    assert_eq!(
        convert("<ul><li>foo<ul><li>bar</li></ul></li></ul>"),
        "* foo\n  * bar\n"
    );
}

#[test]
fn test_task_list() {
    assert_eq!(
        convert("<ul><li class=\"vditor-task\"><input checked type=\"checkbox\"/> foo</li></ul>"),
        "* [X] foo\n"
    );
}

#[test]
fn test_unchecked_task_list() {
    assert_eq!(
        convert("<ul><li class=\"vditor-task\"><input type=\"checkbox\"/> foo</li></ul>"),
        "* [ ] foo\n"
    );
}

#[test]
fn test_table() {
    assert_eq!(
        convert("<table><thead><tr><th>abc</th><th>def</th></tr></thead></table>"),
        "|abc|def|\n|---|---|\n"
    );
}

#[test]
fn test_fenced_code_block_with_language() {
    assert_eq!(
        convert("<pre><code class=\"language-go\">x</code></pre>"),
        "```go\nx\n```\n"
    );
}

#[test]
fn test_strikethrough_followed_by_text() {
    assert_eq!(convert("<del>Hi</del> Hello"), "~~Hi~~ Hello\n");
}

#[test]
fn test_image() {
    assert_eq!(convert("<img src=\"/bar\" alt=\"foo\"/>"), "![foo](/bar)\n");
}

#[test]
fn test_image_without_alt() {
    assert_eq!(convert("<img src=\"/bar\"/>"), "![](/bar)\n");
}

#[test]
fn test_link_with_title() {
    assert_eq!(
        convert("<a href=\"/bar\" title=\"baz\">foo</a>"),
        "[foo](/bar \"baz\")\n"
    );
}

#[test]
fn test_link_without_title() {
    assert_eq!(convert("<a href=\"/bar\">foo</a>"), "[foo](/bar)\n");
}

#[test]
fn test_blockquote() {
    assert_eq!(convert("<blockquote>foo</blockquote>"), "> foo\n");
}

#[test]
fn test_code_span() {
    assert_eq!(convert("<code>foo</code>"), "`foo`\n");
}

#[test]
fn test_nested_emphasis_strong() {
    assert_eq!(convert("<p><em><strong>foo</strong></em></p>"), "***foo***\n");
}

#[test]
fn test_ordered_list() {
    assert_eq!(convert("<ol><li>One</li><li>Two</li></ol>"), "1. One\n1. Two\n");
}

#[test]
fn test_ordered_list_with_start() {
    assert_eq!(convert("<ol start=\"3\"><li>c</li></ol>"), "3. c\n");
}

#[test]
fn test_thematic_break() {
    assert_eq!(convert("<p>a</p><hr><p>b</p>"), "a\n\n---\n\nb\n");
}

#[test]
fn test_plain_text() {
    assert_eq!(convert("foo bar"), "foo bar\n");
}

#[test]
fn test_empty_input() {
    assert_eq!(convert(""), "");
}

#[test]
fn test_marker_escaping_in_text() {
    assert_eq!(convert("<p>2 * 3 * 4</p>"), "2 \\* 3 \\* 4\n");
}

#[test]
fn test_wikipedia_edit_section_dropped() {
    assert_eq!(
        convert("<h2>Title<span class=\"mw-editsection\">[edit]</span></h2>"),
        "## Title\n"
    );
}

#[test]
fn test_github_highlight_div() {
    assert_eq!(
        convert("<div class=\"highlight highlight-source-rust\"><pre>fn main() {}</pre></div>"),
        "```rust\nfn main() {}\n```\n"
    );
}

#[test]
fn test_per_line_code_elements() {
    assert_eq!(
        convert("<pre><code>line1</code><code>line2</code></pre>"),
        "```\nline1\nline2\n```\n"
    );
}

#[test]
fn test_highlighted_span_rows() {
    assert_eq!(
        convert(
            "<pre><ol><li><p><span>a</span><span>b</span></p></li><li><p><span>c</span></p></li></ol></pre>"
        ),
        "```\nab\nc\n```\n"
    );
}

#[test]
fn test_line_number_gutter_dropped() {
    assert_eq!(
        convert("<pre><code>x</code><ul><li>1</li></ul></pre>"),
        "```\nx\n```\n"
    );
}

#[test]
fn test_code_block_info_with_separator_dropped() {
    assert_eq!(
        convert("<pre><code class=\"language-objective-c\">x</code></pre>"),
        "```\nx\n```\n"
    );
}

#[test]
fn test_math_block_from_data_tex_div() {
    assert_eq!(
        convert("<div data-tex=\"E=mc^2\">rendered</div>"),
        "$$\nE=mc^2\n$$\n"
    );
}

#[test]
fn test_math_block_from_mathjax_script_sibling() {
    assert_eq!(
        convert(
            "<div class=\"MathJax\">rendered</div><script type=\"math/tex; mode=display\">x^2</script>"
        ),
        "$$\nx^2\n$$\n"
    );
}

#[test]
fn test_inline_math_from_span_data_tex() {
    assert_eq!(convert("<p>a<span data-tex=\"a+b\">x</span>b</p>"), "a$a+b$b\n");
}

#[test]
fn test_inline_math_from_katex_span() {
    assert_eq!(
        convert(
            "<span class=\"katex\"><span class=\"katex-mathml\">x squared\n\n\n\n x^2 </span><span class=\"katex-html\">x2</span></span>"
        ),
        "$x^2$\n"
    );
}

#[test]
fn test_code_span_from_data_type_span() {
    assert_eq!(
        convert("<p>a<span data-type=\"code\">x</span>b</p>"),
        "a`x`b\n"
    );
}

#[test]
fn test_details_summary() {
    assert_eq!(
        convert("<details><summary>Sum</summary><p>Body</p></details>"),
        "<details><summary>Sum</summary>\n\nBody\n\n</details>\n"
    );
}

#[test]
fn test_iframe_kept_as_html() {
    assert_eq!(
        convert("<iframe src=\"https://example.com/embed\"></iframe>"),
        "<iframe src=\"https://example.com/embed\"></iframe>\n"
    );
}

#[test]
fn test_adjacent_emphasis_kept_apart() {
    assert_eq!(
        convert("<p><em>a</em><em>b</em></p>"),
        "*a*\u{200B}*b*\n"
    );
}

#[test]
fn test_figure_with_caption() {
    assert_eq!(
        convert("<figure><img src=\"/i.png\"><figcaption>Cap</figcaption></figure>"),
        "![](/i.png)Cap\n"
    );
}

#[test]
fn test_font_flattens_newlines() {
    assert_eq!(convert("<p><font>a\nb</font></p>"), "a b\n");
}

#[test]
fn test_custom_element_is_transparent() {
    assert_eq!(convert("<custom-x><p>hi</p></custom-x>"), "hi\n");
}

#[test]
fn test_javascript_link_destination_dropped() {
    assert_eq!(convert("<a href=\"javascript:alert(1)\">x</a>"), "[x]()\n");
}

#[test]
fn test_srcset_fallback() {
    assert_eq!(
        convert("<img srcset=\"/a.png 1x, /b.png 2x\">"),
        "![](/b.png)\n"
    );
}

#[test]
fn test_emoji_image() {
    assert_eq!(
        convert("<p><img class=\"emoji\" alt=\"octocat\" src=\"/e/octocat.png\"/></p>"),
        ":octocat:\n"
    );
}

#[test]
fn test_table_pipe_escaped() {
    assert_eq!(
        convert("<table><thead><tr><th>a|b</th></tr></thead></table>"),
        "|a\\|b|\n|---|\n"
    );
}

#[test]
fn test_table_alignment_row() {
    assert_eq!(
        convert(
            "<table><thead><tr><th align=\"left\">l</th><th align=\"center\">c</th><th align=\"right\">r</th></tr></thead></table>"
        ),
        "|l|c|r|\n|:---|:---:|---:|\n"
    );
}

#[test]
fn test_headless_table_synthesizes_header() {
    assert_eq!(
        convert("<table><tbody><tr><td>a</td><td>b</td></tr></tbody></table>"),
        "|a|b|\n|---|---|\n"
    );
}

#[test]
fn test_single_cell_table_with_code_block_unwrapped() {
    assert_eq!(
        convert(
            "<table><tbody><tr><td><pre><code class=\"language-js\">x</code></pre></td></tr></tbody></table>"
        ),
        "```js\nx\n```\n"
    );
}

#[test]
fn test_malformed_list_nesting_repaired() {
    assert_eq!(
        convert("<ul><li>foo</li><ul><li>bar</li></ul></ul>"),
        "* foo\n  * bar\n"
    );
}

#[test]
fn test_hard_break() {
    assert_eq!(convert("<p>a<br>b</p>"), "a\nb\n");
}

#[test]
fn test_trailing_br_dropped() {
    assert_eq!(convert("<p>a<br></p>"), "a\n");
}

#[test]
fn test_nbsp_becomes_space() {
    assert_eq!(convert("<p>a\u{a0}b</p>"), "a b\n");
}

#[test]
fn test_protyle_marker_escaping() {
    assert_eq!(convert_wysiwyg("<p>x^2</p>"), "x\\^2\n");
    assert_eq!(convert("<p>x^2</p>"), "x^2\n");
}

#[test]
fn test_wysiwyg_br_in_table() {
    assert_eq!(
        convert_wysiwyg("<table><thead><tr><th>a<br>b</th></tr></thead></table>"),
        "|a<br />b|\n|---|\n"
    );
}

#[test]
fn test_no_list_directly_under_list_in_tree() {
    let inputs = [
        "<ul><li>foo</li><ul><li>bar</li></ul></ul>",
        "<ul><li>a<ul><li>b</li></ul></li></ul>",
        "<ol><li>x</li><ol><li>y</li></ol></ol>",
    ];
    for html in inputs {
        let tree = html_to_tree(html, &ConvertOptions::default());
        for id in tree.descendants(tree.root()) {
            if matches!(tree.kind(id), NodeKind::List { .. }) {
                if let Some(parent) = tree.parent(id) {
                    assert!(
                        !matches!(tree.kind(parent), NodeKind::List { .. }),
                        "list directly under list for {}",
                        html
                    );
                }
            }
        }
    }
}

#[test]
fn test_kindred_inlines_never_flush() {
    let tree = html_to_tree(
        "<p><em>a</em><em>b</em><strong>c</strong><strong>d</strong></p>",
        &ConvertOptions::default(),
    );
    for id in tree.descendants(tree.root()) {
        let kind = tree.kind(id);
        if !kind.is_emphasis_like() {
            continue;
        }
        if let Some(next) = tree.next(id) {
            assert_ne!(
                std::mem::discriminant(kind),
                std::mem::discriminant(tree.kind(next)),
                "adjacent kindred inlines without separator"
            );
        }
    }
}

#[test]
fn test_no_block_children_under_table_cells() {
    let tree = html_to_tree(
        "<table><tbody><tr><td><p>a</p><div>b</div></td></tr><tr><td><pre><code>c\nd</code></pre></td></tr></tbody></table>",
        &ConvertOptions::default(),
    );
    for id in tree.descendants(tree.root()) {
        if !matches!(tree.kind(id), NodeKind::TableCell { .. }) {
            continue;
        }
        for child in tree.children(id) {
            assert!(
                !matches!(
                    tree.kind(child),
                    NodeKind::Paragraph | NodeKind::CodeBlock { .. }
                ),
                "block element under table cell"
            );
        }
    }
}
