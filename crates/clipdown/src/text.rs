//! Text utilities for the conversion walk.

/// Markers escaped in standard CommonMark output. Kept minimal so ordinary
/// prose (brackets, quotes, dashes) survives untouched; emphasis runs are
/// the round-trip hazard.
const MARKERS: &[char] = &['*', '_'];

/// Extended marker set escaped in WYSIWYG (Protyle) output, which also
/// assigns syntax to backtick, tilde, dollar, equals and caret.
const PROTYLE_MARKERS: &[char] = &['*', '_', '~', '`', '$', '=', '^'];

fn escape(text: &str, markers: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if markers.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape the standard CommonMark marker set.
pub(crate) fn escape_markers(text: &str) -> String {
    escape(text, MARKERS)
}

/// Escape the Protyle marker set.
pub(crate) fn escape_protyle_markers(text: &str) -> String {
    escape(text, PROTYLE_MARKERS)
}

/// Punctuation or symbol test used by the adjacent-space normalizer.
/// Covers the ASCII range precisely plus the common CJK fullwidth set,
/// which is where delimiter merging actually bites.
pub(crate) fn is_punct_or_symbol(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation();
    }
    matches!(
        c,
        '\u{2014}'          // em dash
        | '\u{2018}'..='\u{201F}' // curly quotes
        | '\u{2026}'        // ellipsis
        | '\u{00B7}'        // middle dot
        | '\u{3001}'..='\u{301F}' // CJK punctuation: 、。〃〈〉《》「」『』【】
        | '\u{FF01}'..='\u{FF0F}' // fullwidth ！＂＃＄％＆＇（）＊＋，－．／
        | '\u{FF1A}'..='\u{FF20}' // fullwidth ：；＜＝＞？＠
        | '\u{FF3B}'..='\u{FF40}' // fullwidth ［＼］＾＿｀
        | '\u{FF5B}'..='\u{FF65}' // fullwidth ｛｜｝～ and halfwidth forms
    )
}

/// Leading run of spaces.
pub(crate) fn prefix_spaces(text: &str) -> &str {
    let end = text.len() - text.trim_start_matches(' ').len();
    &text[..end]
}

/// Trailing run of spaces.
pub(crate) fn suffix_spaces(text: &str) -> &str {
    let start = text.trim_end_matches(' ').len();
    &text[start..]
}

/// Sanitize a link destination: trim, and drop script URIs entirely.
pub(crate) fn sanitize_link_dest(dest: &str) -> String {
    let trimmed = dest.trim();
    if trimmed.to_lowercase().starts_with("javascript:") {
        return String::new();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markers() {
        assert_eq!(escape_markers("a*b_c"), "a\\*b\\_c");
        assert_eq!(escape_markers("[]()"), "[]()");
        assert_eq!(escape_markers("> quote"), "> quote");
    }

    #[test]
    fn test_escape_protyle_markers() {
        assert_eq!(escape_protyle_markers("x^2=4"), "x\\^2\\=4");
        assert_eq!(escape_protyle_markers("`a`"), "\\`a\\`");
    }

    #[test]
    fn test_punct_or_symbol() {
        assert!(is_punct_or_symbol('!'));
        assert!(is_punct_or_symbol('，'));
        assert!(is_punct_or_symbol('。'));
        assert!(!is_punct_or_symbol('a'));
        assert!(!is_punct_or_symbol('中'));
        assert!(!is_punct_or_symbol(' '));
    }

    #[test]
    fn test_space_runs() {
        assert_eq!(prefix_spaces("  ab "), "  ");
        assert_eq!(suffix_spaces("  ab "), " ");
        assert_eq!(prefix_spaces("ab"), "");
        assert_eq!(suffix_spaces("ab"), "");
    }

    #[test]
    fn test_sanitize_link_dest() {
        assert_eq!(sanitize_link_dest(" /bar "), "/bar");
        assert_eq!(sanitize_link_dest("JavaScript:alert(1)"), "");
        assert_eq!(sanitize_link_dest("https://example.com"), "https://example.com");
    }
}
