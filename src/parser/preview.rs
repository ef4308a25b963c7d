//! Plain-text preview derivation for list views.

/// Default maximum length of a preview, in characters.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Derive a short preview from a message body.
///
/// Markup tags are replaced by a space, whitespace runs collapse to a single
/// space, the result is trimmed and cut to `max_chars` characters (which may
/// land mid-word).
pub fn derive_preview(body: &str, max_chars: usize) -> String {
    let stripped = strip_tags(body);
    let collapsed = collapse_whitespace(&stripped);
    collapsed.chars().take(max_chars).collect()
}

/// Replace every `<…>` span with a single space.
///
/// A span runs from `<` to the next `>`, across line breaks. A `<` with no
/// `>` after it is kept as text.
pub fn strip_tags(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut remaining = text;

    while let Some(open) = remaining.find('<') {
        let Some(close) = remaining[open + 1..].find('>') else {
            break;
        };
        result.push_str(&remaining[..open]);
        result.push(' ');
        remaining = &remaining[open + 1 + close + 1..];
    }
    // Either no `<` is left or the last one is unclosed: keep the rest as text.
    result.push_str(remaining);
    result
}

/// Collapse whitespace runs to one space and trim both ends.
///
/// Whitespace is Unicode `White_Space` plus U+FEFF (byte order mark).
pub fn collapse_whitespace(text: &str) -> String {
    text.split(is_preview_whitespace)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_preview_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags_basic() {
        assert_eq!(strip_tags("Hello <b>world</b>"), "Hello  world ");
    }

    #[test]
    fn test_strip_tags_multiline_tag() {
        assert_eq!(strip_tags("a<div\nclass=\"x\">b"), "a b");
    }

    #[test]
    fn test_strip_tags_unclosed() {
        assert_eq!(strip_tags("1 < 2 and <b>3"), "1  3");
        assert_eq!(strip_tags("x <y"), "x <y");
        assert_eq!(strip_tags("<i>a</i> b < c"), " a  b < c");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \r\n\t b  "), "a b");
        assert_eq!(collapse_whitespace(" \r\n "), "");
    }

    #[test]
    fn test_collapse_byte_order_mark() {
        assert_eq!(collapse_whitespace("\u{feff}a\u{feff}\u{feff}b "), "a b");
        assert_eq!(collapse_whitespace("a\u{a0}\u{2003}b"), "a b");
    }

    #[test]
    fn test_preview_html() {
        let body = "<html><body><p>Hello</p>\r\n<p>there,   friend</p></body></html>";
        assert_eq!(derive_preview(body, 100), "Hello there, friend");
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        let body = "é".repeat(150);
        let preview = derive_preview(&body, DEFAULT_PREVIEW_CHARS);
        assert_eq!(preview.chars().count(), 100);
        assert!(preview.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_preview_never_has_double_whitespace() {
        let body = "word ".repeat(40) + "<br>\n\n" + &"x ".repeat(40);
        let preview = derive_preview(&body, DEFAULT_PREVIEW_CHARS);
        assert!(preview.chars().count() <= 100);
        assert!(!preview.contains("  "));
    }

    #[test]
    fn test_preview_empty() {
        assert_eq!(derive_preview("", 100), "");
        assert_eq!(derive_preview("<br/>", 100), "");
    }
}
