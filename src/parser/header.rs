//! Header block isolation and single-line header lookup.
//!
//! Headers are matched one physical line at a time: folded continuation
//! lines are not joined, so a value never spans a line break.

use crate::model::mail::ExtractedHeaders;

/// Locate the first blank line in `text`.
///
/// A blank line is a line break (`\n` or `\r\n`) immediately followed by
/// another one, so `\r\n\r\n`, `\n\n`, `\r\n\n` and `\n\r\n` all count.
/// Returns `(header_end, body_start)`: the offset where the separator starts
/// and the offset right after it.
pub fn find_blank_line(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match line_break_len(bytes, i) {
            Some(first) => {
                if let Some(second) = line_break_len(bytes, i + first) {
                    return Some((i, i + first + second));
                }
                i += first;
            }
            None => i += 1,
        }
    }
    None
}

/// Length of the line break starting at `at` (1 for `\n`, 2 for `\r\n`).
fn line_break_len(bytes: &[u8], at: usize) -> Option<usize> {
    match bytes.get(at) {
        Some(b'\n') => Some(1),
        Some(b'\r') if bytes.get(at + 1) == Some(&b'\n') => Some(2),
        _ => None,
    }
}

/// Split a message into its header block and body.
///
/// Without a blank line the header block is empty and the whole text is body.
pub fn split_header_body(text: &str) -> (&str, &str) {
    match find_blank_line(text) {
        Some((header_end, body_start)) => (&text[..header_end], &text[body_start..]),
        None => ("", text),
    }
}

/// Get the first value for a header name (ASCII case-insensitive).
///
/// The line must start with `name` immediately followed by `:`. The value is
/// the rest of that line, trimmed. Lines with a blank value are skipped.
pub fn header_value<'a>(block: &'a str, name: &str) -> Option<&'a str> {
    block.split('\n').find_map(|line| {
        let value = strip_prefix_ignore_case(line, name)?
            .strip_prefix(':')?
            .trim();
        (!value.is_empty()).then_some(value)
    })
}

/// Extract CC, BCC, Reply-To and any `extra` header names from a header block.
pub fn extract_headers(block: &str, extra: &[String]) -> ExtractedHeaders {
    let owned = |name: &str| header_value(block, name).map(str::to_string);

    ExtractedHeaders {
        cc: owned("CC"),
        bcc: owned("BCC"),
        reply_to: owned("Reply-To"),
        extra: extra
            .iter()
            .filter_map(|name| owned(name).map(|value| (name.clone(), value)))
            .collect(),
    }
}

/// `s` without `prefix`, comparing ASCII letters case-insensitively.
pub(crate) fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_blank_line_lf() {
        // "From: a@b.com\n" = 14 bytes, "Subject: Hi\n" = 12 bytes
        let data = "From: a@b.com\nSubject: Hi\n\nBody\n";
        assert_eq!(find_blank_line(data), Some((25, 27)));
    }

    #[test]
    fn test_find_blank_line_crlf() {
        let data = "From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(find_blank_line(data), Some((26, 30)));
    }

    #[test]
    fn test_find_blank_line_mixed() {
        assert_eq!(find_blank_line("A: 1\r\n\nB"), Some((4, 7)));
        assert_eq!(find_blank_line("A: 1\n\r\nB"), Some((4, 7)));
        assert_eq!(find_blank_line("A: 1\r\r\n\r\nB"), Some((5, 9)));
    }

    #[test]
    fn test_find_blank_line_absent() {
        assert_eq!(find_blank_line("A: 1\r\nB: 2\r\n"), None);
        assert_eq!(find_blank_line(""), None);
    }

    #[test]
    fn test_split_without_separator() {
        let (headers, body) = split_header_body("just some text");
        assert_eq!(headers, "");
        assert_eq!(body, "just some text");
    }

    #[test]
    fn test_split_leading_separator() {
        let (headers, body) = split_header_body("\r\n\r\nBody");
        assert_eq!(headers, "");
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_header_value_case_insensitive() {
        let block = "From: a@x.com\r\ncc:   alice@example.com  \r\nSubject: Hi";
        assert_eq!(header_value(block, "CC"), Some("alice@example.com"));
    }

    #[test]
    fn test_header_value_not_a_suffix_match() {
        let block = "BCC: hidden@example.com";
        assert_eq!(header_value(block, "CC"), None);
        assert_eq!(header_value(block, "BCC"), Some("hidden@example.com"));
    }

    #[test]
    fn test_header_value_first_wins() {
        let block = "CC: first@x.com\nCC: second@x.com";
        assert_eq!(header_value(block, "CC"), Some("first@x.com"));
    }

    #[test]
    fn test_header_value_does_not_cross_lines() {
        let block = "CC:\r\n second@x.com\r\nCC: third@x.com";
        assert_eq!(header_value(block, "CC"), Some("third@x.com"));
    }

    #[test]
    fn test_folded_header_keeps_first_line_only() {
        let block = "Reply-To: a@x.com,\r\n b@x.com";
        assert_eq!(header_value(block, "Reply-To"), Some("a@x.com,"));
    }

    #[test]
    fn test_header_value_multibyte_line() {
        let block = "Ñame: x\r\nCC: c@x.com";
        assert_eq!(header_value(block, "CC"), Some("c@x.com"));
    }

    #[test]
    fn test_extract_headers() {
        let block = "Reply-To: r@x.com\r\nX-Mailer: Mutt\r\nCC: c@x.com";
        let extra = vec!["X-Mailer".to_string(), "X-Absent".to_string()];
        let headers = extract_headers(block, &extra);
        assert_eq!(headers.cc.as_deref(), Some("c@x.com"));
        assert_eq!(headers.bcc, None);
        assert_eq!(headers.reply_to.as_deref(), Some("r@x.com"));
        assert_eq!(headers.extra.get("X-Mailer").map(String::as_str), Some("Mutt"));
        assert!(!headers.extra.contains_key("X-Absent"));
    }
}
