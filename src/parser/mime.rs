//! Multipart splitting and attachment decoding.
//!
//! This is a deliberately small subset of MIME: one level of multipart,
//! `base64` or raw payloads, and attachments recognized only by a
//! `Content-Disposition: attachment; filename="…"` header.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use encoding_rs::Encoding;

use crate::error::{IngestError, Result};
use crate::model::attachment::{Attachment, DEFAULT_CONTENT_TYPE};
use crate::parser::header::find_blank_line;

/// Padding optional, trailing bits ignored: the leniency mail clients expect.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const BOUNDARY_MARKER: &str = "boundary=\"";
const DISPOSITION_PREFIX: &str = "content-disposition: attachment;";
const FILENAME_PREFIX: &str = "filename=\"";
const CONTENT_TYPE_PREFIX: &str = "content-type: ";
const TRANSFER_ENCODING_PREFIX: &str = "content-transfer-encoding: ";

/// Find the first non-empty `boundary="TOKEN"` parameter anywhere in `text`.
pub fn find_boundary(text: &str) -> Option<&str> {
    let mut remaining = text;
    while let Some(pos) = remaining.find(BOUNDARY_MARKER) {
        let after = &remaining[pos + BOUNDARY_MARKER.len()..];
        let end = after.find('"')?;
        if end > 0 {
            return Some(&after[..end]);
        }
        remaining = after;
    }
    None
}

/// Split a body on the literal delimiter `--<boundary>`.
///
/// Preamble and epilogue fragments are returned as-is.
pub fn split_parts<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{boundary}");
    body.split(delimiter.as_str()).collect()
}

/// One multipart fragment divided into its header section and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSections<'a> {
    pub headers: &'a str,
    pub payload: &'a str,
}

impl<'a> PartSections<'a> {
    /// Divide a part at its first blank line.
    ///
    /// Returns `None` when there is no blank line, or when it opens the part
    /// (no header lines at all).
    pub fn split(part: &'a str) -> Option<Self> {
        match find_blank_line(part) {
            Some((header_end, payload_start)) if header_end > 0 => Some(Self {
                headers: &part[..header_end],
                payload: &part[payload_start..],
            }),
            _ => None,
        }
    }
}

/// Filename from `Content-Disposition: attachment; filename="NAME"`.
///
/// Keywords are ASCII case-insensitive, at least one whitespace character
/// (line breaks included) must follow the `;`, and NAME must be double-quoted
/// and non-empty.
pub fn attachment_filename(headers: &str) -> Option<&str> {
    let lower = headers.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = find_at_line_start(&lower, DISPOSITION_PREFIX, from) {
        let start = pos + DISPOSITION_PREFIX.len();
        if let Some(name) = quoted_filename(&headers[start..]) {
            return Some(name);
        }
        from = start;
    }
    None
}

fn quoted_filename(params: &str) -> Option<&str> {
    let trimmed = params.trim_start();
    if trimmed.len() == params.len() {
        return None;
    }
    let rest = crate::parser::header::strip_prefix_ignore_case(trimmed, FILENAME_PREFIX)?;
    let end = rest.find('"')?;
    (end > 0).then(|| &rest[..end])
}

/// `Content-Type` value without parameters, if declared.
pub fn content_type(headers: &str) -> Option<&str> {
    prefixed_value(headers, CONTENT_TYPE_PREFIX, &[';', '\r', '\n'])
}

/// `Content-Transfer-Encoding` value, lower-cased.
pub fn transfer_encoding(headers: &str) -> Option<String> {
    prefixed_value(headers, TRANSFER_ENCODING_PREFIX, &['\r', '\n']).map(str::to_ascii_lowercase)
}

/// Value following a line-initial `prefix`, up to the first `stop` char, trimmed.
///
/// `prefix` must be lower-case ASCII. Occurrences with a blank value are skipped.
fn prefixed_value<'a>(headers: &'a str, prefix: &str, stop: &[char]) -> Option<&'a str> {
    let lower = headers.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = find_at_line_start(&lower, prefix, from) {
        let start = pos + prefix.len();
        let rest = &headers[start..];
        let end = rest.find(stop).unwrap_or(rest.len());
        let value = rest[..end].trim();
        if !value.is_empty() {
            return Some(value);
        }
        from = start;
    }
    None
}

/// Offset of the first `needle` at or after `from` that begins a line.
///
/// `haystack` is the ASCII-lowercased text, so offsets are valid in the
/// text passed alongside it as well.
fn find_at_line_start(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(rel) = haystack[from..].find(needle) {
        let pos = from + rel;
        if pos == 0 || haystack.as_bytes()[pos - 1] == b'\n' {
            return Some(pos);
        }
        from = pos + needle.len();
    }
    None
}

/// Decode a payload according to its transfer encoding.
///
/// `base64` payloads have all ASCII whitespace removed before decoding.
/// Anything else is re-encoded as bytes with `charset`.
pub fn decode_payload(
    payload: &str,
    encoding: Option<&str>,
    charset: &'static Encoding,
    filename: &str,
) -> Result<Vec<u8>> {
    match encoding {
        Some("base64") => {
            let compact: String = payload
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            LENIENT_BASE64
                .decode(compact.as_bytes())
                .map_err(|source| IngestError::Decode {
                    filename: filename.to_string(),
                    source,
                })
        }
        _ => {
            let (bytes, _, _) = charset.encode(payload);
            Ok(bytes.into_owned())
        }
    }
}

/// Turn one multipart fragment into an [`Attachment`].
///
/// `Ok(None)` means the part is not an attachment (or has no header section);
/// `Err` means it is one but its payload is malformed.
pub fn resolve_part(part: &str, charset: &'static Encoding) -> Result<Option<Attachment>> {
    let Some(sections) = PartSections::split(part) else {
        return Ok(None);
    };
    let Some(filename) = attachment_filename(sections.headers) else {
        return Ok(None);
    };

    let content_type = content_type(sections.headers).unwrap_or(DEFAULT_CONTENT_TYPE);
    let encoding = transfer_encoding(sections.headers);
    let content = decode_payload(sections.payload, encoding.as_deref(), charset, filename)?;

    Ok(Some(Attachment::new(filename, content_type, content)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART: &str = "\r\nContent-Type: image/png; name=\"dot.png\"\r\n\
        Content-Disposition: attachment; filename=\"dot.png\"\r\n\
        Content-Transfer-Encoding: BASE64\r\n\r\n\
        iVBORw0K\r\nGgo=\r\n";

    #[test]
    fn test_find_boundary() {
        let text = "Content-Type: multipart/mixed; boundary=\"abc123\"\r\n\r\n";
        assert_eq!(find_boundary(text), Some("abc123"));
    }

    #[test]
    fn test_find_boundary_skips_empty_token() {
        let text = "boundary=\"\" x boundary=\"real\"";
        assert_eq!(find_boundary(text), Some("real"));
    }

    #[test]
    fn test_find_boundary_absent() {
        assert_eq!(find_boundary("Content-Type: text/plain\r\n\r\nHi"), None);
        assert_eq!(find_boundary("boundary=unquoted"), None);
        assert_eq!(find_boundary("boundary=\"unterminated"), None);
    }

    #[test]
    fn test_split_parts() {
        let body = "preamble\r\n--X\r\nA\r\n--X\r\nB\r\n--X--\r\n";
        let parts = split_parts(body, "X");
        assert_eq!(parts, vec!["preamble\r\n", "\r\nA\r\n", "\r\nB\r\n", "--\r\n"]);
    }

    #[test]
    fn test_part_sections_requires_headers() {
        assert!(PartSections::split("\r\n\r\npayload").is_none());
        assert!(PartSections::split("\r\nContent-Type: text/plain\r\n").is_none());
        let sections = PartSections::split("\r\nA: 1\r\n\r\npayload").expect("split");
        assert_eq!(sections.headers, "\r\nA: 1");
        assert_eq!(sections.payload, "payload");
    }

    #[test]
    fn test_attachment_filename() {
        let headers = "\r\ncontent-disposition: ATTACHMENT;  filename=\"Report Q1.pdf\"";
        assert_eq!(attachment_filename(headers), Some("Report Q1.pdf"));
    }

    #[test]
    fn test_attachment_filename_folded() {
        let headers = "\r\nContent-Disposition: attachment;\r\n\tfilename=\"a.txt\"";
        assert_eq!(attachment_filename(headers), Some("a.txt"));
    }

    #[test]
    fn test_attachment_filename_rejects_other_shapes() {
        assert_eq!(
            attachment_filename("Content-Disposition: inline; filename=\"a.txt\""),
            None
        );
        assert_eq!(
            attachment_filename("Content-Disposition: attachment;filename=\"a.txt\""),
            None
        );
        assert_eq!(
            attachment_filename("Content-Disposition: attachment; filename=a.txt"),
            None
        );
        assert_eq!(
            attachment_filename("Content-Disposition: attachment; filename=\"\""),
            None
        );
        assert_eq!(
            attachment_filename("X-Content-Disposition: attachment; filename=\"a.txt\""),
            None
        );
    }

    #[test]
    fn test_content_type_and_encoding() {
        let sections = PartSections::split(PART).expect("split");
        assert_eq!(content_type(sections.headers), Some("image/png"));
        assert_eq!(
            transfer_encoding(sections.headers).as_deref(),
            Some("base64")
        );
        assert_eq!(content_type("\r\nX-Other: 1"), None);
    }

    #[test]
    fn test_decode_base64_lenient() {
        let utf8 = encoding_rs::UTF_8;
        let bytes = decode_payload("SGVs\r\nbG8\r\n", Some("base64"), utf8, "f").expect("decode");
        assert_eq!(bytes, b"Hello");
    }

    #[test]
    fn test_decode_base64_malformed() {
        let err = decode_payload("not*base64!", Some("base64"), encoding_rs::UTF_8, "bad.bin")
            .expect_err("malformed");
        assert!(matches!(err, IngestError::Decode { ref filename, .. } if filename == "bad.bin"));
    }

    #[test]
    fn test_decode_raw_uses_charset() {
        let utf8 = decode_payload("café", Some("8bit"), encoding_rs::UTF_8, "f").expect("utf8");
        assert_eq!(utf8, "café".as_bytes());
        let latin = decode_payload("café", None, encoding_rs::WINDOWS_1252, "f").expect("latin");
        assert_eq!(latin, b"caf\xe9");
    }

    #[test]
    fn test_resolve_part() {
        let att = resolve_part(PART, encoding_rs::UTF_8)
            .expect("decode")
            .expect("attachment");
        assert_eq!(att.filename(), "dot.png");
        assert_eq!(att.content_type(), "image/png");
        assert_eq!(att.content(), b"\x89PNG\r\n\x1a\n");
        assert_eq!(att.size(), 8);
    }

    #[test]
    fn test_resolve_part_not_attachment() {
        let part = "\r\nContent-Type: text/plain\r\n\r\nHello\r\n";
        assert!(resolve_part(part, encoding_rs::UTF_8)
            .expect("no error")
            .is_none());
    }
}
