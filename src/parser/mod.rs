//! Raw message parsing: header extraction, preview text and attachments.
//!
//! [`MessageParser::try_parse`] reports failures as values;
//! [`MessageParser::parse`] and [`parse`] never fail and fall back to
//! [`ParsedEmail::default`].

pub mod header;
pub mod mime;
pub mod preview;

use encoding_rs::Encoding;
use tracing::{debug, warn};

use crate::config::{DecodeFailurePolicy, ParserConfig};
use crate::error::Result;
use crate::model::attachment::Attachment;
use crate::model::mail::ParsedEmail;

/// Extracts [`ParsedEmail`] records from raw messages.
///
/// Holds only immutable settings, so one parser can be shared across threads.
#[derive(Debug, Clone)]
pub struct MessageParser {
    charset: &'static Encoding,
    preview_chars: usize,
    extra_headers: Vec<String>,
    on_decode_error: DecodeFailurePolicy,
}

impl Default for MessageParser {
    fn default() -> Self {
        Self {
            charset: encoding_rs::UTF_8,
            preview_chars: preview::DEFAULT_PREVIEW_CHARS,
            extra_headers: Vec::new(),
            on_decode_error: DecodeFailurePolicy::default(),
        }
    }
}

impl MessageParser {
    /// Build a parser from configuration.
    ///
    /// Fails only if the configured charset label is unknown.
    pub fn new(config: &ParserConfig) -> Result<Self> {
        Ok(Self {
            charset: config.charset()?,
            preview_chars: config.preview_chars,
            extra_headers: config.extra_headers.clone(),
            on_decode_error: config.on_decode_error,
        })
    }

    /// Replace the decode-failure policy.
    pub fn with_decode_policy(mut self, policy: DecodeFailurePolicy) -> Self {
        self.on_decode_error = policy;
        self
    }

    /// Parse a raw message, degrading to an empty result on any failure.
    pub fn parse(&self, raw: &[u8]) -> ParsedEmail {
        match self.try_parse(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Error parsing email content, using empty result");
                ParsedEmail::default()
            }
        }
    }

    /// Parse a raw message, surfacing internal failures.
    pub fn try_parse(&self, raw: &[u8]) -> Result<ParsedEmail> {
        let (text, _, had_errors) = self.charset.decode(raw);
        if had_errors {
            debug!(
                charset = self.charset.name(),
                "Malformed byte sequences replaced while decoding message"
            );
        }

        let (header_block, body) = header::split_header_body(&text);
        let headers = header::extract_headers(header_block, &self.extra_headers);
        let preview_text = preview::derive_preview(body, self.preview_chars);

        let attachments = match mime::find_boundary(&text) {
            Some(boundary) => self.extract_attachments(body, boundary)?,
            None => Vec::new(),
        };

        Ok(ParsedEmail {
            headers,
            preview_text,
            attachments,
        })
    }

    fn extract_attachments(&self, body: &str, boundary: &str) -> Result<Vec<Attachment>> {
        let mut attachments = Vec::new();

        for part in mime::split_parts(body, boundary) {
            match mime::resolve_part(part, self.charset) {
                Ok(Some(attachment)) => attachments.push(attachment),
                Ok(None) => {}
                Err(e) => match self.on_decode_error {
                    DecodeFailurePolicy::AbortMessage => return Err(e),
                    DecodeFailurePolicy::SkipAttachment => {
                        warn!(error = %e, "Skipping undecodable attachment");
                    }
                },
            }
        }

        debug!(
            boundary,
            count = attachments.len(),
            "Extracted attachments"
        );
        Ok(attachments)
    }
}

/// Parse a raw message with the default settings.
///
/// Never fails: any internal error yields [`ParsedEmail::default`].
pub fn parse(raw: &[u8]) -> ParsedEmail {
    MessageParser::default().parse(raw)
}
