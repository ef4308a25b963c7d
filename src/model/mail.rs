//! The result of parsing one raw message.

use std::collections::BTreeMap;

use serde::Serialize;

use super::attachment::Attachment;

/// Header values recovered from the header block.
///
/// A header that is not present is `None`, never an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedHeaders {
    /// `CC:` header value.
    pub cc: Option<String>,
    /// `BCC:` header value.
    pub bcc: Option<String>,
    /// `Reply-To:` header value.
    pub reply_to: Option<String>,
    /// Additional configured headers that were found, keyed by the configured name.
    pub extra: BTreeMap<String, String>,
}

impl ExtractedHeaders {
    /// `true` if no header was recovered at all.
    pub fn is_empty(&self) -> bool {
        self.cc.is_none() && self.bcc.is_none() && self.reply_to.is_none() && self.extra.is_empty()
    }
}

/// Structured data extracted from a raw message.
///
/// `Default` is the degraded result returned when parsing fails:
/// no headers, an empty preview and no attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEmail {
    /// Selected header values.
    pub headers: ExtractedHeaders,

    /// Tag-stripped, whitespace-collapsed excerpt of the body.
    pub preview_text: String,

    /// Decoded attachments, in the order their parts appear in the body.
    pub attachments: Vec<Attachment>,
}

impl ParsedEmail {
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}
