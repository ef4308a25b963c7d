//! Decoded attachments.
//!
//! Unlike index metadata, an [`Attachment`] owns its decoded bytes: it is
//! produced once per qualifying MIME part and handed to the caller.

use serde::Serialize;

/// Content type used when a part does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file attachment decoded from a multipart message.
///
/// `size` always equals `content.len()`; both are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    filename: String,
    content_type: String,
    #[serde(skip_serializing)]
    content: Vec<u8>,
    size: u64,
}

impl Attachment {
    /// Build an attachment from its decoded payload.
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        let size = content.len() as u64;
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            content,
            size,
        }
    }

    /// Filename as declared in `Content-Disposition`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// MIME type (e.g. `"image/png"`), without parameters.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Decoded bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Decoded size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}
