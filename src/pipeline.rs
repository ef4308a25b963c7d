//! End-to-end processing of one stored message:
//! fetch → parse → record → store attachments.

use std::collections::HashSet;

use chrono::Utc;
use tracing::info;

use crate::catalog::Catalog;
use crate::error::{IngestError, Result};
use crate::model::attachment::Attachment;
use crate::model::mail::ParsedEmail;
use crate::model::record::{AttachmentRecord, EmailRecord, ProcessOutcome};
use crate::parser::MessageParser;
use crate::store::{validate_key, ObjectStore, StoredMessage};

/// Folder used when the message path does not name one.
pub const DEFAULT_FOLDER: &str = "Inbox";

/// Maximum length of an attachment filename inside a storage key.
const MAX_FILENAME_LEN: usize = 150;

/// Processes stored messages into catalog rows and attachment blobs.
pub struct Ingestor<S, C> {
    store: S,
    catalog: C,
    parser: MessageParser,
    max_message_size: u64,
}

impl<S: ObjectStore, C: Catalog> Ingestor<S, C> {
    pub fn new(store: S, catalog: C, parser: MessageParser, max_message_size: u64) -> Self {
        Self {
            store,
            catalog,
            parser,
            max_message_size,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Process the message stored under `email_path`.
    ///
    /// Parsing itself never fails; errors come from a bad path, a missing or
    /// oversized message, or persistence.
    pub fn process(&mut self, email_path: &str) -> Result<ProcessOutcome> {
        info!(path = email_path, "Processing email");

        if email_path.trim().is_empty() {
            return Err(IngestError::InvalidPath(format!("{email_path:?}")));
        }

        let size = self
            .store
            .size(email_path)?
            .ok_or_else(|| IngestError::MessageNotFound(email_path.to_string()))?;
        if size > self.max_message_size {
            return Err(IngestError::MessageTooLarge {
                path: email_path.to_string(),
                size,
                limit: self.max_message_size,
            });
        }

        let message = self
            .store
            .get(email_path)?
            .ok_or_else(|| IngestError::MessageNotFound(email_path.to_string()))?;

        let parsed = self.parser.parse(&message.content);
        let keys = attachment_keys(email_path, &parsed.attachments)?;

        let record = build_email_record(&message, &parsed);
        let email_id = self.catalog.insert_email(&record)?;
        info!(path = email_path, email_id, "Email record inserted");

        if parsed.has_attachments() {
            info!(count = parsed.attachments.len(), "Processing attachments");
        }
        for (attachment, key) in parsed.attachments.iter().zip(&keys) {
            self.store_attachment(email_id, key, attachment)?;
        }

        Ok(ProcessOutcome {
            success: true,
            email_id,
            email_path: email_path.to_string(),
            attachment_count: parsed.attachments.len(),
        })
    }

    fn store_attachment(&mut self, email_id: u64, key: &str, attachment: &Attachment) -> Result<()> {
        self.store.put(key, attachment.content())?;
        self.catalog.insert_attachment(&AttachmentRecord {
            email_id,
            filename: attachment.filename().to_string(),
            content_type: attachment.content_type().to_string(),
            size_bytes: attachment.size(),
            file_path: key.to_string(),
        })?;
        info!(
            filename = attachment.filename(),
            size = attachment.size(),
            key,
            "Stored attachment"
        );
        Ok(())
    }
}

/// Combine side-channel metadata with parse results into an `emails` row.
pub fn build_email_record(message: &StoredMessage, parsed: &ParsedEmail) -> EmailRecord {
    let meta = &message.metadata;
    EmailRecord {
        to_address: meta.to.clone(),
        current_folder: folder_from_path(&message.key),
        recipients: meta.to.clone(),
        cc_recipients: parsed.headers.cc.clone(),
        bcc_recipients: parsed.headers.bcc.clone(),
        from_address: meta.from.clone(),
        subject: meta.subject.clone().unwrap_or_default(),
        preview_text: parsed.preview_text.clone(),
        size_bytes: meta.size.unwrap_or(message.content.len() as u64),
        file_path: message.key.clone(),
        has_attachment: parsed.has_attachments(),
        date_received: meta
            .received_at
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
        message_id: meta.message_id.clone().unwrap_or_default(),
    }
}

/// Folder of a message path such as `emails/user@example.com/Inbox/123.eml`.
///
/// The second-to-last segment when there are at least three, else `Inbox`.
pub fn folder_from_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() >= 3 {
        segments[segments.len() - 2].to_string()
    } else {
        DEFAULT_FOLDER.to_string()
    }
}

/// Storage keys for all attachments of one message, distinct and valid.
fn attachment_keys(email_path: &str, attachments: &[Attachment]) -> Result<Vec<String>> {
    let mut used = HashSet::new();
    let mut keys = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        let key = unique_key(attachment_key(email_path, attachment.filename()), &used);
        validate_key(&key)?;
        used.insert(key.clone());
        keys.push(key);
    }
    Ok(keys)
}

/// Storage key of an attachment.
///
/// `<stem>/attachments/<filename>` for `<stem>.eml`; any other key gets its
/// blobs under `<key>.d/attachments/` since `<key>` itself is a file.
pub fn attachment_key(email_path: &str, filename: &str) -> String {
    let base = match email_path.strip_suffix(".eml") {
        Some(stem) if !stem.is_empty() && !stem.ends_with('/') => stem.to_string(),
        _ => format!("{email_path}.d"),
    };
    format!(
        "{base}/attachments/{}",
        sanitize_filename(filename, MAX_FILENAME_LEN)
    )
}

/// Append `_1`, `_2`, … before the extension until `key` is not in `used`.
fn unique_key(key: String, used: &HashSet<String>) -> String {
    if !used.contains(&key) {
        return key;
    }

    let (dir, name) = key.rsplit_once('/').unwrap_or(("", key.as_str()));
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut i = 1;
    loop {
        let name = match ext {
            Some(ext) => format!("{stem}_{i}.{ext}"),
            None => format!("{stem}_{i}"),
        };
        let candidate = if dir.is_empty() {
            name
        } else {
            format!("{dir}/{name}")
        };
        if !used.contains(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

/// Sanitize a declared filename for use as a single key segment.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else if sanitized.chars().all(|c| c == '.') {
        format!("_{sanitized}")
    } else {
        sanitized
    }
}
