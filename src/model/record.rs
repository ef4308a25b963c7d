//! Records exchanged with the object store and the catalog.

use serde::{Deserialize, Serialize};

/// Side-channel metadata stored next to a raw message.
///
/// Written by whatever delivered the message (e.g. an SMTP front end);
/// every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageMetadata {
    pub to: Option<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub message_id: Option<String>,
    /// Size of the raw message in bytes, as reported by the sender side.
    pub size: Option<u64>,
    /// RFC 3339 timestamp of reception.
    pub received_at: Option<String>,
}

/// One row of the `emails` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub to_address: Option<String>,
    pub current_folder: String,
    /// Primary recipient.
    pub recipients: Option<String>,
    pub cc_recipients: Option<String>,
    pub bcc_recipients: Option<String>,
    pub from_address: Option<String>,
    pub subject: String,
    pub preview_text: String,
    pub size_bytes: u64,
    pub file_path: String,
    pub has_attachment: bool,
    pub date_received: String,
    pub message_id: String,
}

/// One row of the `attachments` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub email_id: u64,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    /// Object-store key of the stored blob.
    pub file_path: String,
}

/// Summary returned after a message has been processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub success: bool,
    pub email_id: u64,
    pub email_path: String,
    pub attachment_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_camel_case() {
        let json = r#"{"to":"bob@example.com","messageId":"<m1@x>","receivedAt":"2024-01-04T10:00:00Z","size":42}"#;
        let meta: MessageMetadata = serde_json::from_str(json).expect("parse");
        assert_eq!(meta.to.as_deref(), Some("bob@example.com"));
        assert_eq!(meta.message_id.as_deref(), Some("<m1@x>"));
        assert_eq!(meta.size, Some(42));
        assert!(meta.from.is_none());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ProcessOutcome {
            success: true,
            email_id: 7,
            email_path: "emails/a/Inbox/1.eml".into(),
            attachment_count: 2,
        };
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["emailId"], 7);
        assert_eq!(json["emailPath"], "emails/a/Inbox/1.eml");
        assert_eq!(json["attachmentCount"], 2);
    }
}
