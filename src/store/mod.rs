//! Object store holding raw messages, their side-channel metadata and
//! extracted attachment blobs.

pub mod fs;

use crate::error::{IngestError, Result};
use crate::model::record::MessageMetadata;

/// A raw message fetched from the store.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    /// Key the message was fetched with.
    pub key: String,
    /// Raw RFC 822 bytes.
    pub content: Vec<u8>,
    /// Side-channel metadata (default if none was stored).
    pub metadata: MessageMetadata,
}

/// Blob storage addressed by slash-separated keys.
pub trait ObjectStore {
    /// Fetch a message and its metadata. `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<StoredMessage>>;

    /// Size in bytes of the object under `key`, without reading it.
    /// `Ok(None)` if the key does not exist.
    fn size(&self, key: &str) -> Result<Option<u64>>;

    /// Store `content` under `key`, replacing any existing object.
    fn put(&self, key: &str, content: &[u8]) -> Result<()>;
}

/// Check that `key` is a relative, `/`-separated path with no `.`, `..` or
/// empty segments.
pub fn validate_key(key: &str) -> Result<()> {
    let invalid = key.is_empty()
        || key.contains(['\\', '\0'])
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        return Err(IngestError::InvalidPath(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("emails/user@example.com/Inbox/1.eml").is_ok());
        assert!(validate_key("a.eml").is_ok());
        for bad in ["", "/abs.eml", "a//b", "a/../b", "./a", "a/", "a\\b"] {
            assert!(
                matches!(validate_key(bad), Err(IngestError::InvalidPath(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
