//! Filesystem-backed object store.
//!
//! ```text
//! <root>/emails/user@example.com/Inbox/123.eml            raw message
//! <root>/emails/user@example.com/Inbox/123.eml.meta.json  MessageMetadata
//! <root>/emails/user@example.com/Inbox/123/attachments/…  extracted blobs
//! <root>/emails/user@example.com/Inbox/raw.d/attachments/… blobs of a key
//!                                                          without `.eml`
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{validate_key, ObjectStore, StoredMessage};
use crate::error::{IngestError, Result};
use crate::model::record::MessageMetadata;

/// Suffix of the metadata sidecar stored next to a message.
pub const META_SUFFIX: &str = ".meta.json";

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of the object stored under `key`.
    pub fn object_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn metadata_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}{META_SUFFIX}")))
    }

    /// Write the metadata sidecar for `key`.
    pub fn put_metadata(&self, key: &str, metadata: &MessageMetadata) -> Result<()> {
        let path = self.metadata_path(key)?;
        let json = serde_json::to_vec_pretty(metadata).map_err(|e| IngestError::Metadata {
            path: key.to_string(),
            reason: e.to_string(),
        })?;
        write_creating_parents(&path, &json)
    }

    fn read_metadata(&self, key: &str) -> Result<MessageMetadata> {
        let path = self.metadata_path(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| IngestError::Metadata {
                path: key.to_string(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MessageMetadata::default()),
            Err(e) => Err(IngestError::io(path, e)),
        }
    }

    /// List the keys of all `.eml` objects under `prefix` (recursively), sorted.
    ///
    /// An empty prefix lists the whole store.
    pub fn list_messages(&self, prefix: &str) -> Result<Vec<String>> {
        let start = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.object_path(prefix.trim_end_matches('/'))?
        };

        let mut keys = Vec::new();
        if start.is_dir() {
            self.collect_messages(&start, &mut keys)?;
        }
        keys.sort();
        Ok(keys)
    }

    fn collect_messages(&self, dir: &Path, keys: &mut Vec<String>) -> Result<()> {
        let entries = std::fs::read_dir(dir).map_err(|e| IngestError::io(dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| IngestError::io(dir, e))?.path();
            if path.is_dir() {
                if is_attachment_dir(&path) {
                    continue;
                }
                self.collect_messages(&path, keys)?;
            } else if path.extension().is_some_and(|ext| ext == "eml") {
                if let Some(key) = self.key_for(&path) {
                    keys.push(key);
                }
            }
        }
        Ok(())
    }

    /// Key of a path inside the root, joined with `/`.
    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments: Option<Vec<&str>> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();
        Some(segments?.join("/"))
    }
}

impl ObjectStore for FsObjectStore {
    fn get(&self, key: &str) -> Result<Option<StoredMessage>> {
        let path = self.object_path(key)?;
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IngestError::io(path, e)),
        };
        debug!(key, size = content.len(), "Read object");

        let metadata = self.read_metadata(key)?;
        Ok(Some(StoredMessage {
            key: key.to_string(),
            content,
            metadata,
        }))
    }

    fn size(&self, key: &str) -> Result<Option<u64>> {
        let path = self.object_path(key)?;
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IngestError::io(path, e)),
        }
    }

    fn put(&self, key: &str, content: &[u8]) -> Result<()> {
        let path = self.object_path(key)?;
        write_creating_parents(&path, content)?;
        debug!(key, size = content.len(), "Wrote object");
        Ok(())
    }
}

/// `<stem>/attachments` next to `<stem>.eml`, or `<key>.d/attachments` next
/// to `<key>`.
fn is_attachment_dir(path: &Path) -> bool {
    if path.file_name().is_none_or(|name| name != "attachments") {
        return false;
    }
    let Some(owner) = path.parent() else {
        return false;
    };
    let (Some(parent), Some(name)) = (owner.parent(), owner.file_name().and_then(|n| n.to_str()))
    else {
        return false;
    };
    parent.join(format!("{name}.eml")).is_file()
        || name
            .strip_suffix(".d")
            .is_some_and(|message| parent.join(message).is_file())
}

fn write_creating_parents(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| IngestError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| IngestError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path());
        assert!(store.get("emails/a/Inbox/none.eml").unwrap().is_none());
    }

    #[test]
    fn test_put_get_with_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path());
        let key = "emails/a@x.com/Inbox/1.eml";

        store.put(key, b"Subject: Hi\r\n\r\nBody").unwrap();
        let plain = store.get(key).unwrap().expect("stored");
        assert_eq!(plain.metadata, MessageMetadata::default());

        let meta = MessageMetadata {
            from: Some("a@x.com".into()),
            size: Some(19),
            ..MessageMetadata::default()
        };
        store.put_metadata(key, &meta).unwrap();

        let stored = store.get(key).unwrap().expect("stored");
        assert_eq!(stored.key, key);
        assert_eq!(stored.content, b"Subject: Hi\r\n\r\nBody");
        assert_eq!(stored.metadata, meta);
    }

    #[test]
    fn test_size_without_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path());
        store.put("a/Inbox/1.eml", &[b'x'; 42]).unwrap();
        store.put("a/Inbox/1/attachments/f.txt", b"x").unwrap();

        assert_eq!(store.size("a/Inbox/1.eml").unwrap(), Some(42));
        assert_eq!(store.size("a/Inbox/none.eml").unwrap(), None);
        assert_eq!(store.size("a/Inbox/1").unwrap(), None);
    }

    #[test]
    fn test_malformed_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path());
        store.put("m.eml", b"x").unwrap();
        std::fs::write(tmp.path().join("m.eml.meta.json"), "{not json").unwrap();
        assert!(matches!(
            store.get("m.eml"),
            Err(IngestError::Metadata { .. })
        ));
    }

    #[test]
    fn test_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path());
        assert!(matches!(
            store.put("../escape.bin", b"x"),
            Err(IngestError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_list_messages() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path());
        store.put("emails/b/Inbox/2.eml", b"x").unwrap();
        store.put("emails/a/Sent/1.eml", b"x").unwrap();
        store.put("emails/a/Sent/1/attachments/f.txt", b"x").unwrap();
        store.put("emails/a/Sent/1/attachments/fwd.eml", b"x").unwrap();
        store.put("emails/a/Sent/raw", b"x").unwrap();
        store.put("emails/a/Sent/raw.d/attachments/inner.eml", b"x").unwrap();
        store.put("emails/c/attachments/3.eml", b"x").unwrap();
        store
            .put_metadata("emails/a/Sent/1.eml", &MessageMetadata::default())
            .unwrap();

        assert_eq!(
            store.list_messages("").unwrap(),
            vec![
                "emails/a/Sent/1.eml",
                "emails/b/Inbox/2.eml",
                "emails/c/attachments/3.eml"
            ]
        );
        assert_eq!(
            store.list_messages("emails/b/").unwrap(),
            vec!["emails/b/Inbox/2.eml"]
        );
        assert!(store.list_messages("missing").unwrap().is_empty());
    }
}
