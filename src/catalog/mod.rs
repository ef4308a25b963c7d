//! Catalog of processed messages and their attachments.
//!
//! Two append-only tables, one JSON object per line:
//!
//! ```text
//! <dir>/emails.jsonl       {"id":1,"to_address":…,"preview_text":…,…}
//! <dir>/attachments.jsonl  {"id":1,"email_id":1,"filename":…,…}
//! ```
//!
//! Ids start at 1 and continue after the highest id found when the table
//! is opened.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::model::record::{AttachmentRecord, EmailRecord};

pub const EMAILS_TABLE: &str = "emails.jsonl";
pub const ATTACHMENTS_TABLE: &str = "attachments.jsonl";

/// Persistence for per-message and per-attachment records.
pub trait Catalog {
    /// Insert an email row and return its generated id.
    fn insert_email(&mut self, record: &EmailRecord) -> Result<u64>;

    /// Insert an attachment row linked to an email id.
    fn insert_attachment(&mut self, record: &AttachmentRecord) -> Result<()>;
}

/// A stored row: the record plus its generated id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row<T> {
    pub id: u64,
    #[serde(flatten)]
    pub record: T,
}

#[derive(Deserialize)]
struct RowId {
    id: u64,
}

/// JSON-lines catalog stored in a directory.
#[derive(Debug)]
pub struct JsonlCatalog {
    dir: PathBuf,
    next_email_id: u64,
    next_attachment_id: u64,
}

impl JsonlCatalog {
    /// Open (creating if needed) the catalog in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| IngestError::io(&dir, e))?;

        let last_email = last_id(&dir.join(EMAILS_TABLE))?;
        let last_attachment = last_id(&dir.join(ATTACHMENTS_TABLE))?;
        debug!(
            dir = %dir.display(),
            last_email,
            last_attachment,
            "Opened catalog"
        );

        Ok(Self {
            dir,
            next_email_id: last_email + 1,
            next_attachment_id: last_attachment + 1,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All email rows, in insertion order.
    pub fn emails(&self) -> Result<Vec<Row<EmailRecord>>> {
        read_rows(&self.dir.join(EMAILS_TABLE))
    }

    /// All attachment rows, in insertion order.
    pub fn attachments(&self) -> Result<Vec<Row<AttachmentRecord>>> {
        read_rows(&self.dir.join(ATTACHMENTS_TABLE))
    }

    fn append<T: Serialize>(&self, table: &str, row: &Row<T>) -> Result<()> {
        let path = self.dir.join(table);
        let mut line =
            serde_json::to_vec(row).map_err(|e| IngestError::Catalog(e.to_string()))?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| IngestError::io(&path, e))?;
        file.write_all(&line).map_err(|e| IngestError::io(&path, e))
    }
}

impl Catalog for JsonlCatalog {
    fn insert_email(&mut self, record: &EmailRecord) -> Result<u64> {
        let id = self.next_email_id;
        self.append(EMAILS_TABLE, &Row { id, record })?;
        self.next_email_id += 1;
        Ok(id)
    }

    fn insert_attachment(&mut self, record: &AttachmentRecord) -> Result<()> {
        let id = self.next_attachment_id;
        self.append(ATTACHMENTS_TABLE, &Row { id, record })?;
        self.next_attachment_id += 1;
        Ok(())
    }
}

/// Highest id in a table, or 0 if the table is missing or empty.
fn last_id(path: &Path) -> Result<u64> {
    let rows: Vec<RowId> = read_lines(path)?;
    Ok(rows.iter().map(|r| r.id).max().unwrap_or(0))
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<Row<T>>> {
    read_lines(path)
}

fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(IngestError::io(path, e)),
    };

    let mut rows = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| IngestError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|e| {
            IngestError::Catalog(format!("{}:{}: {e}", path.display(), lineno + 1))
        })?;
        rows.push(row);
    }
    Ok(rows)
}
