//! Core data model types: parsed messages, attachments and persisted records.

pub mod attachment;
pub mod mail;
pub mod record;
