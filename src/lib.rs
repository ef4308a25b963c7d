//! `mailingest`: extract headers, a preview and attachments from raw email.
//!
//! The [`parser`] module is the core: a pure, synchronous scanner turning a
//! raw RFC 822 message into a [`model::mail::ParsedEmail`]. The [`store`],
//! [`catalog`] and [`pipeline`] modules persist the results.

pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod store;

pub use parser::{parse, MessageParser};
