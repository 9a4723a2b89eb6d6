//! Outbox module: durable accumulation of matched changes between digests
//!
//! Entries are keyed by (frequency, subscriber) and persisted as JSON files
//! under the configured outbox directory.

pub mod store;

pub use store::{OutboxEntry, OutboxKey, OutboxStore};
