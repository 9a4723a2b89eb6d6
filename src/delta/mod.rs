//! Delta module: change batch parsing, per-entity grouping and state reconstruction

pub mod ingest;
pub mod reconstruct;
pub mod types;

pub use ingest::{ingest, EntityDeltas};
pub use reconstruct::{reconstruct, GraphStates};
pub use types::{ChangeBatch, ChangeKind, ChangeSet, Delta};
