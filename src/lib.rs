//! Change Notifier - subscription-filtered notifications for RDF data changes
//!
//! The notifier receives batches of statement insertions and deletions,
//! works out which content entities they affect, reconstructs each
//! entity's state before and after the change, and tells every subscriber
//! whose SHACL filter is satisfied by either state. Notifications are sent
//! right away or accumulated in a durable outbox and delivered as periodic
//! digests.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         HTTP Gateway                              │
//! │        POST /.mu/delta          POST /flush?frequency=            │
//! └───────────┬───────────────────────────────────┬──────────────────┘
//!             │                                   │
//! ┌───────────▼──────────────┐        ┌───────────▼──────────────────┐
//! │   Notification Engine    │        │       Digest Flusher         │
//! │  ingest ─► reconstruct   │        │  load ─► expand ─► render    │
//! │        ─► decide         │        │       ─► enqueue ─► remove   │
//! └─────┬─────────────┬──────┘        └──────┬──────────────┬────────┘
//!       │ immediate   │ batched              │              │
//!       │       ┌─────▼──────────────────────▼─────┐        │
//!       │       │            Outbox                │        │
//!       │       │  <frequency>/<subscriber>/*.json │        │
//!       │       └──────────────────────────────────┘        │
//! ┌─────▼────────────────────────────────────────────────────▼───────┐
//! │                         Collaborators                             │
//! │  ContentResolver  ContentFetcher  SubscriberRegistry  Mailer      │
//! │         (SPARQL endpoint)                                         │
//! │  FilterMatcher (SHACL validator)   DigestRenderer (HTML)          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`rdf`]: Terms, statements and set-valued graphs
//! - [`delta`]: Change batches, per-entity deltas and state reconstruction
//! - [`subscription`]: Subscribers and notification frequencies
//! - [`collab`]: Collaborator traits with SPARQL, SHACL and in-memory implementations
//! - [`notify`]: Relevance decisions and the batch pipeline
//! - [`outbox`]: Durable accumulation of matched changes
//! - [`digest`]: Digest rendering and flushing
//! - [`gateway`]: HTTP API
//! - [`config`]: Configuration management

pub mod collab;
pub mod config;
pub mod delta;
pub mod digest;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod outbox;
pub mod rdf;
pub mod subscription;

pub use config::NotifierConfig;
pub use error::{Error, Result};
