//! Digest flushing
//!
//! Drains the outbox of one batched frequency: each pending entry is
//! expanded with the current content of the entities it touches, rendered
//! and handed to the mailer. An entry is removed only once its digest
//! was queued.

use super::render::DigestContent;
use crate::collab::Collaborators;
use crate::error::{Error, Result};
use crate::outbox::{OutboxKey, OutboxStore};
use crate::rdf::Graph;
use crate::subscription::Frequency;
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Outcome of a successful flush
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub frequency: String,
    /// Digests queued for delivery
    pub delivered: usize,
    /// Entries removed without sending anything: empty ones, and those
    /// of users who no longer have an email address
    pub discarded: usize,
}

enum EntryOutcome {
    Delivered,
    Discarded,
}

/// Builds and delivers digests from the outbox
pub struct DigestFlusher {
    collab: Collaborators,
    outbox: Arc<OutboxStore>,
}

impl DigestFlusher {
    pub fn new(collab: Collaborators, outbox: Arc<OutboxStore>) -> Self {
        Self { collab, outbox }
    }

    /// Flush every pending entry of a batched frequency.
    ///
    /// A failing subscriber does not stop the others: its entry is kept for
    /// the next flush and the call ends in [`Error::PartialFlush`].
    pub async fn flush(&self, frequency: Frequency) -> Result<FlushReport> {
        if !frequency.is_batched() {
            return Err(Error::InvalidInput(format!(
                "Frequency {} cannot be flushed",
                frequency
            )));
        }

        let keys = self.outbox.keys(frequency).await?;
        let mut report = FlushReport {
            frequency: frequency.to_string(),
            ..Default::default()
        };
        if keys.is_empty() {
            tracing::info!(frequency = %frequency, "Nothing to flush");
            return Ok(report);
        }

        let emails = self.collab.registry.emails().await?;

        let mut failed = Vec::new();
        for key in &keys {
            match self.flush_entry(key, &emails).await {
                Ok(EntryOutcome::Delivered) => report.delivered += 1,
                Ok(EntryOutcome::Discarded) => report.discarded += 1,
                Err(e) => {
                    tracing::error!(
                        subscriber = %key.subscriber,
                        frequency = %frequency,
                        "Failed to flush digest: {}",
                        e
                    );
                    failed.push(key.subscriber.clone());
                }
            }
        }

        if !failed.is_empty() {
            return Err(Error::PartialFlush {
                delivered: report.delivered,
                failed,
            });
        }

        tracing::info!(
            frequency = %frequency,
            delivered = report.delivered,
            discarded = report.discarded,
            "Flushed digests"
        );
        Ok(report)
    }

    async fn flush_entry(
        &self,
        key: &OutboxKey,
        emails: &HashMap<String, String>,
    ) -> Result<EntryOutcome> {
        let _guard = self.outbox.lock(key).await;

        let entry = match self.outbox.load(key).await? {
            Some(entry) if !entry.is_empty() => entry,
            _ => {
                self.outbox.remove(key).await?;
                return Ok(EntryOutcome::Discarded);
            }
        };

        let Some(address) = emails.get(&key.subscriber) else {
            tracing::warn!(
                subscriber = %key.subscriber,
                frequency = %key.frequency,
                inserts = entry.inserts.len(),
                deletes = entry.deletes.len(),
                "Dropping digest for user without an email address"
            );
            self.outbox.remove(key).await?;
            return Ok(EntryOutcome::Discarded);
        };

        let subjects: BTreeSet<&str> = entry
            .inserts
            .subjects()
            .into_iter()
            .chain(entry.deletes.subjects())
            .collect();

        let mut entities = BTreeSet::new();
        for subject in subjects {
            entities.extend(self.collab.resolver.find_related(subject).await?);
        }

        let mut content = Graph::new();
        for entity in &entities {
            content = content.union(&self.collab.fetcher.fetch(entity).await?);
        }
        let unchanged = content.difference(&entry.inserts).difference(&entry.deletes);

        let digest = DigestContent {
            subscriber: key.subscriber.clone(),
            frequency: key.frequency,
            entities: entities.into_iter().collect(),
            unchanged,
            inserts: entry.inserts,
            deletes: entry.deletes,
            generated_at: Utc::now(),
        };
        let html = self.collab.renderer.render(&digest)?;
        self.collab.mailer.enqueue(&html, address).await?;

        // The digest is queued; a failure from here on means it may be sent twice
        self.outbox.remove(key).await?;

        tracing::debug!(
            subscriber = %key.subscriber,
            entities = digest.entities.len(),
            "Digest delivered"
        );
        Ok(EntryOutcome::Delivered)
    }
}
