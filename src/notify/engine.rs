//! Batch pipeline
//!
//! ```text
//! ChangeBatch ──► ingest ──► per entity: fetch post ──► reconstruct
//!                                                        │
//!                        per subscriber: decide ◄────────┘
//!                              │
//!                ┌─────────────┴──────────────┐
//!            immediate                   daily/weekly/monthly
//!         render + enqueue             outbox.accumulate
//! ```

use super::decision::{decide, Decision};
use crate::collab::Collaborators;
use crate::delta::{ingest, reconstruct, ChangeBatch, Delta};
use crate::digest::DigestContent;
use crate::error::Result;
use crate::outbox::OutboxStore;
use crate::rdf::Graph;
use crate::subscription::{Frequency, Subscriber};
use serde::Serialize;
use std::sync::Arc;

/// Summary of one processed batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Content entities affected by the batch
    pub entities: usize,
    /// Entities that no longer exist and were not evaluated
    pub skipped_entities: usize,
    /// (entity, subscriber) pairs that were relevant
    pub notified: usize,
    /// Notifications stored in the outbox for a later digest
    pub accumulated: usize,
    /// Notifications delivered immediately
    pub delivered: usize,
}

/// Turns change batches into notifications
pub struct NotificationEngine {
    collab: Collaborators,
    outbox: Arc<OutboxStore>,
}

impl NotificationEngine {
    pub fn new(collab: Collaborators, outbox: Arc<OutboxStore>) -> Self {
        Self { collab, outbox }
    }

    pub fn outbox(&self) -> &Arc<OutboxStore> {
        &self.outbox
    }

    /// Process one batch end to end.
    ///
    /// Every entity delta is built before any reconstruction starts, and
    /// subscribers are loaded once for the whole batch.
    pub async fn process(&self, batch: &ChangeBatch) -> Result<BatchReport> {
        let deltas = ingest(batch, self.collab.resolver.as_ref()).await?;
        let mut report = BatchReport {
            entities: deltas.len(),
            ..Default::default()
        };
        if deltas.is_empty() {
            tracing::debug!(
                statements = batch.statement_count(),
                "Batch affects no content entities"
            );
            return Ok(report);
        }

        let subscribers = self.collab.registry.subscribers().await?;

        for (entity, delta) in &deltas {
            let post = self.collab.fetcher.fetch(entity).await?;
            if post.is_empty() {
                tracing::debug!(entity = %entity, "Entity has no content, skipping");
                report.skipped_entities += 1;
                continue;
            }

            self.process_entity(entity, &post, delta, &subscribers, &mut report)
                .await?;
        }

        tracing::info!(
            entities = report.entities,
            skipped = report.skipped_entities,
            notified = report.notified,
            accumulated = report.accumulated,
            delivered = report.delivered,
            "Processed change batch"
        );
        Ok(report)
    }

    async fn process_entity(
        &self,
        entity: &str,
        post: &Graph,
        delta: &Delta,
        subscribers: &[Subscriber],
        report: &mut BatchReport,
    ) -> Result<()> {
        let states = reconstruct(post, delta);
        let inserts = delta.insert_graph();
        let deletes = delta.delete_graph();

        for subscriber in subscribers {
            if !subscriber.has_filter() {
                tracing::debug!(subscriber = %subscriber.uri, "No active filter");
                continue;
            }

            let transition = match decide(
                post,
                &states.pre,
                &subscriber.filter,
                self.collab.matcher.as_ref(),
            )
            .await?
            {
                Decision::Notify(transition) => transition,
                Decision::Skip => continue,
            };
            report.notified += 1;

            tracing::debug!(
                entity = %entity,
                subscriber = %subscriber.uri,
                transition = %transition,
                frequency = %subscriber.frequency,
                "Change is relevant"
            );

            match subscriber.frequency {
                Frequency::Immediate => {
                    let Some(address) = subscriber.email.as_deref() else {
                        tracing::warn!(
                            subscriber = %subscriber.uri,
                            "Subscriber has no email address, notification dropped"
                        );
                        continue;
                    };
                    let content = DigestContent::single(
                        subscriber.uri.clone(),
                        entity,
                        states.unchanged.clone(),
                        inserts.clone(),
                        deletes.clone(),
                    );
                    let html = self.collab.renderer.render(&content)?;
                    self.collab.mailer.enqueue(&html, address).await?;
                    report.delivered += 1;
                }
                frequency => {
                    self.outbox
                        .accumulate(&subscriber.uri, frequency, &inserts, &deletes)
                        .await?;
                    report.accumulated += 1;
                }
            }
        }

        Ok(())
    }
}
