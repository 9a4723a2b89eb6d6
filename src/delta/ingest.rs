//! Group a change batch into per-entity deltas

use super::types::{ChangeBatch, Delta};
use crate::collab::ContentResolver;
use crate::error::Result;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Deltas keyed by content entity URI
pub type EntityDeltas = BTreeMap<String, Delta>;

/// Resolve every statement subject to its content entities and append the
/// statement to each entity's delta.
///
/// Every entity of the batch is merged before this returns, so several
/// change sets touching one entity produce a single delta. Subjects that
/// resolve to nothing are dropped.
pub async fn ingest(batch: &ChangeBatch, resolver: &dyn ContentResolver) -> Result<EntityDeltas> {
    let mut resolved: HashMap<&str, BTreeSet<String>> = HashMap::new();
    let mut deltas = EntityDeltas::new();

    for change in batch.iter() {
        for (kind, statement) in change.statements() {
            // Subjects are validated as URIs when the batch is parsed.
            let subject = statement.subject.value();

            let entities = match resolved.entry(subject) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let found = resolver.find_related(subject).await?;
                    if found.is_empty() {
                        tracing::debug!(subject, "Subject resolves to no content entity");
                    }
                    e.insert(found)
                }
            };

            for entity in entities.iter() {
                deltas
                    .entry(entity.clone())
                    .or_default()
                    .push(kind, statement.clone());
            }
        }
    }

    tracing::debug!(
        statements = batch.statement_count(),
        subjects = resolved.len(),
        entities = deltas.len(),
        "Ingested change batch"
    );
    Ok(deltas)
}
