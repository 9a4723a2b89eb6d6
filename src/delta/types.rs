//! Change batch wire types and per-entity deltas
//!
//! The inbound body is a JSON array of change sets:
//!
//! ```json
//! [
//!   {
//!     "inserts": [{ "subject": {"type": "uri", "value": "..."},
//!                   "predicate": {"type": "uri", "value": "..."},
//!                   "object": {"type": "literal", "value": "..."} }],
//!     "deletes": []
//!   }
//! ]
//! ```

use crate::error::{Error, Result};
use crate::rdf::{Graph, Statement};
use serde::{Deserialize, Serialize};

/// Which half of a change a statement belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Delete,
}

/// One raw change notification, usually one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub inserts: Vec<Statement>,
    pub deletes: Vec<Statement>,
}

impl ChangeSet {
    /// Inserts first, then deletes
    pub fn statements(&self) -> impl Iterator<Item = (ChangeKind, &Statement)> {
        self.inserts
            .iter()
            .map(|s| (ChangeKind::Insert, s))
            .chain(self.deletes.iter().map(|s| (ChangeKind::Delete, s)))
    }
}

/// An ordered batch of change sets as delivered by the delta notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeBatch {
    pub changes: Vec<ChangeSet>,
}

impl ChangeBatch {
    pub fn new(changes: Vec<ChangeSet>) -> Self {
        Self { changes }
    }

    /// Parse and validate a request body.
    ///
    /// Absent, empty or malformed bodies, unknown value types and
    /// statements whose subject or predicate is not a URI are rejected.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(Error::InvalidInput("empty request body".to_string()));
        }

        let batch: ChangeBatch = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidInput(format!("malformed change batch: {}", e)))?;

        if batch.changes.is_empty() {
            return Err(Error::InvalidInput("change batch contains no change sets".to_string()));
        }

        for change in &batch.changes {
            for (_, statement) in change.statements() {
                if !statement.subject.is_uri() {
                    return Err(Error::InvalidInput(format!(
                        "statement subject must be a URI: {}",
                        statement
                    )));
                }
                if !statement.predicate.is_uri() {
                    return Err(Error::InvalidInput(format!(
                        "statement predicate must be a URI: {}",
                        statement
                    )));
                }
            }
        }

        Ok(batch)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeSet> {
        self.changes.iter()
    }

    /// Total number of statements across all change sets
    pub fn statement_count(&self) -> usize {
        self.changes
            .iter()
            .map(|c| c.inserts.len() + c.deletes.len())
            .sum()
    }
}

/// The statements attributed to one content entity.
///
/// Lists keep duplicates as received; applying them is idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub inserts: Vec<Statement>,
    pub deletes: Vec<Statement>,
}

impl Delta {
    pub fn push(&mut self, kind: ChangeKind, statement: Statement) {
        match kind {
            ChangeKind::Insert => self.inserts.push(statement),
            ChangeKind::Delete => self.deletes.push(statement),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }

    pub fn insert_graph(&self) -> Graph {
        self.inserts.iter().collect()
    }

    pub fn delete_graph(&self) -> Graph {
        self.deletes.iter().collect()
    }
}
