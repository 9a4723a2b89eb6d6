//! Outbox store with file-based JSON persistence
//!
//! Directory layout:
//! ```text
//! <outbox dir>/
//! ├── daily/
//! │   ├── <base64url(subscriber uri)>/
//! │   │   ├── inserts.json
//! │   │   └── deletes.json
//! │   └── ...
//! ├── weekly/
//! └── monthly/
//! ```
//!
//! Every read-modify-write of an entry happens under that entry's lock.
//! Flushing takes the same lock with [`OutboxStore::lock`] and keeps it
//! across read, delivery and removal.

use crate::error::{Error, Result};
use crate::rdf::Graph;
use crate::subscription::Frequency;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

const INSERTS_FILE: &str = "inserts.json";
const DELETES_FILE: &str = "deletes.json";

/// Identifies one outbox entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutboxKey {
    pub frequency: Frequency,
    pub subscriber: String,
}

impl OutboxKey {
    pub fn new(subscriber: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            frequency,
            subscriber: subscriber.into(),
        }
    }

    /// Directory name for the subscriber: unpadded URL-safe base64 of its URI
    pub fn encoded_subscriber(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.subscriber.as_bytes())
    }

    /// Recover a key from a directory name
    pub fn decode(frequency: Frequency, encoded: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| Error::Outbox(format!("Invalid outbox key {}: {}", encoded, e)))?;
        let subscriber = String::from_utf8(bytes)
            .map_err(|e| Error::Outbox(format!("Invalid outbox key {}: {}", encoded, e)))?;
        Ok(Self::new(subscriber, frequency))
    }
}

/// Accumulated, not yet delivered changes for one subscriber and frequency
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboxEntry {
    pub inserts: Graph,
    pub deletes: Graph,
}

impl OutboxEntry {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }

    /// Union of this entry with newly matched changes
    pub fn merged(&self, inserts: &Graph, deletes: &Graph) -> OutboxEntry {
        OutboxEntry {
            inserts: self.inserts.union(inserts),
            deletes: self.deletes.union(deletes),
        }
    }
}

/// Durable per-subscriber, per-frequency accumulation of matched changes
pub struct OutboxStore {
    base_dir: PathBuf,
    locks: Mutex<HashMap<OutboxKey, Arc<Mutex<()>>>>,
}

impl OutboxStore {
    /// Open (and create if needed) an outbox at the given base directory
    pub async fn new(base_dir: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| io_error("create", &base_dir, e))?;
        Ok(Self {
            base_dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Default base directory (<data dir>/change-notifier/outbox)
    pub fn default_dir() -> PathBuf {
        dirs_next::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("change-notifier")
            .join("outbox")
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn frequency_dir(&self, frequency: Frequency) -> PathBuf {
        self.base_dir.join(frequency.as_str())
    }

    fn entry_dir(&self, key: &OutboxKey) -> PathBuf {
        self.frequency_dir(key.frequency)
            .join(key.encoded_subscriber())
    }

    /// Exclusive access to one entry
    pub async fn lock(&self, key: &OutboxKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    // =========================================================================
    // Accumulation
    // =========================================================================

    /// Merge matched changes into the subscriber's entry for `frequency`.
    ///
    /// The stored graphs are unioned with the new ones, never replaced.
    pub async fn accumulate(
        &self,
        subscriber: &str,
        frequency: Frequency,
        inserts: &Graph,
        deletes: &Graph,
    ) -> Result<()> {
        if inserts.is_empty() && deletes.is_empty() {
            return Ok(());
        }

        let key = OutboxKey::new(subscriber, frequency);
        let _guard = self.lock(&key).await;

        let current = self.load(&key).await?.unwrap_or_default();
        let merged = current.merged(inserts, deletes);
        self.write(&key, &merged).await?;

        tracing::debug!(
            subscriber,
            frequency = %frequency,
            inserts = merged.inserts.len(),
            deletes = merged.deletes.len(),
            "Accumulated changes in outbox"
        );
        Ok(())
    }

    // =========================================================================
    // Entry access (callers hold the entry lock)
    // =========================================================================

    /// Keys of all entries stored for a frequency
    pub async fn keys(&self, frequency: Frequency) -> Result<Vec<OutboxKey>> {
        let dir = self.frequency_dir(frequency);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("list", &dir, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("list", &dir, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::warn!("Skipping non UTF-8 outbox entry in {}", dir.display());
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            match OutboxKey::decode(frequency, name) {
                Ok(key) => keys.push(key),
                Err(e) => tracing::warn!("Skipping outbox entry {}: {}", name, e),
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Read an entry; `None` if it does not exist
    pub async fn load(&self, key: &OutboxKey) -> Result<Option<OutboxEntry>> {
        let dir = self.entry_dir(key);
        if !tokio::fs::try_exists(&dir)
            .await
            .map_err(|e| io_error("stat", &dir, e))?
        {
            return Ok(None);
        }

        Ok(Some(OutboxEntry {
            inserts: read_graph(&dir.join(INSERTS_FILE)).await?,
            deletes: read_graph(&dir.join(DELETES_FILE)).await?,
        }))
    }

    /// Delete an entry after its digest was delivered
    pub async fn remove(&self, key: &OutboxKey) -> Result<()> {
        let dir = self.entry_dir(key);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &dir, e)),
        }
    }

    async fn write(&self, key: &OutboxKey, entry: &OutboxEntry) -> Result<()> {
        let dir = self.entry_dir(key);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create", &dir, e))?;
        write_graph(&dir.join(INSERTS_FILE), &entry.inserts).await?;
        write_graph(&dir.join(DELETES_FILE), &entry.deletes).await
    }
}

async fn read_graph(path: &Path) -> Result<Graph> {
    match tokio::fs::read(path).await {
        Ok(data) => serde_json::from_slice(&data)
            .map_err(|e| Error::Outbox(format!("Failed to parse {}: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Graph::new()),
        Err(e) => Err(io_error("read", path, e)),
    }
}

/// Write to a temporary file and rename it over the target
async fn write_graph(path: &Path, graph: &Graph) -> Result<()> {
    let json = serde_json::to_vec_pretty(graph)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| io_error("write", &tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error("rename", path, e))
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Outbox(format!("Failed to {} {}: {}", action, path.display(), e))
}
