//! In-memory collaborators
//!
//! Used to embed the engine without a triple store and throughout the
//! test suite.

use super::{ContentFetcher, ContentResolver, FilterMatcher, Mailer, SubscriberRegistry};
use crate::error::{Error, Result};
use crate::rdf::Graph;
use crate::subscription::Subscriber;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Content relationships, entity graphs and subscribers held in memory
#[derive(Default)]
pub struct MemoryStore {
    related: RwLock<HashMap<String, BTreeSet<String>>>,
    content: RwLock<HashMap<String, Graph>>,
    subscribers: RwLock<Vec<Subscriber>>,
    emails: RwLock<HashMap<String, String>>,
    resolve_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that changes to `subject` affect `entity`
    pub async fn relate(&self, subject: &str, entity: &str) {
        self.related
            .write()
            .await
            .entry(subject.to_string())
            .or_default()
            .insert(entity.to_string());
    }

    /// Set the current graph of an entity
    pub async fn set_content(&self, entity: &str, graph: Graph) {
        self.content.write().await.insert(entity.to_string(), graph);
    }

    /// Register a subscription, recording the subscriber's email if it has one
    pub async fn add_subscriber(&self, subscriber: Subscriber) {
        if let Some(email) = &subscriber.email {
            self.set_email(&subscriber.uri, email).await;
        }
        self.subscribers.write().await.push(subscriber);
    }

    pub async fn set_email(&self, user: &str, email: &str) {
        self.emails
            .write()
            .await
            .insert(user.to_string(), email.to_string());
    }

    /// Drop every subscription of `user`. The email record stays.
    pub async fn unsubscribe(&self, user: &str) {
        self.subscribers.write().await.retain(|s| s.uri != user);
    }

    /// Number of `find_related` calls served
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentResolver for MemoryStore {
    async fn find_related(&self, subject: &str) -> Result<BTreeSet<String>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .related
            .read()
            .await
            .get(subject)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ContentFetcher for MemoryStore {
    async fn fetch(&self, entity: &str) -> Result<Graph> {
        Ok(self
            .content
            .read()
            .await
            .get(entity)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SubscriberRegistry for MemoryStore {
    async fn subscribers(&self) -> Result<Vec<Subscriber>> {
        Ok(self.subscribers.read().await.clone())
    }

    async fn emails(&self) -> Result<HashMap<String, String>> {
        Ok(self.emails.read().await.clone())
    }
}

type MatchFn = dyn Fn(&Graph, &Graph) -> bool + Send + Sync;

/// A filter matcher backed by a plain predicate, counting its invocations
pub struct PredicateMatcher {
    predicate: Box<MatchFn>,
    calls: AtomicUsize,
}

impl PredicateMatcher {
    pub fn new(predicate: impl Fn(&Graph, &Graph) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            calls: AtomicUsize::new(0),
        }
    }

    /// Matches when every predicate used in the filter also appears in the data
    pub fn required_predicates() -> Self {
        Self::new(|data, filter| {
            let wanted: HashSet<&str> =
                filter.iter().filter_map(|s| s.predicate.as_uri()).collect();
            wanted
                .iter()
                .all(|p| data.iter().any(|s| s.predicate.as_uri() == Some(*p)))
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FilterMatcher for PredicateMatcher {
    async fn matches(&self, data: &Graph, filter: &Graph) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.predicate)(data, filter))
    }
}

/// A queued notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub address: String,
    pub html: String,
}

/// A mailer that records every message, optionally refusing some addresses
#[derive(Default)]
pub struct RecordingMailer {
    sent: RwLock<Vec<SentMail>>,
    failing: RwLock<HashSet<String>>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every delivery to `address` fail until [`RecordingMailer::recover`]
    pub async fn fail_for(&self, address: &str) {
        self.failing.write().await.insert(address.to_string());
    }

    pub async fn recover(&self, address: &str) {
        self.failing.write().await.remove(address);
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, address: &str) -> Vec<SentMail> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|m| m.address == address)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn enqueue(&self, html: &str, address: &str) -> Result<()> {
        if self.failing.read().await.contains(address) {
            return Err(Error::Delivery(format!("mail queue rejected {}", address)));
        }
        self.sent.write().await.push(SentMail {
            address: address.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}
