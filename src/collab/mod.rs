//! External collaborators
//!
//! Everything the engine needs from the outside world sits behind one of
//! these traits, so the triple store, the shape validator and the mail
//! queue can be swapped for in-memory versions (see [`memory`]).

pub mod memory;
pub mod shacl;
pub mod sparql;

use crate::config::NotifierConfig;
use crate::digest::{DigestRenderer, HtmlDigestRenderer};
use crate::error::Result;
use crate::rdf::Graph;
use crate::subscription::Subscriber;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub use shacl::ShaclValidatorClient;
pub use sparql::SparqlClient;

/// Maps a raw subject URI to the content entities it affects
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// The (possibly empty) set of related content entity URIs
    async fn find_related(&self, subject: &str) -> Result<BTreeSet<String>>;
}

/// Fetches the current full graph of a content entity
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// An empty graph means the entity does not exist
    async fn fetch(&self, entity: &str) -> Result<Graph>;
}

/// Source of subscribers, their filters and user email addresses
#[async_trait]
pub trait SubscriberRegistry: Send + Sync {
    async fn subscribers(&self) -> Result<Vec<Subscriber>>;

    /// User URI -> email address for every known user, subscribed or not
    async fn emails(&self) -> Result<HashMap<String, String>>;
}

/// Decides whether a data graph satisfies a filter shape.
///
/// Must be pure: the same inputs always give the same answer. A
/// non-matching graph is `Ok(false)`, never an error.
#[async_trait]
pub trait FilterMatcher: Send + Sync {
    async fn matches(&self, data: &Graph, filter: &Graph) -> Result<bool>;
}

/// Hands a rendered notification to the outbound mail queue
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn enqueue(&self, html: &str, address: &str) -> Result<()>;
}

/// The set of collaborator handles shared by the engine and the flusher
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn ContentResolver>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub registry: Arc<dyn SubscriberRegistry>,
    pub matcher: Arc<dyn FilterMatcher>,
    pub renderer: Arc<dyn DigestRenderer>,
    pub mailer: Arc<dyn Mailer>,
}

impl Collaborators {
    /// Wire the production collaborators: one SPARQL client for content,
    /// subscriptions and mail, the remote SHACL validator and the HTML renderer.
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        let sparql = Arc::new(SparqlClient::from_config(config)?);
        let matcher = Arc::new(ShaclValidatorClient::new(&config.matcher)?);

        Ok(Self {
            resolver: sparql.clone(),
            fetcher: sparql.clone(),
            registry: sparql.clone(),
            matcher,
            renderer: Arc::new(HtmlDigestRenderer::default()),
            mailer: sparql,
        })
    }
}
