//! SPARQL triple store client
//!
//! Implements content resolution, content fetching, the subscriber
//! registry and the mail queue on top of a SPARQL 1.1 endpoint. Queries
//! that touch subscriptions or the mail graph are sent with the
//! `mu-auth-sudo` header.

use super::{ContentFetcher, ContentResolver, Mailer, SubscriberRegistry};
use crate::config::{
    MailConfig, NotifierConfig, QueriesConfig, SparqlConfig, SubscriptionsConfig,
};
use crate::error::{Error, Result};
use crate::rdf::{named_node, Graph, Statement, Term};
use crate::subscription::{Frequency, Subscriber};
use async_trait::async_trait;
use oxrdf::{Literal, NamedNode};
use sparesults::{
    QueryResultsFormat, QueryResultsParser, QuerySolution, SliceQueryResultsParserOutput,
};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
const SUDO_HEADER: &str = "mu-auth-sudo";

/// Query templates loaded from disk
#[derive(Debug, Clone)]
pub struct QueryTemplates {
    /// Binds `?content`; `SUBJECT_URL` is replaced by the subject
    pub related_content: String,
    /// Binds `?s ?p ?o`; `CONTENT_URL` is replaced by the entity
    pub construct_content: String,
}

impl QueryTemplates {
    pub fn load(config: &QueriesConfig) -> Result<Self> {
        let read = |path: &std::path::Path| {
            std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read query {}: {}", path.display(), e))
            })
        };
        Ok(Self {
            related_content: read(&config.related_content)?,
            construct_content: read(&config.construct_content)?,
        })
    }
}

fn invalid_results(e: impl std::fmt::Display) -> Error {
    Error::Store(format!("Invalid SPARQL results: {}", e))
}

/// Read a bound variable, requiring it to be present
fn bound<'a>(solution: &'a QuerySolution, var: &str) -> Result<&'a oxrdf::Term> {
    solution
        .get(var)
        .ok_or_else(|| Error::Store(format!("result binding is missing ?{}", var)))
}

/// A bound URI or literal. Blank nodes have no stable identity across queries.
fn term(solution: &QuerySolution, var: &str) -> Result<Term> {
    match bound(solution, var)? {
        oxrdf::Term::NamedNode(node) => Ok(Term::Uri(node.clone())),
        oxrdf::Term::Literal(literal) => Ok(Term::Literal(literal.clone())),
        other => Err(Error::Store(format!("unsupported binding for ?{}: {}", var, other))),
    }
}

/// Lexical value of a bound URI or literal
fn value(solution: &QuerySolution, var: &str) -> Result<String> {
    Ok(term(solution, var)?.value().to_string())
}

/// An IRI taken from the configuration
fn configured_iri(iri: &str) -> Result<NamedNode> {
    NamedNode::new(iri).map_err(|e| Error::Config(format!("invalid IRI <{}>: {}", iri, e)))
}

/// Client for the triple store
pub struct SparqlClient {
    http: reqwest::Client,
    sparql: SparqlConfig,
    queries: QueryTemplates,
    subscriptions: SubscriptionsConfig,
    mail: MailConfig,
}

impl SparqlClient {
    /// Build a client, loading the query templates named in the configuration
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        let queries = QueryTemplates::load(&config.queries)?;
        Self::new(
            config.sparql.clone(),
            queries,
            config.subscriptions.clone(),
            config.mail.clone(),
        )
    }

    pub fn new(
        sparql: SparqlConfig,
        queries: QueryTemplates,
        subscriptions: SubscriptionsConfig,
        mail: MailConfig,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(sparql.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            sparql,
            queries,
            subscriptions,
            mail,
        })
    }

    /// Run a SELECT query and return its solutions
    async fn select(&self, query: &str, sudo: bool) -> Result<Vec<QuerySolution>> {
        tracing::debug!(query, "Executing SPARQL query");
        let mut request = self
            .http
            .post(&self.sparql.endpoint)
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)]);
        if sudo {
            request = request.header(SUDO_HEADER, "true");
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Store(format!("SPARQL query failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "SPARQL endpoint returned {}: {}",
                status, body
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Store(format!("Failed to read SPARQL results: {}", e)))?;
        match QueryResultsParser::from_format(QueryResultsFormat::Json)
            .for_slice(&body)
            .map_err(invalid_results)?
        {
            SliceQueryResultsParserOutput::Solutions(solutions) => solutions
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(invalid_results),
            SliceQueryResultsParserOutput::Boolean(_) => {
                Err(invalid_results("expected solutions, got a boolean"))
            }
        }
    }

    /// Run an update query
    async fn update(&self, update: &str) -> Result<()> {
        tracing::debug!(update, "Executing SPARQL update");
        let response = self
            .http
            .post(self.sparql.update_endpoint())
            .header(SUDO_HEADER, "true")
            .form(&[("update", update)])
            .send()
            .await
            .map_err(|e| Error::Store(format!("SPARQL update failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "SPARQL update endpoint returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }

    /// The NodeShape closure of a filter
    async fn filter(&self, filter_url: &str) -> Result<Graph> {
        let query = format!(
            r#"PREFIX sh: <http://www.w3.org/ns/shacl#>
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?s ?p ?o
WHERE {{
  GRAPH {graph} {{
    BIND({shape} AS ?nodeShape)
    ?nodeShape a sh:NodeShape .
    ?nodeShape (sh:or|sh:and|sh:not|sh:xone|sh:property|rdf:first|rdf:rest)* ?s .
    ?s ?p ?o .
  }}
}}"#,
            graph = configured_iri(&self.subscriptions.graph())?,
            shape = named_node(filter_url)?
        );
        graph_from_solutions(self.select(&query, true).await?)
    }
}

fn graph_from_solutions(solutions: Vec<QuerySolution>) -> Result<Graph> {
    let mut graph = Graph::new();
    for solution in &solutions {
        graph.insert(Statement::new(
            term(solution, "s")?,
            term(solution, "p")?,
            term(solution, "o")?,
        ));
    }
    Ok(graph)
}

#[async_trait]
impl ContentResolver for SparqlClient {
    async fn find_related(&self, subject: &str) -> Result<BTreeSet<String>> {
        let query = self
            .queries
            .related_content
            .replace("SUBJECT_URL", named_node(subject)?.as_str());

        let mut related = BTreeSet::new();
        for solution in self.select(&query, false).await? {
            related.insert(value(&solution, "content")?);
        }
        Ok(related)
    }
}

#[async_trait]
impl ContentFetcher for SparqlClient {
    async fn fetch(&self, entity: &str) -> Result<Graph> {
        let query = self
            .queries
            .construct_content
            .replace("CONTENT_URL", named_node(entity)?.as_str());
        graph_from_solutions(self.select(&query, false).await?)
    }
}

#[async_trait]
impl SubscriberRegistry for SparqlClient {
    async fn subscribers(&self) -> Result<Vec<Subscriber>> {
        let query = format!(
            r#"PREFIX ext: <http://mu.semte.ch/vocabularies/ext/>

SELECT ?filter_url ?user_url ?frequency
WHERE {{
  GRAPH {graph} {{
    ?user_url ext:hasSubscription ?filter_url .
    ?filter_url ext:subscriptionFrequency ?frequency .
  }}
}}"#,
            graph = configured_iri(&self.subscriptions.graph())?
        );

        let solutions = self.select(&query, true).await?;
        let emails = self.emails().await?;

        let mut subscribers = Vec::with_capacity(solutions.len());
        for solution in &solutions {
            let filter_url = value(solution, "filter_url")?;
            let user_url = value(solution, "user_url")?;
            let raw_frequency = value(solution, "frequency")?;

            let Some(frequency) = Frequency::from_stored(&raw_frequency) else {
                tracing::warn!(
                    subscriber = %user_url,
                    frequency = %raw_frequency,
                    "Skipping subscription with unknown frequency"
                );
                continue;
            };

            let filter = self.filter(&filter_url).await?;
            subscribers.push(Subscriber {
                email: emails.get(&user_url).cloned(),
                uri: user_url,
                filter,
                frequency,
            });
        }

        tracing::debug!(count = subscribers.len(), "Loaded subscribers");
        Ok(subscribers)
    }

    async fn emails(&self) -> Result<HashMap<String, String>> {
        let query = format!(
            r#"PREFIX schema: <http://schema.org/>

SELECT ?user_url ?email
WHERE {{
  GRAPH {graph} {{
    ?user_url schema:email ?email .
  }}
}}"#,
            graph = configured_iri(&self.subscriptions.graph())?
        );

        let mut emails = HashMap::new();
        for solution in &self.select(&query, true).await? {
            emails.insert(value(solution, "user_url")?, value(solution, "email")?);
        }
        Ok(emails)
    }
}

#[async_trait]
impl Mailer for SparqlClient {
    async fn enqueue(&self, html: &str, address: &str) -> Result<()> {
        let base = self.subscriptions.base();
        let graph = self
            .mail
            .graph
            .clone()
            .unwrap_or_else(|| format!("{}/graphs/system/email", base));
        let folder = self
            .mail
            .folder
            .clone()
            .unwrap_or_else(|| format!("{}/id/mail-folders/2", base));
        let email_id = format!("{}/id/emails/{}", base, uuid::Uuid::new_v4());

        let update = format!(
            r#"PREFIX nmo: <http://www.semanticdesktop.org/ontologies/2007/03/22/nmo#>

INSERT DATA {{
  GRAPH {graph} {{
    {email_id} a nmo:Email ;
      nmo:messageFrom {from} ;
      nmo:emailTo {to} ;
      nmo:messageSubject {subject} ;
      nmo:htmlMessageContent {html} ;
      nmo:isPartOf {folder} .
  }}
}}"#,
            graph = configured_iri(&graph)?,
            email_id = configured_iri(&email_id)?,
            from = Literal::new_simple_literal(self.mail.from.as_str()),
            to = Literal::new_simple_literal(address),
            subject = Literal::new_simple_literal(self.mail.subject.as_str()),
            html = Literal::new_simple_literal(html),
            folder = configured_iri(&folder)?,
        );

        self.update(&update).await.map_err(|e| {
            Error::Delivery(format!("Failed to queue email for {}: {}", address, e))
        })?;
        tracing::info!(to = %address, email = %email_id, "Queued notification email");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

    fn client(server: &MockServer) -> SparqlClient {
        SparqlClient::new(
            SparqlConfig {
                endpoint: format!("{}/sparql", server.uri()),
                update_endpoint: None,
                timeout_secs: 5,
            },
            QueryTemplates {
                related_content: "SELECT ?content WHERE { <SUBJECT_URL> ?p ?content }"
                    .to_string(),
                construct_content: "SELECT ?s ?p ?o WHERE { BIND(<CONTENT_URL> AS ?s) ?s ?p ?o }"
                    .to_string(),
            },
            SubscriptionsConfig {
                base_url: "http://example.org".to_string(),
                graph: None,
            },
            MailConfig::default(),
        )
        .unwrap()
    }

    fn results(vars: &[&str], bindings: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "head": { "vars": vars },
            "results": { "bindings": bindings }
        }))
    }

    #[tokio::test]
    async fn test_find_related() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sparql"))
            .and(body_string_contains("vote%2F1"))
            .respond_with(results(&["content"], serde_json::json!([
                { "content": { "type": "uri", "value": "http://example.org/item/1" } },
                { "content": { "type": "uri", "value": "http://example.org/item/2" } },
                { "content": { "type": "uri", "value": "http://example.org/item/1" } }
            ])))
            .mount(&server)
            .await;

        let related = client(&server)
            .find_related("http://example.org/vote/1")
            .await
            .unwrap();
        assert_eq!(related.len(), 2);
        assert!(related.contains("http://example.org/item/2"));
    }

    #[tokio::test]
    async fn test_invalid_subject_iri_is_rejected_before_querying() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(results(&["content"], serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.find_related("http://ex/a b").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = client.fetch("http://ex/a>").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_malformed_results_are_store_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"head\": "))
            .mount(&server)
            .await;

        let err = client(&server).fetch("http://example.org/item/1").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn test_fetch_builds_graph() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sparql"))
            .respond_with(results(&["s", "p", "o"], serde_json::json!([
                {
                    "s": { "type": "uri", "value": "http://example.org/item/1" },
                    "p": { "type": "uri", "value": "http://purl.org/dc/terms/title" },
                    "o": { "type": "literal", "value": "Budget", "xml:lang": "nl" }
                },
                {
                    "s": { "type": "uri", "value": "http://example.org/item/1" },
                    "p": { "type": "uri", "value": "http://example.org/position" },
                    "o": { "type": "literal", "value": "3",
                           "datatype": "http://www.w3.org/2001/XMLSchema#integer" }
                }
            ])))
            .mount(&server)
            .await;

        let graph = client(&server).fetch("http://example.org/item/1").await.unwrap();
        assert_eq!(graph.len(), 2);
        let titles: Vec<&Term> = graph
            .objects("http://example.org/item/1", "http://purl.org/dc/terms/title")
            .collect();
        assert_eq!(titles, vec![&Term::lang_literal("Budget", "nl").unwrap()]);
    }

    #[tokio::test]
    async fn test_store_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server).fetch("http://example.org/item/1").await.unwrap_err();
        assert!(matches!(err, Error::Store(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_bnode_binding_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(results(&["s", "p", "o"], serde_json::json!([
                {
                    "s": { "type": "bnode", "value": "b0" },
                    "p": { "type": "uri", "value": "http://example.org/p" },
                    "o": { "type": "literal", "value": "x" }
                }
            ])))
            .mount(&server)
            .await;

        let err = client(&server).fetch("http://example.org/item/1").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn test_subscribers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("hasSubscription"))
            .respond_with(results(&["filter_url", "user_url", "frequency"], serde_json::json!([
                {
                    "filter_url": { "type": "uri", "value": "http://example.org/filters/1" },
                    "user_url": { "type": "uri", "value": "http://example.org/users/1" },
                    "frequency": { "type": "literal", "value": "weekly" }
                },
                {
                    "filter_url": { "type": "uri", "value": "http://example.org/filters/2" },
                    "user_url": { "type": "uri", "value": "http://example.org/users/2" },
                    "frequency": { "type": "literal", "value": "fortnightly" }
                }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("schema%3Aemail"))
            .respond_with(results(&["user_url", "email"], serde_json::json!([
                {
                    "user_url": { "type": "uri", "value": "http://example.org/users/1" },
                    "email": { "type": "literal", "value": "one@example.org" }
                }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("NodeShape"))
            .and(header(SUDO_HEADER, "true"))
            .respond_with(results(&["s", "p", "o"], serde_json::json!([
                {
                    "s": { "type": "uri", "value": "http://example.org/filters/1" },
                    "p": { "type": "uri", "value": RDF_TYPE },
                    "o": { "type": "uri", "value": "http://www.w3.org/ns/shacl#NodeShape" }
                }
            ])))
            .mount(&server)
            .await;

        let subscribers = client(&server).subscribers().await.unwrap();
        assert_eq!(subscribers.len(), 1);
        let sub = &subscribers[0];
        assert_eq!(sub.uri, "http://example.org/users/1");
        assert_eq!(sub.email.as_deref(), Some("one@example.org"));
        assert_eq!(sub.frequency, Frequency::Weekly);
        assert_eq!(sub.filter.len(), 1);
    }

    #[tokio::test]
    async fn test_emails_include_users_without_subscriptions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("schema%3Aemail"))
            .and(header(SUDO_HEADER, "true"))
            .respond_with(results(&["user_url", "email"], serde_json::json!([
                {
                    "user_url": { "type": "uri", "value": "http://example.org/users/1" },
                    "email": { "type": "literal", "value": "one@example.org" }
                },
                {
                    "user_url": { "type": "uri", "value": "http://example.org/users/9" },
                    "email": { "type": "literal", "value": "nine@example.org" }
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let emails = client(&server).emails().await.unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(
            emails.get("http://example.org/users/9").map(String::as_str),
            Some("nine@example.org")
        );
    }

    #[tokio::test]
    async fn test_enqueue_mail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sparql"))
            .and(header(SUDO_HEADER, "true"))
            .and(body_string_contains("update="))
            .and(body_string_contains("nmo%3AEmail"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .enqueue("<p>\"quoted\"</p>", "one@example.org")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_enqueue_failure_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .enqueue("<p>hi</p>", "one@example.org")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Delivery(_)));
    }
}
