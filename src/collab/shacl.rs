//! Remote SHACL validation
//!
//! The filter language is SHACL; validation is delegated to an external
//! service that accepts the data and shapes graphs as N-Triples and
//! answers whether the data conforms.

use super::FilterMatcher;
use crate::config::MatcherConfig;
use crate::error::{Error, Result};
use crate::rdf::Graph;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ValidationRequest<'a> {
    data: &'a str,
    shapes: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidationReport {
    conforms: bool,
}

/// Client for a SHACL validation endpoint
pub struct ShaclValidatorClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ShaclValidatorClient {
    pub fn new(config: &MatcherConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl FilterMatcher for ShaclValidatorClient {
    async fn matches(&self, data: &Graph, filter: &Graph) -> Result<bool> {
        let data = data.to_ntriples();
        let shapes = filter.to_ntriples();

        let response = self
            .http
            .post(&self.endpoint)
            .json(&ValidationRequest {
                data: &data,
                shapes: &shapes,
            })
            .send()
            .await
            .map_err(|e| Error::MatchEngine(format!("Validation request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::MatchEngine(format!(
                "Validator returned {}: {}",
                status, body
            )));
        }

        let report: ValidationReport = response
            .json()
            .await
            .map_err(|e| Error::MatchEngine(format!("Invalid validation report: {}", e)))?;
        Ok(report.conforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Statement, Term};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn validator(server: &MockServer) -> ShaclValidatorClient {
        ShaclValidatorClient::new(&MatcherConfig {
            endpoint: format!("{}/validate", server.uri()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn graph(s: &str) -> Graph {
        vec![Statement::new(
            Term::uri(s).unwrap(),
            Term::uri("http://purl.org/dc/terms/title").unwrap(),
            Term::literal("Hello"),
        )]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_conforms() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/validate"))
            .and(body_partial_json(serde_json::json!({
                "data": "<http://example.org/e1> <http://purl.org/dc/terms/title> \"Hello\" .\n"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "conforms": true
            })))
            .mount(&server)
            .await;

        let ok = validator(&server)
            .matches(&graph("http://example.org/e1"), &graph("http://example.org/shape"))
            .await
            .unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn test_does_not_conform() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "conforms": false,
                "results": []
            })))
            .mount(&server)
            .await;

        let ok = validator(&server)
            .matches(&graph("http://example.org/e1"), &graph("http://example.org/shape"))
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_engine_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = validator(&server)
            .matches(&graph("http://example.org/e1"), &graph("http://example.org/shape"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MatchEngine(_)));
    }
}
