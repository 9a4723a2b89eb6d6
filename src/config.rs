//! Change Notifier configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main Change Notifier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Triple store connection
    pub sparql: SparqlConfig,

    /// Query templates for content resolution and fetching
    pub queries: QueriesConfig,

    /// Subscription graph location
    pub subscriptions: SubscriptionsConfig,

    /// Outgoing mail settings
    pub mail: MailConfig,

    /// SHACL validation service
    pub matcher: MatcherConfig,

    /// Durable outbox storage
    pub outbox: OutboxConfig,
}

impl NotifierConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sparql.endpoint.trim().is_empty() {
            return Err(Error::Config("sparql.endpoint must not be empty".to_string()));
        }
        if self.subscriptions.base_url.trim().is_empty() {
            return Err(Error::Config(
                "subscriptions.base_url must not be empty".to_string(),
            ));
        }
        if self.matcher.endpoint.trim().is_empty() {
            return Err(Error::Config("matcher.endpoint must not be empty".to_string()));
        }
        if self.mail.from.trim().is_empty() {
            return Err(Error::Config("mail.from must not be empty".to_string()));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Triple store connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SparqlConfig {
    /// SPARQL query endpoint
    pub endpoint: String,

    /// SPARQL update endpoint (defaults to the query endpoint)
    pub update_endpoint: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl SparqlConfig {
    pub fn update_endpoint(&self) -> &str {
        self.update_endpoint.as_deref().unwrap_or(&self.endpoint)
    }
}

impl Default for SparqlConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://database:8890/sparql".to_string(),
            update_endpoint: None,
            timeout_secs: 60,
        }
    }
}

/// Query template files.
///
/// `related_content` must bind `?content` and contain the placeholder
/// `SUBJECT_URL`; `construct_content` must bind `?s ?p ?o` and contain
/// `CONTENT_URL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueriesConfig {
    pub related_content: PathBuf,
    pub construct_content: PathBuf,
}

impl Default for QueriesConfig {
    fn default() -> Self {
        Self {
            related_content: PathBuf::from("/config/get_relevant_content.sparql"),
            construct_content: PathBuf::from("/config/construct_content.sparql"),
        }
    }
}

/// Subscription graph location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionsConfig {
    /// Base URL used to build graph and resource URIs
    pub base_url: String,

    /// Graph holding subscriptions (defaults to `{base_url}/graphs/subscriptions`)
    pub graph: Option<String>,
}

impl SubscriptionsConfig {
    pub fn graph(&self) -> String {
        self.graph
            .clone()
            .unwrap_or_else(|| format!("{}/graphs/subscriptions", self.base()))
    }

    /// Base URL without a trailing slash
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            graph: None,
        }
    }
}

/// Outgoing mail settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Sender address
    pub from: String,

    /// Subject line of every notification
    pub subject: String,

    /// Graph the mail queue reads from (defaults to `{base_url}/graphs/system/email`)
    pub graph: Option<String>,

    /// Mail folder emails are filed in (defaults to `{base_url}/id/mail-folders/2`)
    pub folder: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "noreply@localhost".to_string(),
            subject: "Updates to your subscriptions".to_string(),
            graph: None,
            folder: None,
        }
    }
}

/// SHACL validation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Validation endpoint accepting `{ data, shapes }` in N-Triples
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://shacl-validator/validate".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Durable outbox storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Directory holding one sub-directory per frequency
    pub dir: PathBuf,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            dir: crate::outbox::OutboxStore::default_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = NotifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.sparql.update_endpoint(), "http://database:8890/sparql");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: NotifierConfig = toml::from_str(
            r#"
            [sparql]
            endpoint = "http://triplestore:8890/sparql"
            update_endpoint = "http://triplestore:8890/update"

            [subscriptions]
            base_url = "https://example.org/"
            "#,
        )
        .unwrap();

        assert_eq!(config.sparql.update_endpoint(), "http://triplestore:8890/update");
        assert_eq!(config.sparql.timeout_secs, 60);
        assert_eq!(
            config.subscriptions.graph(),
            "https://example.org/graphs/subscriptions"
        );
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let mut config = NotifierConfig::default();
        config.sparql.endpoint = " ".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notifier.toml");
        std::fs::write(&path, "[server]\nport = 9000\n[outbox]\ndir = \"/tmp/outbox\"\n").unwrap();

        let config = NotifierConfig::load(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.outbox.dir, PathBuf::from("/tmp/outbox"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = NotifierConfig::load(Path::new("/nonexistent/notifier.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_serializes_to_toml() {
        let toml = toml::to_string_pretty(&NotifierConfig::default()).unwrap();
        assert!(toml.contains("[sparql]"));
        assert!(toml.contains("[outbox]"));
    }
}
