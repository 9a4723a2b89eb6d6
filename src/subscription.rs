//! Subscribers and delivery frequencies

use crate::rdf::Graph;
use serde::{Deserialize, Serialize};

/// How often a subscriber receives notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Immediate,
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Frequencies whose notifications go through the outbox
    pub const BATCHED: [Frequency; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn is_batched(&self) -> bool {
        !matches!(self, Self::Immediate)
    }

    /// Parse a frequency as stored in the subscription graph: either a bare
    /// name or a URI whose last path segment or fragment is the name.
    pub fn from_stored(value: &str) -> Option<Self> {
        let name = value
            .rsplit(|c: char| c == '/' || c == '#')
            .next()
            .unwrap_or(value);
        name.parse().ok()
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!("unknown frequency: {}", other)),
        }
    }
}

/// A user subscription: who to notify, how often, and for which content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub uri: String,
    pub email: Option<String>,
    /// Shape graph; empty means the subscriber has no active filter
    pub filter: Graph,
    pub frequency: Frequency,
}

impl Subscriber {
    pub fn new(uri: impl Into<String>, frequency: Frequency, filter: Graph) -> Self {
        Self {
            uri: uri.into(),
            email: None,
            filter,
            frequency,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn has_filter(&self) -> bool {
        !self.filter.is_empty()
    }
}
