//! RDF terms and statements
//!
//! Terms wrap `oxrdf` nodes and literals, which validate IRIs and language
//! tags on construction and print themselves as N-Triples. On the wire a
//! term keeps the `{type, value}` JSON shape of the delta format, so change
//! batches deserialize straight into [`Statement`]s.

use crate::error::{Error, Result};
use oxrdf::vocab::xsd;
use oxrdf::{Literal, NamedNode};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Parse an absolute IRI, rejecting anything that is not one
pub fn named_node(iri: &str) -> Result<NamedNode> {
    NamedNode::new(iri).map_err(|e| Error::InvalidInput(format!("invalid IRI <{}>: {}", iri, e)))
}

/// A single RDF value: a URI reference or a literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireTerm", into = "WireTerm")]
pub enum Term {
    Uri(NamedNode),
    Literal(Literal),
}

impl Term {
    pub fn uri(iri: impl Into<String>) -> Result<Self> {
        let iri = iri.into();
        Ok(Self::Uri(named_node(&iri)?))
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(Literal::new_simple_literal(value))
    }

    pub fn typed_literal(value: impl Into<String>, datatype: &str) -> Result<Self> {
        Ok(Self::Literal(Literal::new_typed_literal(
            value,
            named_node(datatype)?,
        )))
    }

    pub fn lang_literal(value: impl Into<String>, language: impl Into<String>) -> Result<Self> {
        let language = language.into();
        Literal::new_language_tagged_literal(value, language.as_str())
            .map(Self::Literal)
            .map_err(|e| Error::InvalidInput(format!("invalid language tag {}: {}", language, e)))
    }

    /// Lexical value, without datatype or language
    pub fn value(&self) -> &str {
        match self {
            Self::Uri(node) => node.as_str(),
            Self::Literal(literal) => literal.value(),
        }
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Self::Uri(node) => Some(node.as_str()),
            Self::Literal(_) => None,
        }
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, Self::Uri(_))
    }

    fn sort_key(&self) -> (u8, &str, &str, &str) {
        match self {
            Self::Uri(node) => (0, node.as_str(), "", ""),
            Self::Literal(literal) => (
                1,
                literal.value(),
                literal.datatype().as_str(),
                literal.language().unwrap_or(""),
            ),
        }
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<NamedNode> for Term {
    fn from(node: NamedNode) -> Self {
        Self::Uri(node)
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

/// N-Triples serialization
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(node) => write!(f, "{}", node),
            Self::Literal(literal) => write!(f, "{}", literal),
        }
    }
}

/// Delta wire shape of a term
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireTerm {
    Uri {
        value: String,
    },
    Literal {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
        #[serde(
            rename = "xml:lang",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        language: Option<String>,
    },
}

impl TryFrom<WireTerm> for Term {
    type Error = Error;

    fn try_from(wire: WireTerm) -> Result<Self> {
        match wire {
            WireTerm::Uri { value } => Term::uri(value),
            WireTerm::Literal {
                value,
                language: Some(language),
                ..
            } => Term::lang_literal(value, language),
            WireTerm::Literal {
                value,
                datatype: Some(datatype),
                ..
            } => Term::typed_literal(value, &datatype),
            WireTerm::Literal { value, .. } => Ok(Term::literal(value)),
        }
    }
}

impl From<Term> for WireTerm {
    fn from(term: Term) -> Self {
        match term {
            Term::Uri(node) => WireTerm::Uri {
                value: node.into_string(),
            },
            Term::Literal(literal) => {
                let language = literal.language().map(str::to_string);
                let datatype = if language.is_none() && literal.datatype() != xsd::STRING {
                    Some(literal.datatype().as_str().to_string())
                } else {
                    None
                };
                WireTerm::Literal {
                    value: literal.value().to_string(),
                    datatype,
                    language,
                }
            }
        }
    }
}

/// A (subject, predicate, object) triple
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Statement {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Subject URI. Statements accepted by the ingestor always have one.
    pub fn subject_uri(&self) -> Option<&str> {
        self.subject.as_uri()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

    #[test]
    fn test_term_wire_format() {
        let json = r#"{"type": "uri", "value": "http://example.org/e1"}"#;
        let term: Term = serde_json::from_str(json).unwrap();
        assert_eq!(term, Term::uri("http://example.org/e1").unwrap());

        let json = r#"{"type": "literal", "value": "Hallo", "xml:lang": "nl"}"#;
        let term: Term = serde_json::from_str(json).unwrap();
        assert_eq!(term, Term::lang_literal("Hallo", "nl").unwrap());
    }

    #[test]
    fn test_term_unknown_type_rejected() {
        let json = r#"{"type": "bnode", "value": "b0"}"#;
        assert!(serde_json::from_str::<Term>(json).is_err());
    }

    #[test]
    fn test_term_missing_value_rejected() {
        let json = r#"{"type": "uri"}"#;
        assert!(serde_json::from_str::<Term>(json).is_err());
    }

    #[test]
    fn test_invalid_iri_rejected() {
        for iri in ["http://ex/a b", "http://ex/a>", "not an iri", ""] {
            let err = Term::uri(iri).unwrap_err();
            assert!(err.is_client_error(), "iri: {:?}", iri);
        }

        let json = r#"{"type": "uri", "value": "http://ex/a b"}"#;
        assert!(serde_json::from_str::<Term>(json).is_err());
    }

    #[test]
    fn test_invalid_language_tag_rejected() {
        assert!(Term::lang_literal("x", "not a tag").is_err());
    }

    #[test]
    fn test_plain_literal_serializes_without_optional_fields() {
        let json = serde_json::to_string(&Term::literal("x")).unwrap();
        assert_eq!(json, r#"{"type":"literal","value":"x"}"#);

        let typed = Term::typed_literal("2", XSD_INTEGER).unwrap();
        let json = serde_json::to_value(&typed).unwrap();
        assert_eq!(json["datatype"], XSD_INTEGER);
        assert_eq!(serde_json::from_value::<Term>(json).unwrap(), typed);
    }

    #[test]
    fn test_statement_ntriples() {
        let s = Statement::new(
            Term::uri("http://example.org/e1").unwrap(),
            Term::uri("http://purl.org/dc/terms/title").unwrap(),
            Term::literal("Say \"hi\"\n"),
        );
        assert_eq!(
            s.to_string(),
            r#"<http://example.org/e1> <http://purl.org/dc/terms/title> "Say \"hi\"\n" ."#
        );

        let typed = Term::typed_literal("2", XSD_INTEGER).unwrap();
        assert_eq!(
            typed.to_string(),
            "\"2\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    #[test]
    fn test_terms_order_uris_before_literals() {
        let uri = Term::uri("http://example.org/z").unwrap();
        let lit = Term::literal("a");
        assert!(uri < lit);
        assert!(Term::literal("a") < Term::literal("b"));
    }

    #[test]
    fn test_value_accessors() {
        let uri = Term::uri("http://example.org/x").unwrap();
        assert!(uri.is_uri());
        assert_eq!(uri.as_uri(), Some("http://example.org/x"));
        let lit = Term::typed_literal("5", "http://www.w3.org/2001/XMLSchema#int").unwrap();
        assert_eq!(lit.value(), "5");
        assert!(lit.as_uri().is_none());
    }
}
