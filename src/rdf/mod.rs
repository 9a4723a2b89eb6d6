//! Statement model: terms, statements and set-valued graphs

pub mod graph;
pub mod term;

pub use graph::Graph;
pub use term::{named_node, Statement, Term};

/// Well-known vocabulary URIs
pub mod vocab {
    pub const DCTERMS_TITLE: &str = "http://purl.org/dc/terms/title";
    pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    pub const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
}
