//! Set-valued RDF graphs
//!
//! A [`Graph`] never holds the same statement twice. The derived-graph
//! operations (`with`, `without`, `union`, `difference`) borrow `self` and
//! return a fresh graph, so a fetched post-change graph can be shared by
//! every reconstruction without being altered.

use super::term::{Statement, Term};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An ordered set of statements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Graph {
    statements: BTreeSet<Statement>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn contains(&self, statement: &Statement) -> bool {
        self.statements.contains(statement)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter()
    }

    /// Add a statement while building a graph. Returns false if it was already present.
    pub fn insert(&mut self, statement: Statement) -> bool {
        self.statements.insert(statement)
    }

    /// A copy of this graph with the given statements added
    pub fn with<'a>(&self, statements: impl IntoIterator<Item = &'a Statement>) -> Graph {
        let mut out = self.clone();
        out.statements.extend(statements.into_iter().cloned());
        out
    }

    /// A copy of this graph with the given statements removed
    pub fn without<'a>(&self, statements: impl IntoIterator<Item = &'a Statement>) -> Graph {
        let mut out = self.clone();
        for statement in statements {
            out.statements.remove(statement);
        }
        out
    }

    pub fn union(&self, other: &Graph) -> Graph {
        self.with(other.iter())
    }

    pub fn difference(&self, other: &Graph) -> Graph {
        Graph {
            statements: self.statements.difference(&other.statements).cloned().collect(),
        }
    }

    /// Distinct subject URIs, in order
    pub fn subjects(&self) -> BTreeSet<&str> {
        self.statements
            .iter()
            .filter_map(|s| s.subject_uri())
            .collect()
    }

    /// Objects of every statement matching `subject` and `predicate`
    pub fn objects<'a>(
        &'a self,
        subject: &'a str,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.statements
            .iter()
            .filter(move |s| {
                s.subject.as_uri() == Some(subject) && s.predicate.as_uri() == Some(predicate)
            })
            .map(|s| &s.object)
    }

    /// One N-Triples line per statement
    pub fn to_ntriples(&self) -> String {
        let mut out = String::new();
        for statement in &self.statements {
            out.push_str(&statement.to_string());
            out.push('\n');
        }
        out
    }
}

impl FromIterator<Statement> for Graph {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Graph {
            statements: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a Statement> for Graph {
    fn from_iter<I: IntoIterator<Item = &'a Statement>>(iter: I) -> Self {
        iter.into_iter().cloned().collect()
    }
}

impl Extend<Statement> for Graph {
    fn extend<I: IntoIterator<Item = Statement>>(&mut self, iter: I) {
        self.statements.extend(iter)
    }
}

impl IntoIterator for Graph {
    type Item = Statement;
    type IntoIter = std::collections::btree_set::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Statement;
    type IntoIter = std::collections::btree_set::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}
