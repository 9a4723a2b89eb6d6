//! Digest rendering
//!
//! A digest groups every statement by subject and marks each one as
//! added, removed or unchanged.

use crate::error::Result;
use crate::rdf::{vocab, Graph, Statement, Term};
use crate::subscription::Frequency;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Everything a renderer needs to produce one notification
#[derive(Debug, Clone)]
pub struct DigestContent {
    pub subscriber: String,
    pub frequency: Frequency,
    /// Content entities covered by this digest
    pub entities: Vec<String>,
    pub unchanged: Graph,
    pub inserts: Graph,
    pub deletes: Graph,
    pub generated_at: DateTime<Utc>,
}

impl DigestContent {
    /// Single-entity digest for an immediate notification
    pub fn single(
        subscriber: impl Into<String>,
        entity: impl Into<String>,
        unchanged: Graph,
        inserts: Graph,
        deletes: Graph,
    ) -> Self {
        Self {
            subscriber: subscriber.into(),
            frequency: Frequency::Immediate,
            entities: vec![entity.into()],
            unchanged,
            inserts,
            deletes,
            generated_at: Utc::now(),
        }
    }

    /// First human-readable label found for a subject in any of the graphs
    pub fn label(&self, subject: &str) -> Option<String> {
        const LABELS: [&str; 3] = [
            vocab::DCTERMS_TITLE,
            vocab::SKOS_PREF_LABEL,
            vocab::RDFS_LABEL,
        ];
        LABELS.into_iter().find_map(|predicate| {
            [&self.inserts, &self.unchanged, &self.deletes]
                .into_iter()
                .find_map(|g| g.objects(subject, predicate).next())
                .map(|t| t.value().to_string())
        })
    }
}

/// Turns digest content into an HTML mail body
pub trait DigestRenderer: Send + Sync {
    fn render(&self, content: &DigestContent) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Change {
    Inserted,
    Deleted,
    Unchanged,
}

impl Change {
    fn class(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Deleted => "deleted",
            Self::Unchanged => "unchanged",
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Self::Inserted => "+",
            Self::Deleted => "-",
            Self::Unchanged => "",
        }
    }
}

/// Default renderer producing a self-contained HTML document
#[derive(Debug, Clone)]
pub struct HtmlDigestRenderer {
    /// Include statements that did not change
    pub show_unchanged: bool,
}

impl Default for HtmlDigestRenderer {
    fn default() -> Self {
        Self {
            show_unchanged: true,
        }
    }
}

impl HtmlDigestRenderer {
    fn heading(content: &DigestContent) -> String {
        match content.frequency {
            Frequency::Immediate => "Content you follow has changed".to_string(),
            frequency => format!("Your {} digest", frequency),
        }
    }

    fn rows(&self, content: &DigestContent) -> BTreeMap<String, Vec<(Change, Statement)>> {
        let mut sections: BTreeMap<String, Vec<(Change, Statement)>> = BTreeMap::new();
        let mut add = |graph: &Graph, change: Change| {
            for statement in graph.iter() {
                sections
                    .entry(statement.subject.value().to_string())
                    .or_default()
                    .push((change, statement.clone()));
            }
        };

        add(&content.inserts, Change::Inserted);
        add(&content.deletes, Change::Deleted);
        if self.show_unchanged {
            add(&content.unchanged, Change::Unchanged);
        }

        for rows in sections.values_mut() {
            rows.sort_by(|a, b| a.1.predicate.cmp(&b.1.predicate).then(a.0.cmp(&b.0)));
        }
        sections
    }
}

impl DigestRenderer for HtmlDigestRenderer {
    fn render(&self, content: &DigestContent) -> Result<String> {
        let mut html = String::new();
        let heading = escape_html(&Self::heading(content));

        // Writing into a String cannot fail
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html>\n\
             <head><meta charset=\"utf-8\"><title>{heading}</title></head>\n\
             <body>\n<h1>{heading}</h1>\n<p class=\"generated\">{}</p>\n",
            content.generated_at.format("%Y-%m-%d %H:%M UTC")
        );

        for (subject, rows) in self.rows(content) {
            let title = content.label(&subject).unwrap_or_else(|| subject.clone());
            let _ = write!(
                html,
                "<section>\n<h2><a href=\"{}\">{}</a></h2>\n<table>\n",
                escape_html(&subject),
                escape_html(&title)
            );
            for (change, statement) in rows {
                let _ = writeln!(
                    html,
                    "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td></tr>",
                    change.class(),
                    change.marker(),
                    escape_html(short_name(statement.predicate.value())),
                    render_term(&statement.object)
                );
            }
            html.push_str("</table>\n</section>\n");
        }

        html.push_str("</body>\n</html>\n");
        Ok(html)
    }
}

fn render_term(term: &Term) -> String {
    match term {
        Term::Uri(node) => {
            let iri = escape_html(node.as_str());
            format!("<a href=\"{}\">{}</a>", iri, iri)
        }
        Term::Literal(literal) => escape_html(literal.value()),
    }
}

/// Local name of a URI (after the last '#' or '/')
fn short_name(uri: &str) -> &str {
    uri.rsplit(|c: char| c == '#' || c == '/')
        .find(|part| !part.is_empty())
        .unwrap_or(uri)
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
