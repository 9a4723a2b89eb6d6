//! Derive the pre-change and unchanged graphs of a content entity

use super::types::Delta;
use crate::rdf::Graph;

/// Graph states derived from a post-change graph and its delta
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStates {
    /// The entity as it was before the change
    pub pre: Graph,
    /// Statements touched by neither half of the delta
    pub unchanged: Graph,
}

/// Undo the inserts, then restore the deletes.
///
/// The phase order is fixed: a statement listed both as inserted and as
/// deleted ends up present in `pre`.
pub fn reconstruct(post: &Graph, delta: &Delta) -> GraphStates {
    let intermediate = post.without(&delta.inserts);
    let pre = intermediate.with(&delta.deletes);
    let unchanged = intermediate.without(&delta.deletes);
    GraphStates { pre, unchanged }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Statement, Term};

    fn stmt(s: &str, p: &str, o: &str) -> Statement {
        Statement::new(Term::uri(s).unwrap(), Term::uri(p).unwrap(), Term::literal(o))
    }

    fn graph(stmts: &[Statement]) -> Graph {
        stmts.iter().collect()
    }

    #[test]
    fn test_title_changed() {
        let old = stmt("e:1", "p:title", "Old");
        let new = stmt("e:1", "p:title", "New");
        let kept = stmt("e:1", "p:date", "2024-01-01");
        let post = graph(&[new.clone(), kept.clone()]);
        let delta = Delta {
            inserts: vec![new.clone()],
            deletes: vec![old.clone()],
        };

        let states = reconstruct(&post, &delta);
        assert_eq!(states.pre, graph(&[old, kept.clone()]));
        assert_eq!(states.unchanged, graph(&[kept]));
        // The post graph is never altered
        assert!(post.contains(&new));
        assert_eq!(post.len(), 2);
    }

    #[test]
    fn test_round_trip() {
        let post = graph(&[
            stmt("e:1", "p:a", "1"),
            stmt("e:1", "p:b", "2"),
            stmt("e:1", "p:c", "3"),
        ]);
        let delta = Delta {
            inserts: vec![stmt("e:1", "p:b", "2"), stmt("e:1", "p:z", "absent")],
            deletes: vec![stmt("e:1", "p:d", "4"), stmt("e:1", "p:d", "4")],
        };

        let pre = reconstruct(&post, &delta).pre;
        let replayed = pre.with(&delta.inserts).without(&delta.deletes);
        // p:z was never in post, so the replay gains it; everything else matches.
        assert_eq!(replayed.without(&[stmt("e:1", "p:z", "absent")]), post);
    }

    #[test]
    fn test_round_trip_exact_when_inserts_present_in_post() {
        let post = graph(&[stmt("e:1", "p:a", "1"), stmt("e:1", "p:b", "2")]);
        let delta = Delta {
            inserts: vec![stmt("e:1", "p:b", "2")],
            deletes: vec![stmt("e:1", "p:c", "3")],
        };

        let pre = reconstruct(&post, &delta).pre;
        assert_eq!(pre.with(&delta.inserts).without(&delta.deletes), post);
    }

    #[test]
    fn test_idempotent() {
        let post = graph(&[stmt("e:1", "p:a", "1"), stmt("e:1", "p:b", "2")]);
        let delta = Delta {
            inserts: vec![stmt("e:1", "p:a", "1")],
            deletes: vec![stmt("e:1", "p:c", "3")],
        };
        assert_eq!(reconstruct(&post, &delta), reconstruct(&post, &delta));
    }

    #[test]
    fn test_statement_in_both_halves_ends_up_present_in_pre() {
        let both = stmt("e:1", "p:a", "1");
        let post = graph(&[both.clone()]);
        let delta = Delta {
            inserts: vec![both.clone()],
            deletes: vec![both.clone()],
        };

        let states = reconstruct(&post, &delta);
        assert!(states.pre.contains(&both));
        assert!(states.unchanged.is_empty());
    }

    #[test]
    fn test_empty_delta() {
        let post = graph(&[stmt("e:1", "p:a", "1")]);
        let states = reconstruct(&post, &Delta::default());
        assert_eq!(states.pre, post);
        assert_eq!(states.unchanged, post);
    }
}
