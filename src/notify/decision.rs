//! Per-subscriber relevance decision

use crate::collab::FilterMatcher;
use crate::error::Result;
use crate::rdf::Graph;
use serde::Serialize;

/// How an entity moved relative to a subscriber's filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Matches now, did not before
    Entered,
    /// Matched before, no longer does
    Exited,
    /// Matches both before and after
    Updated,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entered => write!(f, "entered"),
            Self::Exited => write!(f, "exited"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Notify(Transition),
    Skip,
}

/// Decide whether a change to an entity concerns a subscriber.
///
/// The subscriber is notified when either the current (`post`) or the
/// previous (`pre`) state of the entity satisfies the filter. An empty
/// filter never matches and the matcher is not consulted.
pub async fn decide(
    post: &Graph,
    pre: &Graph,
    filter: &Graph,
    matcher: &dyn FilterMatcher,
) -> Result<Decision> {
    if filter.is_empty() {
        return Ok(Decision::Skip);
    }

    let post_matches = matcher.matches(post, filter).await?;
    let pre_matches = matcher.matches(pre, filter).await?;

    Ok(match (post_matches, pre_matches) {
        (true, true) => Decision::Notify(Transition::Updated),
        (true, false) => Decision::Notify(Transition::Entered),
        (false, true) => Decision::Notify(Transition::Exited),
        (false, false) => Decision::Skip,
    })
}
