use std::path::Path;

use log::{debug, info, warn};

use crate::matcher::{MatchCandidate, MatchGroups, MatcherError};
use crate::model::db::RosterEntry;
use crate::store::{Roster, StoreError};

/// Outcome of resolving a matcher result to a single identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A candidate was selected. `info` is `None` if the name is not on the
    /// roster; the name is still reported.
    Resolved {
        name: String,
        distance: f64,
        info: Option<RosterEntry>,
    },
    /// The matcher returned no candidates.
    NoMatch,
    /// The matcher itself failed.
    MatcherFailure(String),
}

/// Turns ranked matcher output into one identity: the first candidate of the
/// first non-empty group wins, and everything after it is ignored.
pub struct IdentityResolver<'a> {
    roster: &'a dyn Roster,
    near_tie_margin: f64,
}

impl<'a> IdentityResolver<'a> {
    /// `near_tie_margin` only affects logging: a runner-up within this
    /// distance of the winner is reported as a warning.
    pub fn new(roster: &'a dyn Roster, near_tie_margin: f64) -> Self {
        Self {
            roster,
            near_tie_margin,
        }
    }

    pub async fn resolve(
        &self,
        matched: Result<MatchGroups, MatcherError>,
    ) -> Result<Resolution, StoreError> {
        let groups = match matched {
            Ok(groups) => groups,
            Err(e) => {
                warn!("Matcher failed: {e}");
                return Ok(Resolution::MatcherFailure(e.to_string()));
            }
        };

        let Some((candidate, runner_up)) = first_candidate(&groups) else {
            debug!("Matcher returned no candidates");
            return Ok(Resolution::NoMatch);
        };

        let Some(name) = identity_name(&candidate.identity) else {
            warn!(
                "Matcher returned unusable identity reference {:?}",
                candidate.identity
            );
            return Ok(Resolution::MatcherFailure(format!(
                "Unusable identity reference {:?}",
                candidate.identity
            )));
        };

        if let Some(runner_up) = runner_up {
            if runner_up.distance - candidate.distance <= self.near_tie_margin {
                warn!(
                    "Near tie: resolved {name} at {:.4}, runner-up {} at {:.4}",
                    candidate.distance, runner_up.identity, runner_up.distance
                );
            }
        }

        let info = self.roster.lookup(name).await?;
        if info.is_none() {
            info!("Resolved {name}, but no roster entry exists");
        }
        Ok(Resolution::Resolved {
            name: name.to_string(),
            distance: candidate.distance,
            info,
        })
    }
}

/// The first candidate of the first non-empty group, plus the next candidate
/// in that same group if there is one.
pub fn first_candidate(
    groups: &[Vec<MatchCandidate>],
) -> Option<(&MatchCandidate, Option<&MatchCandidate>)> {
    groups
        .iter()
        .find(|group| !group.is_empty())
        .map(|group| (&group[0], group.get(1)))
}

/// Roster name for a gallery reference: the file stem of the image path.
pub fn identity_name(reference: &str) -> Option<&str> {
    Path::new(reference)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
}
