use serde::{Deserialize, Serialize};

use crate::model::db::RosterEntry;

/// Demographic information shown to the voter on recognition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterInfo {
    pub name: String,
    pub id: u32,
    pub age: u32,
    pub gender: String,
}

impl From<RosterEntry> for VoterInfo {
    fn from(entry: RosterEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.entry.name,
            age: entry.entry.age,
            gender: entry.entry.gender,
        }
    }
}

/// Classification of a single capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaptureOutcome {
    /// The matcher found no candidate at all.
    NoMatch,
    /// The matched person has no roster entry; no ballot record was created.
    Unregistered { name: String },
    /// The person may vote. Repeated captures keep returning this until a
    /// vote is recorded.
    Eligible {
        voter: VoterInfo,
        /// True only for the capture that created the ballot record.
        newly_enrolled: bool,
    },
    /// The person has already voted and may not vote again.
    AlreadyVoted { voter: VoterInfo },
    /// The matcher failed; the capture can be retried.
    MatcherFailure { reason: String },
}

impl CaptureOutcome {
    /// Message for the kiosk display.
    pub fn message(&self) -> String {
        match self {
            Self::NoMatch => "No vote allowed.".to_string(),
            Self::Unregistered { name } => {
                format!("No additional information available for {name}. No vote allowed.")
            }
            Self::Eligible { voter, .. } => format!("{}, you may vote.", voter.name),
            Self::AlreadyVoted { voter } => format!("{} has already voted.", voter.name),
            Self::MatcherFailure { reason } => format!("Error during face detection: {reason}"),
        }
    }

    /// May the recognised person submit a vote?
    pub fn may_vote(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }
}

/// Response body of a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResponse {
    #[serde(flatten)]
    pub outcome: CaptureOutcome,
    pub message: String,
}

impl From<CaptureOutcome> for CaptureResponse {
    fn from(outcome: CaptureOutcome) -> Self {
        let message = outcome.message();
        Self { outcome, message }
    }
}
