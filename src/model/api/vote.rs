use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::PartyId;

/// A vote submission from the kiosk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub party: String,
}

/// Confirmation of a recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub name: String,
    pub party: PartyId,
    pub voted_at: DateTime<Utc>,
}

impl VoteReceipt {
    pub fn message(&self) -> String {
        format!("Your vote for {} has been submitted.", self.party)
    }
}
