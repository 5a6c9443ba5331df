use data_encoding::HEXLOWER;
use mongodb::bson::{spec::BinarySubtype, Binary, DateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::common::PartyId;

/// Per-identity voting state, as stored in the ballot ledger.
///
/// One record exists per identity that has ever been recognised. `has_voted`
/// only ever moves from false to true, and `party` is set in the same update,
/// so `party.is_some() == has_voted` holds for every stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallotRecord {
    /// Roster name of the voter; unique within the ledger.
    pub name: String,
    /// The image captured at enrollment, kept for audit.
    pub reference_image: Binary,
    pub has_voted: bool,
    pub party: Option<PartyId>,
    pub enrolled_at: DateTime,
    pub voted_at: Option<DateTime>,
}

impl BallotRecord {
    /// A fresh enrollment record: not yet voted, no party.
    pub fn enroll(name: impl Into<String>, image: &[u8]) -> Self {
        Self {
            name: name.into(),
            reference_image: Binary {
                subtype: BinarySubtype::Generic,
                bytes: image.to_vec(),
            },
            has_voted: false,
            party: None,
            enrolled_at: DateTime::now(),
            voted_at: None,
        }
    }

    /// Mark this record as voted for `party`. Callers must only do this
    /// from inside the ledger's atomic update.
    pub(crate) fn cast(&mut self, party: PartyId) {
        self.has_voted = true;
        self.party = Some(party);
        self.voted_at = Some(DateTime::now());
    }

    /// Does the record satisfy the voted/party invariant?
    pub fn is_consistent(&self) -> bool {
        self.has_voted == self.party.is_some()
    }

    /// Short hex digest of the reference image, for logging.
    pub fn image_digest(&self) -> String {
        let digest = Sha256::digest(&self.reference_image.bytes);
        HEXLOWER.encode(&digest[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrollment_and_cast_keep_invariant() {
        let mut record = BallotRecord::enroll("alice", b"frame");
        assert!(!record.has_voted);
        assert!(record.party.is_none());
        assert!(record.voted_at.is_none());
        assert!(record.is_consistent());
        assert_eq!(record.reference_image.bytes, b"frame".to_vec());

        let party: PartyId = rocket::serde::json::from_str(r#""Party B""#).unwrap();
        record.cast(party.clone());
        assert!(record.has_voted);
        assert_eq!(record.party, Some(party));
        assert!(record.voted_at.is_some());
        assert!(record.is_consistent());
    }

    #[test]
    fn image_digest_is_stable() {
        let a = BallotRecord::enroll("alice", b"frame");
        let b = BallotRecord::enroll("bob", b"frame");
        let c = BallotRecord::enroll("alice", b"other frame");
        assert_eq!(a.image_digest(), b.image_digest());
        assert_ne!(a.image_digest(), c.image_digest());
        assert_eq!(a.image_digest().len(), 16);
    }
}
