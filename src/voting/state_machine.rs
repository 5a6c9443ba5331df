use log::{debug, info, warn};

use crate::model::db::{BallotRecord, RosterEntry};
use crate::store::{BallotLedger, Enrollment, StoreError};

/// Voting state of a resolved identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VoterState {
    /// No roster entry. Terminal; nothing is recorded.
    Unregistered,
    /// On the roster but never recognised before.
    NewlyEnrolled,
    /// Has a ballot record and has not voted.
    Eligible,
    /// Has voted. Terminal.
    AlreadyVoted,
}

impl VoterState {
    /// Classify an identity from its roster presence and ledger record.
    /// Roster absence wins over any ledger record.
    pub fn of(on_roster: bool, record: Option<&BallotRecord>) -> Self {
        match (on_roster, record) {
            (false, _) => Self::Unregistered,
            (true, None) => Self::NewlyEnrolled,
            (true, Some(record)) if record.has_voted => Self::AlreadyVoted,
            (true, Some(_)) => Self::Eligible,
        }
    }
}

/// Result of a resolution event for one identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Eligibility {
    Unregistered { name: String },
    Eligible {
        voter: RosterEntry,
        newly_enrolled: bool,
    },
    AlreadyVoted { voter: RosterEntry },
}

/// Applies resolution events to the ledger.
pub struct VotingStateMachine<'a> {
    ledger: &'a dyn BallotLedger,
}

impl<'a> VotingStateMachine<'a> {
    pub fn new(ledger: &'a dyn BallotLedger) -> Self {
        Self { ledger }
    }

    /// Handle the resolution of `name`. `voter` is its roster entry, if any,
    /// and `image` the capture that recognised it.
    ///
    /// The only mutation is enrollment of a first-time voter, done as one
    /// insert-if-absent, so repeated captures of an eligible voter keep
    /// answering `Eligible` without creating further records.
    pub async fn on_resolution(
        &self,
        name: &str,
        voter: Option<RosterEntry>,
        image: &[u8],
    ) -> Result<Eligibility, StoreError> {
        let Some(voter) = voter else {
            if let Some(record) = self.ledger.find(name).await? {
                warn!(
                    "Ledger holds a record for {name} (voted: {}) but the roster does not; \
treating as unregistered",
                    record.has_voted
                );
            }
            return Ok(Eligibility::Unregistered {
                name: name.to_string(),
            });
        };

        let enrollment = self.ledger.enroll(BallotRecord::enroll(name, image)).await?;
        let (record, newly_enrolled) = match enrollment {
            Enrollment::Created(record) => {
                info!(
                    "Enrolled {name} in the ledger (image {})",
                    record.image_digest()
                );
                (record, true)
            }
            Enrollment::Existing(record) => (record, false),
        };

        if !record.is_consistent() {
            return Err(StoreError::Inconsistent(format!(
                "Record for {name} has has_voted = {} but party = {:?}",
                record.has_voted, record.party
            )));
        }

        Ok(match (record.has_voted, newly_enrolled) {
            (true, _) => {
                warn!("{name} recognised again after voting");
                Eligibility::AlreadyVoted { voter }
            }
            (false, true) => Eligibility::Eligible {
                voter,
                newly_enrolled: true,
            },
            (false, false) => {
                debug!("{name} recognised again, still eligible");
                Eligibility::Eligible {
                    voter,
                    newly_enrolled: false,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::common::PartySet;
    use crate::model::db::NewRosterEntry;
    use crate::store::MemoryLedger;

    fn alice() -> RosterEntry {
        NewRosterEntry::example().with_id(1)
    }

    #[test]
    fn classification() {
        let mut record = BallotRecord::enroll("alice", b"frame");
        assert_eq!(VoterState::of(false, None), VoterState::Unregistered);
        assert_eq!(VoterState::of(false, Some(&record)), VoterState::Unregistered);
        assert_eq!(VoterState::of(true, None), VoterState::NewlyEnrolled);
        assert_eq!(VoterState::of(true, Some(&record)), VoterState::Eligible);

        let party = PartySet::default().get("Party A").cloned().unwrap();
        record.cast(party);
        assert_eq!(VoterState::of(true, Some(&record)), VoterState::AlreadyVoted);
        assert_eq!(VoterState::of(false, Some(&record)), VoterState::Unregistered);
    }

    #[rocket::async_test]
    async fn first_resolution_enrolls_once() {
        let ledger = MemoryLedger::new();
        let machine = VotingStateMachine::new(&ledger);

        let first = machine
            .on_resolution("alice", Some(alice()), b"frame 1")
            .await
            .unwrap();
        assert_eq!(
            first,
            Eligibility::Eligible {
                voter: alice(),
                newly_enrolled: true,
            }
        );
        assert_eq!(ledger.len().await, 1);

        // Re-scans re-confirm eligibility without touching the ledger.
        for frame in [b"frame 2", b"frame 3"] {
            let again = machine
                .on_resolution("alice", Some(alice()), frame)
                .await
                .unwrap();
            assert_eq!(
                again,
                Eligibility::Eligible {
                    voter: alice(),
                    newly_enrolled: false,
                }
            );
        }
        assert_eq!(ledger.len().await, 1);
        let record = ledger.find("alice").await.unwrap().unwrap();
        assert!(!record.has_voted);
        assert_eq!(record.reference_image.bytes, b"frame 1".to_vec());
    }

    #[rocket::async_test]
    async fn voted_identity_is_terminal() {
        let ledger = MemoryLedger::new();
        let machine = VotingStateMachine::new(&ledger);
        let parties = PartySet::default();

        machine
            .on_resolution("alice", Some(alice()), b"frame")
            .await
            .unwrap();
        ledger
            .commit_vote("alice", parties.get("Party C").unwrap())
            .await
            .unwrap();

        let outcome = machine
            .on_resolution("alice", Some(alice()), b"frame")
            .await
            .unwrap();
        assert_eq!(outcome, Eligibility::AlreadyVoted { voter: alice() });
    }

    #[rocket::async_test]
    async fn unregistered_creates_nothing() {
        let ledger = MemoryLedger::new();
        let machine = VotingStateMachine::new(&ledger);

        let outcome = machine.on_resolution("bob", None, b"frame").await.unwrap();
        assert_eq!(
            outcome,
            Eligibility::Unregistered {
                name: "bob".to_string()
            }
        );
        assert_eq!(ledger.len().await, 0);
    }

    #[rocket::async_test]
    async fn roster_absence_beats_ledger_record() {
        let ledger = MemoryLedger::new();
        ledger
            .enroll(BallotRecord::enroll("mallory", b"frame"))
            .await
            .unwrap();
        let machine = VotingStateMachine::new(&ledger);

        let outcome = machine
            .on_resolution("mallory", None, b"frame")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Eligibility::Unregistered {
                name: "mallory".to_string()
            }
        );
    }
}
