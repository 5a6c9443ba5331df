use log::{info, warn};
use thiserror::Error;

use crate::model::api::{VoteReceipt, VotingSession};
use crate::model::common::PartySet;
use crate::store::{BallotLedger, StoreError, VoteCommit};

/// Reasons a vote submission is refused. None of them change the ledger.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("No active voting session")]
    NoActiveSession,
    #[error("{0} has already voted")]
    AlreadyVoted(String),
    #[error("Invalid party: {0:?}")]
    InvalidParty(String),
    #[error("Vote could not be stored: {0}")]
    Persistence(#[from] StoreError),
}

/// Records at most one vote per identity.
pub struct VoteSubmissionHandler<'a> {
    ledger: &'a dyn BallotLedger,
    parties: &'a PartySet,
}

impl<'a> VoteSubmissionHandler<'a> {
    pub fn new(ledger: &'a dyn BallotLedger, parties: &'a PartySet) -> Self {
        Self { ledger, parties }
    }

    /// Submit a vote for `party` on behalf of the session's voter.
    ///
    /// The session and party are checked before the ledger is touched. The
    /// commit itself is a single conditional update, so of any number of
    /// concurrent submissions for one voter exactly one succeeds.
    pub async fn submit(
        &self,
        session: Option<&VotingSession>,
        party: &str,
    ) -> Result<VoteReceipt, SubmitError> {
        let session = session.ok_or(SubmitError::NoActiveSession)?;
        let party = self
            .parties
            .get(party)
            .ok_or_else(|| SubmitError::InvalidParty(party.to_string()))?;

        match self.ledger.commit_vote(&session.name, party).await? {
            VoteCommit::Recorded(record) => {
                let voted_at = record
                    .voted_at
                    .ok_or_else(|| {
                        StoreError::Inconsistent(format!(
                            "Vote for {} was recorded without a timestamp",
                            record.name
                        ))
                    })?
                    .to_chrono();
                info!("Recorded vote for {}", session.name);
                Ok(VoteReceipt {
                    name: record.name,
                    party: party.clone(),
                    voted_at,
                })
            }
            VoteCommit::AlreadyVoted => {
                warn!("Rejected repeat vote for {}", session.name);
                Err(SubmitError::AlreadyVoted(session.name.clone()))
            }
            VoteCommit::NotEnrolled => {
                warn!("Vote submitted for {}, who is not enrolled", session.name);
                Err(SubmitError::NoActiveSession)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rocket::tokio::runtime::Builder;

    use super::*;
    use crate::model::api::VoteRequest;
    use crate::model::db::BallotRecord;
    use crate::store::MemoryLedger;

    async fn enrolled(name: &str) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger
            .enroll(BallotRecord::enroll(name, b"frame"))
            .await
            .unwrap();
        ledger
    }

    #[rocket::async_test]
    async fn records_exactly_once() {
        let ledger = enrolled("alice").await;
        let parties = PartySet::default();
        let handler = VoteSubmissionHandler::new(&ledger, &parties);
        let session = VotingSession::new("alice");

        let receipt = handler
            .submit(Some(&session), &VoteRequest::example().party)
            .await
            .unwrap();
        assert_eq!(receipt.name, "alice");
        assert_eq!(receipt.party.as_str(), "Party B");
        assert_eq!(receipt.message(), "Your vote for Party B has been submitted.");

        let again = handler.submit(Some(&session), "Party A").await;
        assert!(matches!(again, Err(SubmitError::AlreadyVoted(name)) if name == "alice"));

        let record = ledger.find("alice").await.unwrap().unwrap();
        assert!(record.has_voted);
        assert_eq!(record.party.unwrap().as_str(), "Party B");
    }

    #[rocket::async_test]
    async fn rejections_leave_ledger_untouched() {
        let ledger = enrolled("alice").await;
        let parties = PartySet::default();
        let handler = VoteSubmissionHandler::new(&ledger, &parties);
        let session = VotingSession::new("alice");

        let result = handler.submit(None, "Party A").await;
        assert!(matches!(result, Err(SubmitError::NoActiveSession)));

        let result = handler
            .submit(Some(&session), &VoteRequest::example_invalid().party)
            .await;
        assert!(matches!(result, Err(SubmitError::InvalidParty(party)) if party == "Party Z"));

        // Party names are matched exactly.
        let result = handler.submit(Some(&session), "party a").await;
        assert!(matches!(result, Err(SubmitError::InvalidParty(_))));

        let record = ledger.find("alice").await.unwrap().unwrap();
        assert!(!record.has_voted);
        assert!(record.party.is_none());
    }

    #[rocket::async_test]
    async fn unenrolled_session_is_refused() {
        let ledger = MemoryLedger::new();
        let parties = PartySet::default();
        let handler = VoteSubmissionHandler::new(&ledger, &parties);

        let result = handler
            .submit(Some(&VotingSession::new("carol")), "Party A")
            .await;
        assert!(matches!(result, Err(SubmitError::NoActiveSession)));
        assert_eq!(ledger.len().await, 0);
    }

    #[test]
    fn concurrent_submissions_record_one_vote() {
        let runtime = Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let ledger = Arc::new(enrolled("alice").await);
            let parties = Arc::new(PartySet::default());

            let tasks: Vec<_> = ["Party A", "Party B", "Party C", "Party D"]
                .into_iter()
                .cycle()
                .take(32)
                .map(|party| {
                    let ledger = ledger.clone();
                    let parties = parties.clone();
                    rocket::tokio::spawn(async move {
                        let handler = VoteSubmissionHandler::new(&*ledger, &parties);
                        handler
                            .submit(Some(&VotingSession::new("alice")), party)
                            .await
                            .map(|receipt| receipt.party)
                    })
                })
                .collect();

            let mut recorded = Vec::new();
            for task in tasks {
                match task.await.unwrap() {
                    Ok(party) => recorded.push(party),
                    Err(SubmitError::AlreadyVoted(_)) => {}
                    Err(e) => panic!("Unexpected submission error: {e}"),
                }
            }
            assert_eq!(recorded.len(), 1);

            let record = ledger.find("alice").await.unwrap().unwrap();
            assert_eq!(record.party.as_ref(), Some(&recorded[0]));
            let tally = ledger.tally().await.unwrap();
            assert_eq!(tally.values().sum::<u64>(), 1);
        });
    }
}
