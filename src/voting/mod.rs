//! Identity resolution and single-vote enforcement.
//!
//! A capture runs through [`IdentityResolver`] and then
//! [`VotingStateMachine`]; a vote runs through [`VoteSubmissionHandler`].
//! [`Kiosk`] ties the three together over one roster and one ledger.

mod resolver;
mod state_machine;
mod submission;

pub use resolver::{first_candidate, identity_name, IdentityResolver, Resolution};
pub use state_machine::{Eligibility, VoterState, VotingStateMachine};
pub use submission::{SubmitError, VoteSubmissionHandler};

use crate::matcher::FaceMatcher;
use crate::model::api::{CaptureOutcome, VoteReceipt, VotingSession};
use crate::model::common::PartySet;
use crate::store::{BallotLedger, Roster, StoreError};

/// What a capture does to the kiosk's current voting session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Replace any current session with one for the recognised voter.
    Open(VotingSession),
    /// End any current session.
    Close,
    /// Leave the current session, if any, as it is.
    Keep,
}

/// Outcome of one capture, plus its effect on the voting session.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub outcome: CaptureOutcome,
    pub session: SessionAction,
}

impl From<CaptureOutcome> for Capture {
    fn from(outcome: CaptureOutcome) -> Self {
        // A matcher failure is retryable and says nothing about who is in
        // front of the camera.
        let session = match outcome {
            CaptureOutcome::MatcherFailure { .. } => SessionAction::Keep,
            _ => SessionAction::Close,
        };
        Self { outcome, session }
    }
}

/// The voting core for one kiosk.
pub struct Kiosk<'a> {
    roster: &'a dyn Roster,
    ledger: &'a dyn BallotLedger,
    parties: &'a PartySet,
    near_tie_margin: f64,
}

impl<'a> Kiosk<'a> {
    pub fn new(
        roster: &'a dyn Roster,
        ledger: &'a dyn BallotLedger,
        parties: &'a PartySet,
        near_tie_margin: f64,
    ) -> Self {
        Self {
            roster,
            ledger,
            parties,
            near_tie_margin,
        }
    }

    /// Classify a captured image. Only an eligible voter gets a session, and
    /// only a matcher failure leaves the current one in place.
    pub async fn on_capture(
        &self,
        image: &[u8],
        matcher: &dyn FaceMatcher,
    ) -> Result<Capture, StoreError> {
        let matched = matcher.find(image).await;
        let resolver = IdentityResolver::new(self.roster, self.near_tie_margin);

        let (name, voter) = match resolver.resolve(matched).await? {
            Resolution::NoMatch => return Ok(CaptureOutcome::NoMatch.into()),
            Resolution::MatcherFailure(reason) => {
                return Ok(CaptureOutcome::MatcherFailure { reason }.into())
            }
            Resolution::Resolved { name, info, .. } => (name, info),
        };

        let machine = VotingStateMachine::new(self.ledger);
        let capture = match machine.on_resolution(&name, voter, image).await? {
            Eligibility::Unregistered { name } => CaptureOutcome::Unregistered { name }.into(),
            Eligibility::AlreadyVoted { voter } => CaptureOutcome::AlreadyVoted {
                voter: voter.into(),
            }
            .into(),
            Eligibility::Eligible {
                voter,
                newly_enrolled,
            } => Capture {
                outcome: CaptureOutcome::Eligible {
                    voter: voter.into(),
                    newly_enrolled,
                },
                session: SessionAction::Open(VotingSession::new(name)),
            },
        };
        Ok(capture)
    }

    /// Submit a vote for the session's voter.
    pub async fn on_submit(
        &self,
        session: Option<&VotingSession>,
        party: &str,
    ) -> Result<VoteReceipt, SubmitError> {
        VoteSubmissionHandler::new(self.ledger, self.parties)
            .submit(session, party)
            .await
    }
}
