mod capture;
mod session;
mod vote;

pub use capture::{CaptureOutcome, CaptureResponse, VoterInfo};
pub use session::{VotingSession, SESSION_COOKIE};
pub use vote::{VoteReceipt, VoteRequest};
