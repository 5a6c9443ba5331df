//! Persistence for the voter roster and the ballot ledger.
//!
//! Both stores are traits so that a kiosk can run against MongoDB (shared
//! between kiosks) or purely in memory (a single standalone kiosk). Every
//! ledger mutation is a single atomic operation on the backing store; no
//! caller ever reads a record and then writes it back.

use std::collections::BTreeMap;
use std::sync::Arc;

use mongodb::error::Error as DbError;
use thiserror::Error;

use crate::model::{
    common::PartyId,
    db::{BallotRecord, NewRosterEntry, RosterEntry},
};

mod memory;
mod mongo;

pub use memory::{MemoryLedger, MemoryRoster};
pub use mongo::{MongoLedger, MongoRoster};

/// Storage failures. The operation that hit one had no effect and can be
/// retried as a whole.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Ledger inconsistency: {0}")]
    Inconsistent(String),
}

/// Result of trying to enroll an identity in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrollment {
    /// No record existed; the given record was inserted.
    Created(BallotRecord),
    /// A record already existed and was left untouched.
    Existing(BallotRecord),
}

/// Result of trying to commit a vote.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteCommit {
    /// The vote was recorded; this is the updated record.
    Recorded(BallotRecord),
    /// The identity had already voted; nothing changed.
    AlreadyVoted,
    /// There is no record for the identity; nothing changed.
    NotEnrolled,
}

/// Counts from a roster import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// The static roster of people allowed to vote.
#[rocket::async_trait]
pub trait Roster: Send + Sync {
    /// Find the roster entry with the given name.
    async fn lookup(&self, name: &str) -> Result<Option<RosterEntry>, StoreError>;

    /// Import entries, assigning fresh internal IDs. Names already present
    /// are skipped, so re-running an import never duplicates entries.
    async fn import(&self, entries: Vec<NewRosterEntry>) -> Result<ImportReport, StoreError>;
}

/// The durable per-identity voting state.
#[rocket::async_trait]
pub trait BallotLedger: Send + Sync {
    /// Get the record for the given name.
    async fn find(&self, name: &str) -> Result<Option<BallotRecord>, StoreError>;

    /// Atomically insert `record` unless a record with the same name exists.
    async fn enroll(&self, record: BallotRecord) -> Result<Enrollment, StoreError>;

    /// Atomically set `has_voted` and `party` on the named record, only if
    /// it has not voted yet.
    async fn commit_vote(&self, name: &str, party: &PartyId) -> Result<VoteCommit, StoreError>;

    /// Count the votes cast for each party.
    async fn tally(&self) -> Result<BTreeMap<PartyId, u64>, StoreError>;
}

/// Roster as held in managed state.
pub type SharedRoster = Arc<dyn Roster>;

/// Ledger as held in managed state.
pub type SharedLedger = Arc<dyn BallotLedger>;
