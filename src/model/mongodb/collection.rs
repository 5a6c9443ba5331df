use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{BallotRecord, RosterEntry};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Roster collection
const ROSTER: &str = "roster";
impl MongoCollection for RosterEntry {
    const NAME: &'static str = ROSTER;
}

// Ballot ledger collection
const BALLOT_LEDGER: &str = "ballot_ledger";
impl MongoCollection for BallotRecord {
    const NAME: &'static str = BALLOT_LEDGER;
}

// Counter collection
const COUNTERS: &str = "counters";
impl MongoCollection for Counter {
    const NAME: &'static str = COUNTERS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// The unique `name` index on the ledger is what guarantees at most one
/// ballot record per identity, even when several kiosks enroll the same
/// person at once.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Roster collection.
    let roster_index = IndexModel::builder()
        .keys(doc! {"name": 1})
        .options(unique.clone())
        .build();
    Coll::<RosterEntry>::from_db(db)
        .create_index(roster_index, None)
        .await?;

    // Ballot ledger collection.
    let ledger_index = IndexModel::builder()
        .keys(doc! {"name": 1})
        .options(unique)
        .build();
    Coll::<BallotRecord>::from_db(db)
        .create_index(ledger_index, None)
        .await?;

    Ok(())
}
