use std::collections::BTreeMap;

use mongodb::{
    bson::{doc, to_document, DateTime},
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Database,
};
use rocket::futures::TryStreamExt;

use crate::model::{
    common::PartyId,
    db::{BallotRecord, NewRosterEntry, RosterEntry},
    mongodb::{is_duplicate_key_error, Coll, Counter, ROSTER_ID_COUNTER_ID},
};

use super::{BallotLedger, Enrollment, ImportReport, Roster, StoreError, VoteCommit};

/// Roster stored in MongoDB.
#[derive(Clone)]
pub struct MongoRoster {
    roster: Coll<RosterEntry>,
    counters: Coll<Counter>,
}

impl MongoRoster {
    pub fn new(db: &Database) -> Self {
        Self {
            roster: Coll::from_db(db),
            counters: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl Roster for MongoRoster {
    async fn lookup(&self, name: &str) -> Result<Option<RosterEntry>, StoreError> {
        Ok(self.roster.find_one(doc! { "name": name }, None).await?)
    }

    async fn import(&self, entries: Vec<NewRosterEntry>) -> Result<ImportReport, StoreError> {
        let mut report = ImportReport::default();
        for entry in entries {
            let with_name = doc! { "name": &entry.name };
            if self.roster.find_one(with_name, None).await?.is_some() {
                report.skipped += 1;
                continue;
            }
            // The unique name index settles races with a concurrent import;
            // the losing side merely burns an ID.
            let id = Counter::next(&self.counters, ROSTER_ID_COUNTER_ID).await?;
            let result = self.roster.insert_one(entry.with_id(id), None).await;
            if is_duplicate_key_error(result.as_ref()) {
                report.skipped += 1;
                continue;
            }
            result?;
            report.inserted += 1;
        }
        Ok(report)
    }
}

/// Ballot ledger stored in MongoDB, safe to share between kiosks.
#[derive(Clone)]
pub struct MongoLedger {
    ledger: Coll<BallotRecord>,
}

impl MongoLedger {
    pub fn new(db: &Database) -> Self {
        Self {
            ledger: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl BallotLedger for MongoLedger {
    async fn find(&self, name: &str) -> Result<Option<BallotRecord>, StoreError> {
        Ok(self.ledger.find_one(doc! { "name": name }, None).await?)
    }

    async fn enroll(&self, record: BallotRecord) -> Result<Enrollment, StoreError> {
        // Upsert with insert-only fields: an existing record is returned
        // untouched, a missing one is created, in one server-side operation.
        let mut on_insert = to_document(&record)
            .map_err(|e| StoreError::Inconsistent(format!("Unserializable record: {e}")))?;
        on_insert.remove("name");
        let update = doc! {
            "$setOnInsert": on_insert,
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .build();
        let result = self
            .ledger
            .find_one_and_update(doc! { "name": &record.name }, update, options)
            .await;

        // Two concurrent upserts can both miss and race on the unique index;
        // the loser sees the winner's record.
        if is_duplicate_key_error(result.as_ref()) {
            return self
                .find(&record.name)
                .await?
                .map(Enrollment::Existing)
                .ok_or_else(|| {
                    StoreError::Inconsistent(format!(
                        "Duplicate enrollment for {} but no record found",
                        record.name
                    ))
                });
        }

        Ok(match result? {
            Some(existing) => Enrollment::Existing(existing),
            None => Enrollment::Created(record),
        })
    }

    async fn commit_vote(&self, name: &str, party: &PartyId) -> Result<VoteCommit, StoreError> {
        // The `has_voted: false` filter makes check-and-set a single
        // conditional update; at most one concurrent caller can match.
        let filter = doc! {
            "name": name,
            "has_voted": false,
        };
        let update = doc! {
            "$set": {
                "has_voted": true,
                "party": party.clone(),
                "voted_at": DateTime::now(),
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        if let Some(record) = self
            .ledger
            .find_one_and_update(filter, update, options)
            .await?
        {
            return Ok(VoteCommit::Recorded(record));
        }

        // Nothing matched; work out why for the caller. This read does not
        // guard any write.
        match self.find(name).await? {
            Some(record) if record.has_voted => Ok(VoteCommit::AlreadyVoted),
            Some(_) => Err(StoreError::Inconsistent(format!(
                "Conditional vote update for {name} matched nothing, but it has not voted"
            ))),
            None => Ok(VoteCommit::NotEnrolled),
        }
    }

    async fn tally(&self) -> Result<BTreeMap<PartyId, u64>, StoreError> {
        let voted: Vec<BallotRecord> = self
            .ledger
            .find(doc! { "has_voted": true }, None)
            .await?
            .try_collect()
            .await?;
        let mut totals = BTreeMap::new();
        for party in voted.into_iter().filter_map(|record| record.party) {
            *totals.entry(party).or_insert(0) += 1;
        }
        Ok(totals)
    }
}

/// These tests need a running MongoDB at `MONGO_TEST_URI`.
#[cfg(all(test, feature = "mongo-tests"))]
mod tests {
    use std::sync::Arc;

    use mongodb::Client;
    use rocket::tokio;

    use super::*;
    use crate::model::{common::PartySet, mongodb::ensure_indexes_exist};

    async fn test_db() -> Database {
        let uri = std::env::var("MONGO_TEST_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let client = Client::with_uri_str(uri).await.unwrap();
        let random: u32 = rand::random();
        let db = client.database(&format!("test{random}"));
        ensure_indexes_exist(&db).await.unwrap();
        crate::model::mongodb::ensure_roster_id_counter_exists(&Coll::from_db(&db))
            .await
            .unwrap();
        db
    }

    #[rocket::async_test]
    async fn enroll_then_vote_once() {
        let db = test_db().await;
        let ledger = MongoLedger::new(&db);
        let parties = PartySet::default();
        let party = parties.get("Party B").unwrap();

        let record = BallotRecord::enroll("alice", b"frame");
        assert!(matches!(
            ledger.enroll(record.clone()).await.unwrap(),
            Enrollment::Created(_)
        ));
        assert!(matches!(
            ledger.enroll(record).await.unwrap(),
            Enrollment::Existing(_)
        ));

        assert!(matches!(
            ledger.commit_vote("alice", party).await.unwrap(),
            VoteCommit::Recorded(_)
        ));
        assert_eq!(
            ledger.commit_vote("alice", party).await.unwrap(),
            VoteCommit::AlreadyVoted
        );
        assert_eq!(
            ledger.commit_vote("nobody", party).await.unwrap(),
            VoteCommit::NotEnrolled
        );

        let stored = ledger.find("alice").await.unwrap().unwrap();
        assert!(stored.is_consistent());
        assert_eq!(stored.party.as_ref(), Some(party));

        db.drop(None).await.unwrap();
    }

    #[rocket::async_test]
    async fn concurrent_votes_commit_once() {
        let db = test_db().await;
        let ledger = Arc::new(MongoLedger::new(&db));
        let parties = PartySet::default();
        ledger
            .enroll(BallotRecord::enroll("alice", b"frame"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for party in parties.iter().cloned() {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.commit_vote("alice", &party).await.unwrap()
            }));
        }
        let mut recorded = 0;
        for handle in handles {
            if let VoteCommit::Recorded(_) = handle.await.unwrap() {
                recorded += 1;
            }
        }
        assert_eq!(recorded, 1);

        db.drop(None).await.unwrap();
    }

    #[rocket::async_test]
    async fn roster_import_is_idempotent() {
        let db = test_db().await;
        let roster = MongoRoster::new(&db);
        let entries = vec![NewRosterEntry::example(), NewRosterEntry::example2()];

        let first = roster.import(entries.clone()).await.unwrap();
        assert_eq!(first, ImportReport { inserted: 2, skipped: 0 });
        let second = roster.import(entries).await.unwrap();
        assert_eq!(second, ImportReport { inserted: 0, skipped: 2 });

        let alice = roster.lookup("alice").await.unwrap().unwrap();
        assert_eq!(alice.entry, NewRosterEntry::example());

        db.drop(None).await.unwrap();
    }
}
