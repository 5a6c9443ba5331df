use std::collections::{BTreeMap, HashMap};

use rocket::tokio::sync::Mutex;

use crate::model::{
    common::PartyId,
    db::{BallotRecord, NewRosterEntry, RosterEntry},
};

use super::{BallotLedger, Enrollment, ImportReport, Roster, StoreError, VoteCommit};

/// In-memory roster for a standalone kiosk.
#[derive(Debug)]
pub struct MemoryRoster {
    inner: Mutex<RosterInner>,
}

#[derive(Debug)]
struct RosterInner {
    entries: HashMap<String, RosterEntry>,
    next_id: u32,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RosterInner {
                entries: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }
}

impl Default for MemoryRoster {
    fn default() -> Self {
        Self::new()
    }
}

#[rocket::async_trait]
impl Roster for MemoryRoster {
    async fn lookup(&self, name: &str) -> Result<Option<RosterEntry>, StoreError> {
        Ok(self.inner.lock().await.entries.get(name).cloned())
    }

    async fn import(&self, entries: Vec<NewRosterEntry>) -> Result<ImportReport, StoreError> {
        let mut inner = self.inner.lock().await;
        let mut report = ImportReport::default();
        for entry in entries {
            if inner.entries.contains_key(&entry.name) {
                report.skipped += 1;
                continue;
            }
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.insert(entry.name.clone(), entry.with_id(id));
            report.inserted += 1;
        }
        Ok(report)
    }
}

/// In-memory ballot ledger for a standalone kiosk. A single lock guards
/// all records, so each operation is atomic with respect to every other.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<HashMap<String, BallotRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in the ledger.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[rocket::async_trait]
impl BallotLedger for MemoryLedger {
    async fn find(&self, name: &str) -> Result<Option<BallotRecord>, StoreError> {
        Ok(self.records.lock().await.get(name).cloned())
    }

    async fn enroll(&self, record: BallotRecord) -> Result<Enrollment, StoreError> {
        let mut records = self.records.lock().await;
        if let Some(existing) = records.get(&record.name) {
            return Ok(Enrollment::Existing(existing.clone()));
        }
        records.insert(record.name.clone(), record.clone());
        Ok(Enrollment::Created(record))
    }

    async fn commit_vote(&self, name: &str, party: &PartyId) -> Result<VoteCommit, StoreError> {
        let mut records = self.records.lock().await;
        let commit = match records.get_mut(name) {
            None => VoteCommit::NotEnrolled,
            Some(record) if record.has_voted => VoteCommit::AlreadyVoted,
            Some(record) => {
                record.cast(party.clone());
                VoteCommit::Recorded(record.clone())
            }
        };
        Ok(commit)
    }

    async fn tally(&self) -> Result<BTreeMap<PartyId, u64>, StoreError> {
        let records = self.records.lock().await;
        let mut totals = BTreeMap::new();
        for party in records.values().filter_map(|record| record.party.clone()) {
            *totals.entry(party).or_insert(0) += 1;
        }
        Ok(totals)
    }
}
