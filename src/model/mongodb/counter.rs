use log::{info, trace};
use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::{is_duplicate_key_error, Coll};
use crate::store::StoreError;

/// ID of the counter handing out internal roster IDs.
pub const ROSTER_ID_COUNTER_ID: &str = "roster_id";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Create a new `Counter` with the given ID, starting at the given value.
    pub fn new(id: impl Into<String>, start: u32) -> Self {
        Self {
            id: id.into(),
            next: start,
        }
    }

    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32, StoreError> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options: FindOneAndUpdateOptions = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| StoreError::Inconsistent(format!("Counter {id} does not exist")))?;
        Ok(counter.next)
    }
}

/// Ensure the roster ID counter exists, starting it at 1 if not.
///
/// This operation is idempotent.
pub async fn ensure_roster_id_counter_exists(counters: &Coll<Counter>) -> Result<(), DbError> {
    let result = counters
        .insert_one(Counter::new(ROSTER_ID_COUNTER_ID, 1), None)
        .await;
    if is_duplicate_key_error(result.as_ref()) {
        trace!("Roster ID counter already exists");
        return Ok(());
    }
    result?;
    info!("Created roster ID counter");
    Ok(())
}
