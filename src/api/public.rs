use std::collections::BTreeMap;

use rocket::{serde::json::Json, Route, State};

use crate::config::Config;
use crate::error::Result;
use crate::model::common::PartyId;
use crate::store::{BallotLedger, SharedLedger};

pub fn routes() -> Vec<Route> {
    routes![parties, totals]
}

/// The parties on the ballot, in display order.
#[get("/parties")]
pub fn parties(config: &State<Config>) -> Json<Vec<PartyId>> {
    Json(config.parties().iter().cloned().collect())
}

/// Votes cast so far for each configured party.
#[get("/totals")]
pub async fn totals(
    config: &State<Config>,
    ledger: &State<SharedLedger>,
) -> Result<Json<BTreeMap<PartyId, u64>>> {
    let mut totals: BTreeMap<_, _> = config
        .parties()
        .iter()
        .map(|party| (party.clone(), 0))
        .collect();
    for (party, count) in ledger.tally().await? {
        // The party list may have shrunk since these votes were cast.
        *totals.entry(party).or_insert(0) += count;
    }
    Ok(Json(totals))
}
