//! Shared setup for route tests; driven by `#[backend_test]`.

use std::sync::Arc;

use rocket::local::asynchronous::Client;

use crate::config::Config;
use crate::matcher::ScriptedMatcher;
use crate::model::db::NewRosterEntry;
use crate::store::{MemoryLedger, MemoryRoster, Roster};

/// Bytes standing in for a camera frame.
pub const CAPTURED_IMAGE: &[u8] = b"\xff\xd8\xff\xe0 captured kiosk frame";

/// In-memory state behind a test server. The roster holds the two example
/// entries; the ledger starts empty and the matcher finds nobody.
pub struct Fixture {
    pub roster: Arc<MemoryRoster>,
    pub ledger: Arc<MemoryLedger>,
    pub matcher: Arc<ScriptedMatcher>,
}

impl Fixture {
    pub async fn new() -> Self {
        let roster = MemoryRoster::new();
        roster
            .import(vec![NewRosterEntry::example(), NewRosterEntry::example2()])
            .await
            .unwrap();
        Self {
            roster: Arc::new(roster),
            ledger: Arc::new(MemoryLedger::new()),
            matcher: Arc::new(ScriptedMatcher::new()),
        }
    }

    /// A tracked client for a server over this fixture's state.
    pub async fn client(&self) -> Client {
        let rocket = crate::rocket_with_state(
            Config::example(),
            self.roster.clone(),
            self.ledger.clone(),
            self.matcher.clone(),
        );
        Client::tracked(rocket).await.unwrap()
    }
}

/// Send test logs to the console, once per test binary.
pub fn init_logging() {
    log4rs_test_utils::test_logging::init_logging_once_for(["facevote_backend"], None, None);
}
