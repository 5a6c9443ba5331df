use std::sync::Arc;

use chrono::Duration;
use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::matcher::{HttpMatcher, MatcherOptions, SharedMatcher};
use crate::model::{
    common::PartySet,
    db::NewRosterEntry,
    mongodb::{ensure_indexes_exist, ensure_roster_id_counter_exists, Coll},
};
use crate::store::{
    MemoryLedger, MemoryRoster, MongoLedger, MongoRoster, SharedLedger, SharedRoster,
    StoreError,
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    session_ttl: u32,
    #[serde(default)]
    parties: PartySet,
    #[serde(default)]
    near_tie_margin: f64,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of a voting session cookie in seconds.
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl.into())
    }

    /// The parties a vote may be cast for.
    pub fn parties(&self) -> &PartySet {
        &self.parties
    }

    /// Distance within which a runner-up candidate is logged as a near tie.
    pub fn near_tie_margin(&self) -> f64 {
        self.near_tie_margin
    }

    /// Secret key used to sign session JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages. Party list validation happens during extraction.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Voting for {} parties", config.parties().len());

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Where the roster and ledger live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// MongoDB, shared between kiosks.
    #[default]
    Mongo,
    /// Process memory, for a single standalone kiosk. Lost on restart.
    Memory,
}

/// Configuration for the roster and ledger stores.
#[derive(Deserialize)]
struct StoreConfig {
    // non-secrets
    #[serde(default)]
    ledger: LedgerBackend,
    #[serde(default = "default_db_name")]
    db_name: String,
    /// Roster entries to import at startup. Names already on the roster are
    /// skipped.
    #[serde(default)]
    roster: Vec<NewRosterEntry>,
    // secrets
    db_uri: Option<String>,
}

fn default_db_name() -> String {
    "facevote".to_string()
}

/// A fairing that loads the store config, sets up the selected backend, and
/// places a `SharedRoster` and `SharedLedger` into managed state. With the
/// MongoDB backend it also manages the `Client` and `Database`.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Stores",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let (roster, ledger): (SharedRoster, SharedLedger) = match config.ledger {
            LedgerBackend::Memory => {
                info!("Using in-memory roster and ledger");
                (Arc::new(MemoryRoster::new()), Arc::new(MemoryLedger::new()))
            }
            LedgerBackend::Mongo => {
                let Some(db_uri) = config.db_uri.as_deref() else {
                    error!("`db_uri` must be set when `ledger = \"mongo\"`");
                    return Err(rocket);
                };
                info!("Loaded database config, connecting...");
                let (client, db) = match connect(db_uri, &config.db_name).await {
                    Ok(connection) => connection,
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                };
                info!("...database connection online!");

                let roster = MongoRoster::new(&db);
                let ledger = MongoLedger::new(&db);
                rocket = rocket.manage(client).manage(db);
                (Arc::new(roster), Arc::new(ledger))
            }
        };

        // Import the configured roster, if any.
        if !config.roster.is_empty() {
            match roster.import(config.roster).await {
                Ok(report) => info!(
                    "Imported roster: {} inserted, {} already present",
                    report.inserted, report.skipped
                ),
                Err(e) => {
                    error!("Failed to import roster: {e}");
                    return Err(rocket);
                }
            }
        }

        // Manage the state.
        rocket = rocket.manage(roster).manage(ledger);
        Ok(rocket)
    }
}

/// Connect to MongoDB and ensure the indexes and counters the stores rely on
/// exist.
async fn connect(db_uri: &str, db_name: &str) -> Result<(MongoClient, Database), StoreError> {
    let client = MongoClient::with_uri_str(db_uri).await?;
    let db = client.database(db_name);
    ensure_indexes_exist(&db).await?;
    ensure_roster_id_counter_exists(&Coll::from_db(&db)).await?;
    Ok((client, db))
}

/// A fairing that loads the `matcher` config table and places a
/// `SharedMatcher` into managed state.
pub struct MatcherFairing;

#[rocket::async_trait]
impl Fairing for MatcherFairing {
    fn info(&self) -> Info {
        Info {
            name: "Face matcher",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let options = match rocket.figment().extract_inner::<MatcherOptions>("matcher") {
            Ok(options) => options,
            Err(e) => {
                error!("Failed to load matcher config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        // Construct the client.
        let url = options.url.clone();
        let matcher = match HttpMatcher::new(options) {
            Ok(matcher) => matcher,
            Err(e) => {
                error!("Failed to build matcher client: {e}");
                return Err(rocket);
            }
        };
        info!("Using face matcher at {url}");

        // Manage the state.
        let matcher: SharedMatcher = Arc::new(matcher);
        rocket = rocket.manage(matcher);
        Ok(rocket)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                session_ttl: 300,
                parties: PartySet::default(),
                near_tie_margin: 0.05,
                jwt_secret: "kiosk-test-secret".to_string(),
            }
        }
    }
}
