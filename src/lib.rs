#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{Config, ConfigFairing, MatcherFairing, StoreFairing};
use crate::logging::LoggerFairing;
use crate::matcher::SharedMatcher;
use crate::store::{SharedLedger, SharedRoster};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod store;
pub mod voting;

#[cfg(test)]
mod testing;

/// Build the kiosk server, taking all configuration and state from the
/// Rocket figment.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(MatcherFairing)
}

/// Build the kiosk server around already constructed state, bypassing the
/// config fairings.
pub fn rocket_with_state(
    config: Config,
    roster: SharedRoster,
    ledger: SharedLedger,
    matcher: SharedMatcher,
) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .manage(config)
        .manage(roster)
        .manage(ledger)
        .manage(matcher)
}
