//! A CLI tool for importing the voter roster into the kiosk database.
//! Imports are idempotent: names already on the roster are skipped, so the
//! same file can safely be imported more than once.

use std::fs::File;
use std::io::Read;

use clap::{Arg, ArgAction, ArgMatches, Command};
use mongodb::Client;
use thiserror::Error;

use facevote_backend::model::{
    db::NewRosterEntry,
    mongodb::{ensure_indexes_exist, ensure_roster_id_counter_exists, Coll},
};
use facevote_backend::store::{ImportReport, MongoRoster, Roster, StoreError};

const PROGRAM_NAME: &str = "roster-import";

const ABOUT_TEXT: &str = "Import voters into the kiosk roster.

The roster file is CSV with the header `name,age,gender`. Each name must
match the file stem of that person's image in the matcher gallery.

EXIT CODES:
     0: Import succeeded.
     1: The roster file could not be read.
     2: The database could not be updated.";

const ROSTER_PATH: &str = "ROSTER_PATH";
const DB_URI: &str = "db-uri";
const DB_NAME: &str = "db-name";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(ROSTER_PATH)
                .help("Path to the roster CSV file")
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(DB_URI)
                .long(DB_URI)
                .help("MongoDB connection string")
                .action(ArgAction::Set)
                .default_value("mongodb://localhost:27017"),
        )
        .arg(
            Arg::new(DB_NAME)
                .long(DB_NAME)
                .help("Database holding the roster")
                .action(ArgAction::Set)
                .default_value("facevote"),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Error)]
enum Error {
    /// The roster file could not be read or parsed.
    #[error("Failed to read roster: {0}")]
    Roster(String),
    /// The database rejected the import.
    #[error("Import failed: {0}")]
    Store(#[from] StoreError),
}

impl From<mongodb::error::Error> for Error {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Store(err.into())
    }
}

/// Parse roster entries from CSV.
fn parse_roster(reader: impl Read) -> Result<Vec<NewRosterEntry>, Error> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .map(|record| record.map_err(|err| Error::Roster(err.to_string())))
        .collect()
}

/// Import the entries into the roster in the given database.
async fn import(
    entries: Vec<NewRosterEntry>,
    db_uri: &str,
    db_name: &str,
) -> Result<ImportReport, Error> {
    let client = Client::with_uri_str(db_uri).await?;
    let db = client.database(db_name);
    ensure_indexes_exist(&db).await?;
    ensure_roster_id_counter_exists(&Coll::from_db(&db)).await?;

    let roster = MongoRoster::new(&db);
    Ok(roster.import(entries).await?)
}

/// Run the import, report the result, and return the exit code.
async fn run(args: &ArgMatches) -> u8 {
    // Arguments are required or defaulted, so are guaranteed to be present.
    let path: &String = args.get_one(ROSTER_PATH).unwrap();
    let db_uri: &String = args.get_one(DB_URI).unwrap();
    let db_name: &String = args.get_one(DB_NAME).unwrap();

    let result = File::open(path)
        .map_err(|err| Error::Roster(err.to_string()))
        .and_then(parse_roster);
    let entries = match result {
        Ok(entries) => entries,
        Err(err) => {
            println!("{err}");
            return 1;
        }
    };
    println!("Read {} roster entries from {path}", entries.len());

    match import(entries, db_uri, db_name).await {
        Ok(report) => {
            println!("Inserted: {}", report.inserted);
            println!("Skipped (already present): {}", report.skipped);
            0
        }
        Err(err) => {
            println!("{err}");
            2
        }
    }
}

#[rocket::main]
async fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args).await;
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roster_csv() {
        let csv = "name,age,gender\nalice, 30, F\ndave,52,M\n";
        let entries = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(
            entries,
            vec![
                NewRosterEntry::new("alice", 30, "F"),
                NewRosterEntry::new("dave", 52, "M"),
            ]
        );
    }

    #[test]
    fn rejects_malformed_rows() {
        let csv = "name,age,gender\nalice,thirty,F\n";
        assert!(matches!(parse_roster(csv.as_bytes()), Err(Error::Roster(_))));

        let csv = "name,gender\nalice,F\n";
        assert!(matches!(parse_roster(csv.as_bytes()), Err(Error::Roster(_))));
    }

    #[test]
    fn cli_defaults() {
        let args = cli().get_matches_from([PROGRAM_NAME, "roster.csv"]);
        assert_eq!(args.get_one::<String>(DB_NAME).unwrap(), "facevote");
        assert_eq!(
            args.get_one::<String>(DB_URI).unwrap(),
            "mongodb://localhost:27017"
        );
    }
}
