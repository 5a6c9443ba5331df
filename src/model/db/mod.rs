pub mod ballot_record;
pub mod roster;

pub use ballot_record::BallotRecord;
pub use roster::{NewRosterEntry, RosterEntry};
