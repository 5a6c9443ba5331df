//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// Return true if the given result is a duplicate key error.
///
/// Plain inserts report this as a write error; upserts performed through
/// `findAndModify` report it as a command error.
pub fn is_duplicate_key_error<T>(result: Result<T, &DbError>) -> bool {
    match result {
        Err(err) => match *err.kind {
            ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
            ErrorKind::Command(ref e) => e.code == DUPLICATE_KEY,
            _ => false,
        },
        Ok(_) => false,
    }
}
