use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// A person eligible to vote, as supplied by the roster import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRosterEntry {
    /// Unique name; also the file stem of the person's gallery image.
    pub name: String,
    pub age: u32,
    pub gender: String,
}

impl NewRosterEntry {
    pub fn new(name: impl Into<String>, age: u32, gender: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age,
            gender: gender.into(),
        }
    }

    /// Attach the internal numeric ID assigned on import.
    pub fn with_id(self, id: u32) -> RosterEntry {
        RosterEntry { id, entry: self }
    }
}

/// A roster entry from the database, with its internal numeric ID.
/// Never modified once imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(rename = "_id")]
    pub id: u32,
    #[serde(flatten)]
    pub entry: NewRosterEntry,
}

impl Deref for RosterEntry {
    type Target = NewRosterEntry;

    fn deref(&self) -> &Self::Target {
        &self.entry
    }
}
