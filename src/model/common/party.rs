use std::collections::HashSet;
use std::fmt::Display;

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The parties configured when none are given explicitly.
pub const DEFAULT_PARTIES: [&str; 4] = ["Party A", "Party B", "Party C", "Party D"];

/// A party a voter can choose. Only ever obtained from a [`PartySet`], except
/// when deserialized from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(String);

impl PartyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PartyId> for Bson {
    fn from(party: PartyId) -> Self {
        Bson::String(party.0)
    }
}

/// The fixed set of parties on the ballot, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PartySet(Vec<PartyId>);

impl PartySet {
    /// Build a party set, rejecting empty sets, blank names and duplicates.
    pub fn new<I, S>(names: I) -> Result<Self, PartySetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut parties = Vec::new();
        for name in names {
            let name: String = name.into();
            if name.trim().is_empty() {
                return Err(PartySetError::Blank);
            }
            if !seen.insert(name.clone()) {
                return Err(PartySetError::Duplicate(name));
            }
            parties.push(PartyId(name));
        }
        if parties.is_empty() {
            return Err(PartySetError::Empty);
        }
        Ok(Self(parties))
    }

    /// Look up a party by its exact name.
    pub fn get(&self, name: &str) -> Option<&PartyId> {
        self.0.iter().find(|party| party.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartyId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for PartySet {
    fn default() -> Self {
        Self(DEFAULT_PARTIES.iter().map(|name| PartyId(name.to_string())).collect())
    }
}

impl TryFrom<Vec<String>> for PartySet {
    type Error = PartySetError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<PartySet> for Vec<String> {
    fn from(parties: PartySet) -> Self {
        parties.0.into_iter().map(|party| party.0).collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartySetError {
    #[error("At least one party must be configured")]
    Empty,
    #[error("Party names must not be blank")]
    Blank,
    #[error("Party configured twice: {0}")]
    Duplicate(String),
}
