mod party;

pub use party::{PartyId, PartySet, PartySetError, DEFAULT_PARTIES};
