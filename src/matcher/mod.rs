//! The seam to the external biometric matcher.
//!
//! The matcher compares a captured image against the reference gallery and
//! returns candidate identities, grouped and ranked by distance. This crate
//! does not interpret distances; it only consumes the ranking.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod http;
#[cfg(test)]
mod scripted;

pub use http::{HttpMatcher, MatcherOptions};
#[cfg(test)]
pub use scripted::ScriptedMatcher;

/// One candidate identity returned by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Reference to the gallery image that matched, e.g. `faces/alice.jpg`.
    pub identity: String,
    pub distance: f64,
}

/// Candidate groups in matcher order; one group per face found in the image.
pub type MatchGroups = Vec<Vec<MatchCandidate>>;

/// Failures of the external matcher. All of them are retryable from the
/// kiosk's point of view.
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("Matcher unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Face detection failed: {0}")]
    Detection(String),
    #[error("Matcher rejected the request: {0}")]
    Rejected(String),
}

#[rocket::async_trait]
pub trait FaceMatcher: Send + Sync {
    /// Match the captured image against the reference gallery.
    async fn find(&self, image: &[u8]) -> Result<MatchGroups, MatcherError>;
}

/// Matcher as held in managed state.
pub type SharedMatcher = Arc<dyn FaceMatcher>;
