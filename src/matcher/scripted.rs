use rocket::tokio::sync::Mutex;

use super::{FaceMatcher, MatchCandidate, MatchGroups, MatcherError};

/// A matcher whose answer is set by the test.
#[derive(Debug)]
pub struct ScriptedMatcher {
    response: Mutex<Result<MatchGroups, String>>,
}

impl ScriptedMatcher {
    /// A matcher that finds nobody until told otherwise.
    pub fn new() -> Self {
        Self {
            response: Mutex::new(Ok(Vec::new())),
        }
    }

    pub async fn respond_with(&self, groups: MatchGroups) {
        *self.response.lock().await = Ok(groups);
    }

    pub async fn fail_with(&self, reason: &str) {
        *self.response.lock().await = Err(reason.to_string());
    }

    /// A candidate pointing at the gallery image for `name`.
    pub fn candidate(name: &str, distance: f64) -> MatchCandidate {
        MatchCandidate {
            identity: format!("faces/{name}.jpg"),
            distance,
        }
    }

    /// A single group containing a single candidate.
    pub fn single(name: &str, distance: f64) -> MatchGroups {
        vec![vec![Self::candidate(name, distance)]]
    }
}

#[rocket::async_trait]
impl FaceMatcher for ScriptedMatcher {
    async fn find(&self, _image: &[u8]) -> Result<MatchGroups, MatcherError> {
        self.response
            .lock()
            .await
            .clone()
            .map_err(MatcherError::Detection)
    }
}
