use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::Deserialize;

use super::{FaceMatcher, MatchGroups, MatcherError};

/// Settings for the HTTP matcher service, from the `matcher` config table.
#[derive(Debug, Clone, Deserialize)]
pub struct MatcherOptions {
    /// Base URL of the matcher service.
    pub url: String,
    /// Gallery of reference images, as a path on the matcher host.
    #[serde(default = "default_gallery")]
    pub gallery: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_detector")]
    pub detector: String,
    /// Seconds before a matcher call is abandoned.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_gallery() -> String {
    "faces".to_string()
}

fn default_model() -> String {
    "Facenet512".to_string()
}

fn default_metric() -> String {
    "euclidean_l2".to_string()
}

fn default_detector() -> String {
    "yolov8".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Client for a matcher exposed over HTTP.
///
/// The captured image is POSTed as raw bytes to `{url}/find`; the service
/// answers with a JSON list of candidate groups, or 422 if it could not
/// detect a face.
pub struct HttpMatcher {
    client: Client,
    options: MatcherOptions,
}

impl HttpMatcher {
    pub fn new(options: MatcherOptions) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout))
            .build()?;
        Ok(Self { client, options })
    }

    fn find_url(&self) -> String {
        format!("{}/find", self.options.url.trim_end_matches('/'))
    }
}

#[rocket::async_trait]
impl FaceMatcher for HttpMatcher {
    async fn find(&self, image: &[u8]) -> Result<MatchGroups, MatcherError> {
        let response = self
            .client
            .post(self.find_url())
            .query(&[
                ("db_path", self.options.gallery.as_str()),
                ("model_name", self.options.model.as_str()),
                ("distance_metric", self.options.metric.as_str()),
                ("detector_backend", self.options.detector.as_str()),
            ])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let reason = response.text().await?;
            return Err(MatcherError::Detection(reason));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MatcherError::Rejected(format!("{status}: {body}")));
        }

        Ok(response.json::<MatchGroups>().await?)
    }
}
