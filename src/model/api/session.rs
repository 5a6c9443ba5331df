use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use log::debug;
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;

pub const SESSION_COOKIE: &str = "kiosk_session";

/// Proof that an identity was recognised as eligible to vote.
///
/// Issued by a capture and required by a vote submission, so the identity
/// being voted for is carried explicitly from one to the other. It carries
/// no authority on its own: the ledger still decides whether a vote can be
/// recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSession {
    /// Roster name of the eligible voter.
    #[serde(rename = "sub")]
    pub name: String,
    /// Random nonce so that two sessions for the same voter differ.
    #[serde(rename = "jti")]
    nonce: u64,
}

impl VotingSession {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nonce: rand::random(),
        }
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this session into a signed cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            session: self,
            expire_at: Utc::now() + config.session_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(SESSION_COOKIE, token)
            .max_age(Duration::seconds(config.session_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a session from a cookie, checking signature and expiry.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, JwtError> {
        jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.session)
    }
}

/// Cookie claims: the session itself plus an expiry datetime.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    session: VotingSession,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VotingSession {
    type Error = Error;

    /// Get the [`VotingSession`] from the session cookie. Routes take
    /// `Option<VotingSession>`, so a missing or invalid cookie simply means
    /// there is no active session.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = try_outcome!(req.cookies().get(SESSION_COOKIE).or_forward(()));

        match Self::from_cookie(cookie, config) {
            Ok(session) => Outcome::Success(session),
            Err(e) => {
                debug!("Rejected session cookie: {e}");
                Outcome::Failure((Status::Unauthorized, e.into()))
            }
        }
    }
}
