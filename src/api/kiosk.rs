use log::debug;
use rocket::{
    data::Capped,
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::matcher::SharedMatcher;
use crate::model::api::{CaptureResponse, VoteReceipt, VoteRequest, VotingSession, SESSION_COOKIE};
use crate::store::{SharedLedger, SharedRoster};
use crate::voting::{Kiosk, SessionAction, SubmitError, VoteSubmissionHandler};

pub fn routes() -> Vec<Route> {
    routes![capture, vote, end_session]
}

/// Classify a captured camera frame. Opens a voting session if, and only if,
/// the recognised person may vote. A matcher failure keeps any previous
/// session so the voter can retake the picture; other outcomes discard it.
#[post("/kiosk/capture", data = "<image>")]
pub async fn capture(
    image: Capped<Vec<u8>>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
    roster: &State<SharedRoster>,
    ledger: &State<SharedLedger>,
    matcher: &State<SharedMatcher>,
) -> Result<Json<CaptureResponse>> {
    if !image.is_complete() {
        return Err(Error::Status(
            Status::PayloadTooLarge,
            "Captured image exceeds the configured size limit".to_string(),
        ));
    }
    if image.is_empty() {
        return Err(Error::Status(
            Status::BadRequest,
            "Captured image is empty".to_string(),
        ));
    }

    let kiosk = Kiosk::new(
        roster.inner().as_ref(),
        ledger.inner().as_ref(),
        config.parties(),
        config.near_tie_margin(),
    );
    let capture = kiosk.on_capture(&image, matcher.inner().as_ref()).await?;

    match capture.session {
        SessionAction::Open(session) => cookies.add(session.into_cookie(config)),
        SessionAction::Close => cookies.remove(Cookie::named(SESSION_COOKIE)),
        SessionAction::Keep => {}
    }

    Ok(Json(capture.outcome.into()))
}

/// Cast the vote of the current session's voter.
#[post("/kiosk/vote", data = "<vote>", format = "json")]
pub async fn vote(
    session: Option<VotingSession>,
    vote: Json<VoteRequest>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
    ledger: &State<SharedLedger>,
) -> Result<Json<VoteReceipt>> {
    let handler = VoteSubmissionHandler::new(ledger.inner().as_ref(), config.parties());
    let result = handler.submit(session.as_ref(), &vote.party).await;

    // The session is spent once a vote exists for its voter. Other failures
    // leave it in place so the voter can retry.
    if matches!(result, Ok(_) | Err(SubmitError::AlreadyVoted(_))) {
        cookies.remove(Cookie::named(SESSION_COOKIE));
    }

    Ok(Json(result?))
}

/// Abandon the current session, e.g. when the voter walks away.
#[delete("/kiosk/session")]
pub fn end_session(session: Option<VotingSession>, cookies: &CookieJar) -> Status {
    if let Some(session) = session {
        debug!("Abandoned voting session for {}", session.name);
    }
    cookies.remove(Cookie::named(SESSION_COOKIE));
    Status::Ok
}
