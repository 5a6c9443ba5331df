use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{error, warn};
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::store::StoreError;
use crate::voting::SubmitError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// The HTTP status this error is reported as.
    pub fn status(&self) -> Status {
        match self {
            Self::Store(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Submit(err) => match err {
                SubmitError::NoActiveSession => Status::Unauthorized,
                SubmitError::AlreadyVoted(_) => Status::Conflict,
                SubmitError::InvalidParty(_) => Status::UnprocessableEntity,
                SubmitError::Persistence(_) => Status::InternalServerError,
            },
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_statuses() {
        let cases = [
            (SubmitError::NoActiveSession, Status::Unauthorized),
            (
                SubmitError::AlreadyVoted("alice".to_string()),
                Status::Conflict,
            ),
            (
                SubmitError::InvalidParty("Party Z".to_string()),
                Status::UnprocessableEntity,
            ),
            (
                SubmitError::Persistence(StoreError::Inconsistent("test".to_string())),
                Status::InternalServerError,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(Error::from(err).status(), status);
        }
        let err = Error::Status(Status::ServiceUnavailable, "test".to_string());
        assert_eq!(err.status(), Status::ServiceUnavailable);
    }
}
