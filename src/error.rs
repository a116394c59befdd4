use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::db::user_vote::VoteRejection;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error(transparent)]
    Vote(#[from] VoteRejection),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, message.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Jwt(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Vote(VoteRejection::DeputyNotFound(_)) => Status::NotFound,
            Self::Vote(_) => Status::BadRequest,
            Self::Status(status, _) => *status,
        }
    }
}

/// The JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let message = if status.code >= 500 {
            // Internal details stay in the log.
            error!("{self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody::new(message))).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_rejections_map_to_client_errors() {
        assert_eq!(
            Error::from(VoteRejection::AllVotesUsed).status(),
            Status::BadRequest
        );
        assert_eq!(
            Error::from(VoteRejection::AlreadyVoted).status(),
            Status::BadRequest
        );
        assert_eq!(
            Error::from(VoteRejection::DeputyNotFound("7".to_string())).status(),
            Status::NotFound
        );
    }

    #[test]
    fn status_errors_keep_their_message() {
        let err = Error::bad_request("Username already exists");
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(err.to_string(), "Username already exists");

        let err = Error::unauthorized("Not logged in");
        assert_eq!(err.status(), Status::Unauthorized);
    }
}
