use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::users::{service::AccountError, validation::FieldError};

pub const EMAIL_TAKEN: &str = "User with this email already exists";
pub const BAD_CREDENTIALS: &str = "Invalid email or password";
pub const REGISTER_FAILED: &str = "Failed to create user";
pub const INTERNAL: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a service failure, using `internal` as the client-facing message for 500s.
    pub fn from_account(err: AccountError, internal: &'static str) -> Self {
        match err {
            AccountError::EmailAlreadyExists => Self::Conflict(EMAIL_TAKEN),
            AccountError::InvalidCredentials => Self::Unauthorized(BAD_CREDENTIALS),
            AccountError::Internal(cause) => {
                error!(error = %format!("{cause:#}"), "account operation failed");
                Self::Internal(internal)
            }
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        Self::from_account(err, INTERNAL)
    }
}

/// 400s always carry a list of messages; other statuses a single one.
#[derive(Serialize)]
#[serde(untagged)]
enum Message {
    One(&'static str),
    Many(Vec<String>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: Message,
    error: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match self {
            Self::Validation(fields) => (
                Message::Many(fields.iter().map(|f| f.message.clone()).collect()),
                fields,
            ),
            Self::BadRequest(m) => (Message::Many(vec![m.to_string()]), Vec::new()),
            Self::Conflict(m) | Self::Unauthorized(m) | Self::Internal(m) => {
                (Message::One(m), Vec::new())
            }
        };
        let body = ErrorBody {
            status_code: status.as_u16(),
            message,
            error: status.canonical_reason().unwrap_or("Error"),
            errors,
        };
        (status, Json(body)).into_response()
    }
}
