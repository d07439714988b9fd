use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every failure the API can report to a client. Business-rule failures map
/// to their transport status exactly once, in `into_response`; infrastructure
/// failures fold into `Internal` and only the generic message leaves the
/// process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    UserAlreadyExists,

    /// Unknown user and wrong password are indistinguishable on purpose.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is already active")]
    UserAlreadyActive,

    /// Wrong, expired and already-used codes are indistinguishable on purpose.
    #[error("Invalid or expired code")]
    InvalidCode,

    #[error("Failed to send email, please try again later")]
    EmailDelivery(#[source] anyhow::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidCode => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UserAlreadyExists | Self::UserAlreadyActive => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::EmailDelivery(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::EmailDelivery(source) => {
                error!(error = %source, "activation email delivery failed")
            }
            Self::Internal(source) => error!(error = %source, "internal error"),
            _ => {}
        }

        let status = self.status();
        let body = Json(json!({ "detail": self.to_string() }));

        if matches!(self, Self::InvalidCredentials) {
            (status, [(header::WWW_AUTHENTICATE, "Basic")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
