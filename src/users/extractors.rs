use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use base64ct::{Base64, Encoding};

use crate::error::ApiError;

/// Decoded HTTP Basic credentials. Any missing or malformed header rejects
/// with the same `InvalidCredentials` the service uses, so the 401 surface
/// is uniform.
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for BasicAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::InvalidCredentials)?;

        let encoded = header
            .strip_prefix("Basic ")
            .or_else(|| header.strip_prefix("basic "))
            .ok_or(ApiError::InvalidCredentials)?;

        let decoded =
            Base64::decode_vec(encoded.trim()).map_err(|_| ApiError::InvalidCredentials)?;
        let decoded = String::from_utf8(decoded).map_err(|_| ApiError::InvalidCredentials)?;

        // Password may itself contain ':'; only the first separator counts.
        let (username, password) = decoded.split_once(':').ok_or(ApiError::InvalidCredentials)?;

        Ok(BasicAuth {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}
