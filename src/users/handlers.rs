use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use crate::{
    error::ApiError,
    state::AppState,
    users::{
        dto::{ActivateRequest, MessageResponse, RegisterRequest, UserResponse},
        extractors::BasicAuth,
        services,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/activate", post(activate))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if !services::is_valid_email(&payload.email) {
        warn!(email = %payload.email, "rejected invalid email");
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    services::check_password_strength(&payload.password).map_err(ApiError::Validation)?;

    let mut conn = state.db.acquire().await?;
    let user = services::register(
        &mut conn,
        state.mailer.as_ref(),
        &payload.email,
        &payload.password,
    )
    .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[instrument(skip(state, auth, payload))]
pub async fn activate(
    State(state): State<AppState>,
    auth: BasicAuth,
    Json(payload): Json<ActivateRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.code.len() != 4 || !payload.code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation("code must be exactly 4 digits".into()));
    }

    // All checks and both writes share one transaction; dropping it on any
    // error path rolls everything back.
    let mut tx = state.db.begin().await?;
    services::activate(&mut tx, &auth.username, &auth.password, &payload.code).await?;
    tx.commit().await?;

    info!("account activated");
    Ok(Json(MessageResponse {
        message: "Account activated successfully".into(),
    }))
}
