//! Login and identity handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::middleware::actor::CurrentActor;
use crate::AppState;
use paperdesk_common::{
    db::models::User,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    pub permissions: Vec<String>,
}

/// Exchange email and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    request.validate()?;

    let user = state.repo.authenticate(&request.email, &request.password).await?;
    let access_token = state.jwt.generate_token(user.id)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.config.auth.jwt_expiration_secs,
    }))
}

/// The calling user and their effective permissions
pub async fn me(
    State(state): State<AppState>,
    current: CurrentActor,
) -> Result<Json<MeResponse>> {
    let actor = current.actor().ok_or_else(|| AppError::Unauthorized {
        message: "Authentication required".to_string(),
    })?;

    let user = state.repo.get_user(actor.user_id).await?;
    let mut permissions = actor.permissions().names();
    permissions.sort();

    Ok(Json(MeResponse { user, permissions }))
}
