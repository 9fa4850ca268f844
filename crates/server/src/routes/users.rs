//! User registration, login and listing.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use super::ApiJson;
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{LoginSession, User};
use crate::services::AuthService;
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(register))
        .route("/users/login", post(login))
}

// =============================================================================
// Request Types
// =============================================================================

/// Username and password, for both registration and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = AuthService::new(state.store())
        .register(&body.username, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> Result<Json<LoginSession>, AppError> {
    let session = AuthService::new(state.store())
        .login(&body.username, &body.password)
        .await?;
    Ok(Json(session))
}

async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<User>>, AppError> {
    let users = AuthService::new(state.store())
        .list_users(&user.actor())
        .await?;
    Ok(Json(users))
}
