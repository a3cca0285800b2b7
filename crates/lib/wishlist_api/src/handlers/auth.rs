//! Authentication request handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::Json as JsonBody;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{LoginRequest, LogoutResponse, RegisterRequest, TokenResponse};
use crate::services::auth;

/// `POST /auth/register`: create an account and return a token for it.
pub async fn register_handler(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::register(&state, &body.name, &body.password).await?;
    Ok(Json(resp))
}

/// `POST /auth/login`: authenticate with name + password.
pub async fn login_handler(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(&state, &body.name, &body.password).await?;
    Ok(Json(resp))
}

/// `POST /auth/logout`: revoke the presented token.
pub async fn logout_handler(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> Json<LogoutResponse> {
    Json(auth::logout(&state, &identity))
}
