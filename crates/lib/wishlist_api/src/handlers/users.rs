//! User directory and administration handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::info;
use wishlist_core::auth::policy;
use wishlist_core::models::Role;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{Json as JsonBody, Path};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{GiftReadDto, UserDetailDto, UserReadDto, UserUpdateRequest, UserWishlistReadDto};

fn user_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("User {id} not found"))
}

/// `GET /users`
pub async fn list_users_handler(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
) -> AppResult<Json<Vec<UserReadDto>>> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(UserReadDto::from).collect()))
}

/// `GET /users/{id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<UserReadDto>> {
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(user.into()))
}

/// `GET /users/{id}/wishlist`: a user's gifts with the taken flag only.
pub async fn get_wishlist_handler(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<UserWishlistReadDto>> {
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    let gifts = state.store.list_gifts_for_owner(id).await?;
    Ok(Json(UserWishlistReadDto {
        id: user.id,
        name: user.name,
        gifts: gifts.into_iter().map(GiftReadDto::from).collect(),
    }))
}

/// `PUT /users/{id}`: admin only. Omitted fields keep their current value.
pub async fn update_user_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<UserUpdateRequest>,
) -> AppResult<Json<UserDetailDto>> {
    policy::can_administer_users(&caller)?;

    let name = match body.name.as_deref().map(str::trim) {
        Some("") => return Err(AppError::Validation("Name must not be blank".into())),
        other => other.map(String::from),
    };
    let role = body
        .role
        .as_deref()
        .map(str::parse::<Role>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let current = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    let name = name.unwrap_or(current.name);
    let role = role.unwrap_or(current.role);

    let updated = state
        .store
        .update_user(id, &name, role)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    info!(admin_id = caller.user_id, user_id = id, role = %updated.role, "user updated");
    Ok(Json(updated.into()))
}

/// `DELETE /users/{id}`: admin only.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    policy::can_administer_users(&caller)?;

    if !state.store.delete_user(id).await? {
        return Err(user_not_found(id));
    }
    info!(admin_id = caller.user_id, user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
