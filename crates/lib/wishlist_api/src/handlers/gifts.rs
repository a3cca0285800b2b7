//! Gift CRUD handlers. Mutations are owner-only; a stranger gets the same
//! 404 as for a gift that does not exist.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::info;
use wishlist_core::auth::policy;
use wishlist_core::models::{Gift, GiftFields};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{Json as JsonBody, Path};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{GiftReadDto, GiftWriteRequest};

fn gift_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Gift {id} not found"))
}

fn validated(body: GiftWriteRequest) -> AppResult<GiftFields> {
    let fields = body.into_fields();
    if fields.title.is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    Ok(fields)
}

async fn load_gift(state: &AppState, id: i64) -> AppResult<Gift> {
    state
        .store
        .get_gift(id)
        .await?
        .ok_or_else(|| gift_not_found(id))
}

/// `GET /gift`
pub async fn list_gifts_handler(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
) -> AppResult<Json<Vec<GiftReadDto>>> {
    let gifts = state.store.list_gifts().await?;
    Ok(Json(gifts.into_iter().map(GiftReadDto::from).collect()))
}

/// `GET /gift/{id}`
pub async fn get_gift_handler(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<GiftReadDto>> {
    Ok(Json(load_gift(&state, id).await?.into()))
}

/// `POST /gift`: the owner is always the caller.
pub async fn create_gift_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    JsonBody(body): JsonBody<GiftWriteRequest>,
) -> AppResult<(StatusCode, Json<GiftReadDto>)> {
    let fields = validated(body)?;
    let gift = state.store.create_gift(caller.user_id, &fields).await?;
    info!(user_id = caller.user_id, gift_id = gift.id, "gift created");
    Ok((StatusCode::CREATED, Json(gift.into())))
}

/// `PUT /gift/{id}`
pub async fn update_gift_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<GiftWriteRequest>,
) -> AppResult<StatusCode> {
    let gift = load_gift(&state, id).await?;
    policy::can_mutate_gift(&caller, &gift).map_err(|_| gift_not_found(id))?;
    let fields = validated(body)?;

    state
        .store
        .update_gift(id, &fields)
        .await?
        .ok_or_else(|| gift_not_found(id))?;
    info!(user_id = caller.user_id, gift_id = id, "gift updated");
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /gift/{id}`
pub async fn delete_gift_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let gift = load_gift(&state, id).await?;
    policy::can_mutate_gift(&caller, &gift).map_err(|_| gift_not_found(id))?;

    if !state.store.delete_gift(id).await? {
        return Err(gift_not_found(id));
    }
    info!(user_id = caller.user_id, gift_id = id, "gift deleted");
    Ok(StatusCode::NO_CONTENT)
}
