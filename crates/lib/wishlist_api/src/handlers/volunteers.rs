//! Claim ("volunteer") handlers. Callers only ever see their own claims.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::info;
use wishlist_core::auth::policy;
use wishlist_core::models::{Claim, Identity};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{Json as JsonBody, Path};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{VolunteerCreateRequest, VolunteerReadDto};

fn claim_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Volunteer record {id} not found"))
}

/// `GET /volunteers`: the caller's claims.
pub async fn list_claims_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<Vec<VolunteerReadDto>>> {
    let claims = state.store.list_claims_for(caller.user_id).await?;
    Ok(Json(claims.into_iter().map(VolunteerReadDto::from).collect()))
}

/// `GET /volunteers/{id}`
pub async fn get_claim_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<VolunteerReadDto>> {
    let claim = own_claim(&state, &caller, id).await?;
    Ok(Json(claim.into()))
}

/// `POST /volunteers`: claim a gift for the caller.
///
/// The taken flag is checked here for a friendly error, but the store's
/// one-claim-per-gift guard is what decides a race.
pub async fn create_claim_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    JsonBody(body): JsonBody<VolunteerCreateRequest>,
) -> AppResult<(StatusCode, Json<VolunteerReadDto>)> {
    let gift_id = body.gift_id;
    let gift = state
        .store
        .get_gift(gift_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Gift {gift_id} not found")))?;

    if !policy::can_claim_gift(&caller, &gift) {
        return Err(AppError::Validation(
            "You cannot volunteer for your own gift".into(),
        ));
    }
    if gift.is_taken {
        return Err(AppError::Conflict(format!("Gift {gift_id} is already taken")));
    }

    let claim = state.store.create_claim(gift_id, caller.user_id).await?;
    info!(user_id = caller.user_id, gift_id, claim_id = claim.id, "gift claimed");
    Ok((StatusCode::CREATED, Json(claim.into())))
}

/// `DELETE /volunteers/{id}`: release a claim; the gift becomes claimable again.
pub async fn delete_claim_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let claim = own_claim(&state, &caller, id).await?;
    if !state.store.delete_claim(id, caller.user_id).await? {
        return Err(claim_not_found(id));
    }
    info!(user_id = caller.user_id, gift_id = claim.gift_id, claim_id = id, "claim released");
    Ok(StatusCode::NO_CONTENT)
}

async fn own_claim(
    state: &AppState,
    caller: &Identity,
    id: i64,
) -> AppResult<Claim> {
    let claim = state
        .store
        .get_claim(id)
        .await?
        .ok_or_else(|| claim_not_found(id))?;
    policy::can_access_claim(caller, &claim).map_err(|_| claim_not_found(id))?;
    Ok(claim)
}
