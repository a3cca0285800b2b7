//! Authentication middleware: bearer extraction, token verification and the
//! revocation check, all through [`wishlist_core::auth::gate`].

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;
use wishlist_core::auth::gate;
use wishlist_core::models::Identity;

use crate::AppState;
use crate::error::AppError;

/// Verified caller, stored in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

/// Axum middleware: runs the auth gate on `Authorization` and injects
/// [`AuthenticatedUser`] into request extensions. Never touches the store.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default());

    let identity = gate::authenticate(header, &state.issuer, &state.blacklist).map_err(|r| {
        debug!(reason = %r, path = %request.uri().path(), "rejected request");
        AppError::from(r)
    })?;

    request.extensions_mut().insert(AuthenticatedUser(identity));
    Ok(next.run(request).await)
}

/// Handlers take `AuthenticatedUser` as an argument. If the middleware did not
/// run for a route, extraction fails with 401 instead of running unauthenticated.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))
    }
}
