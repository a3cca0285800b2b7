//! Authentication service: register/login/logout flows delegating to
//! `wishlist_core::auth`.

use std::sync::Arc;

use tracing::info;
use wishlist_core::auth::AuthError;
use wishlist_core::auth::jwt::IssuedToken;
use wishlist_core::auth::password::{self, DummyHash};
use wishlist_core::models::{Identity, Role, User};
use wishlist_core::store::StoreError;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{LogoutResponse, TokenResponse};

// ---------------------------------------------------------------------------
// Password hashing (off the async workers)
// ---------------------------------------------------------------------------

async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || password::hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hash task: {e}")))?
        .map_err(AppError::from)
}

async fn verify_password(
    password: &str,
    hash: Option<String>,
    dummy: Arc<DummyHash>,
) -> AppResult<bool> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => password::verify_password(&password, &hash),
        None => Ok(dummy.verify(&password)),
    })
    .await
    .map_err(|e| AppError::Internal(format!("verify task: {e}")))?
    .map_err(AppError::from)
}

fn token_response(user: &User, issued: IssuedToken) -> TokenResponse {
    TokenResponse {
        token: issued.token,
        user_id: user.id,
        name: user.name.clone(),
        role: user.role,
    }
}

fn require_credentials(name: &str, password: &str) -> Result<(), AuthError> {
    if name.is_empty() || password.trim().is_empty() {
        return Err(AuthError::ValidationError(
            "Name and password are required".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Register a new user and sign them in. The store gives the first user the
/// admin role.
pub async fn register(state: &AppState, name: &str, password: &str) -> AppResult<TokenResponse> {
    let name = name.trim();
    require_credentials(name, password)?;

    if state.store.find_user_by_name(name).await?.is_some() {
        return Err(AuthError::NameTaken.into());
    }

    let pw_hash = hash_password(password, state.config.bcrypt_cost).await?;

    let user = state
        .store
        .create_user(name, &pw_hash)
        .await
        .map_err(|e| match e {
            // Lost a race against a concurrent registration of the same name.
            StoreError::Conflict(_) => AppError::from(AuthError::NameTaken),
            other => AppError::from(other),
        })?;

    if user.role == Role::Admin {
        info!(user_id = user.id, "first user granted admin role");
    }
    info!(user_id = user.id, "registered user");

    let issued = state.issuer.issue(&user)?;
    Ok(token_response(&user, issued))
}

/// Authenticate with name + password. Unknown names and wrong passwords
/// produce the same error and cost the same bcrypt work.
pub async fn login(state: &AppState, name: &str, password: &str) -> AppResult<TokenResponse> {
    let name = name.trim();
    require_credentials(name, password)?;

    let row = state.store.find_user_by_name(name).await?;
    let hash = row.as_ref().map(|r| r.password_hash.clone());

    let verified = verify_password(password, hash, Arc::clone(&state.dummy_hash)).await?;
    let user = match row {
        Some(r) if verified => r.user,
        _ => {
            info!("login failed");
            return Err(AuthError::CredentialError.into());
        }
    };

    let issued = state.issuer.issue(&user)?;
    Ok(token_response(&user, issued))
}

/// Revoke the caller's current token. Other sessions stay valid.
pub fn logout(state: &AppState, identity: &Identity) -> LogoutResponse {
    state
        .blacklist
        .revoke(&identity.token_id, identity.expires_at);
    info!(user_id = identity.user_id, jti = %identity.token_id, "token revoked");
    LogoutResponse { success: true }
}
