//! # wishlist_api
//!
//! HTTP API library for the gift registry.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wishlist_core::auth::AuthError;
use wishlist_core::auth::blacklist::TokenBlacklist;
use wishlist_core::auth::jwt::TokenIssuer;
use wishlist_core::auth::password::DummyHash;
use wishlist_core::store::WishlistStore;

use crate::config::ApiConfig;
use crate::handlers::{auth, gifts, health, users, volunteers};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Users, gifts and claims.
    pub store: Arc<dyn WishlistStore>,
    /// API configuration.
    pub config: ApiConfig,
    pub issuer: Arc<TokenIssuer>,
    /// Revoked token ids, shared by every request.
    pub blacklist: Arc<TokenBlacklist>,
    /// Verified against for unknown login names, at `config.bcrypt_cost`.
    pub dummy_hash: Arc<DummyHash>,
}

impl AppState {
    /// Build state with a fresh blacklist. Fails if the signing settings or
    /// the bcrypt cost are unusable.
    pub fn new(store: Arc<dyn WishlistStore>, config: ApiConfig) -> Result<Self, AuthError> {
        Self::with_blacklist(store, config, Arc::new(TokenBlacklist::new()))
    }

    pub fn with_blacklist(
        store: Arc<dyn WishlistStore>,
        config: ApiConfig,
        blacklist: Arc<TokenBlacklist>,
    ) -> Result<Self, AuthError> {
        let issuer = Arc::new(TokenIssuer::new(&config.jwt)?);
        let dummy_hash = Arc::new(DummyHash::new(config.bcrypt_cost)?);
        Ok(Self {
            store,
            config,
            issuer,
            blacklist,
            dummy_hash,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `wishlist_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    wishlist_core::migrate::migrate(pool).await
}

/// CORS for the configured origins, or `None` when no origin is allowed.
fn cors_layer(config: &ApiConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    if origins.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Builds the Axum router with all routes and shared state.
///
/// Only the routes in `public` skip the auth gate; everything else goes
/// through [`middleware::auth::require_auth`].
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/users", get(users::list_users_handler))
        .route(
            "/users/{id}",
            get(users::get_user_handler)
                .put(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route("/users/{id}/wishlist", get(users::get_wishlist_handler))
        .route(
            "/gift",
            get(gifts::list_gifts_handler).post(gifts::create_gift_handler),
        )
        .route(
            "/gift/{id}",
            get(gifts::get_gift_handler)
                .put(gifts::update_gift_handler)
                .delete(gifts::delete_gift_handler),
        )
        .route(
            "/volunteers",
            get(volunteers::list_claims_handler).post(volunteers::create_claim_handler),
        )
        .route(
            "/volunteers/{id}",
            get(volunteers::get_claim_handler).delete(volunteers::delete_claim_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let mut app = Router::new().merge(public).merge(protected);
    if let Some(cors) = cors_layer(&state.config) {
        app = app.layer(cors);
    }
    app.layer(TraceLayer::new_for_http()).with_state(state)
}
