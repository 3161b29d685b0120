use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::posts;

/// 50 MB upload limit
const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Assemble the API: public auth endpoints plus the bearer-guarded
/// upload/feed/post surface.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/jwt/login", post(auth::login))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/me", get(auth::me))
        .route("/users/me", delete(auth::delete_me))
        .route("/upload", post(posts::upload))
        .route("/feed", get(posts::feed))
        .route("/posts/{id}", delete(posts::delete_post))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
}

async fn health() -> &'static str {
    "ok"
}
