use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// The only endpoints reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe; does not touch the stores.
        .route("/health", get(|| async { "ok" }))
        // POST /login
        // Issues a 24h session token in the `Authorization` response header.
        .route("/login", post(handlers::login))
        // POST /registration
        .route("/registration", post(handlers::register_user))
}
