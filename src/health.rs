//! Liveness endpoint for the hosting platform.

use axum::Router;
use axum::routing::get;

/// `GET /` and `GET /health` answer `200 OK`. The webhook route is
/// merged into the same router when webhook mode is enabled.
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(ok))
        .route("/health", get(ok))
}

async fn ok() -> &'static str {
    "OK"
}
