//! HTTP server and routes.

pub(crate) mod handlers;
mod state;

pub use state::AppState;

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
///
/// Every path goes through the catalog resolver; only `GET` and `HEAD`
/// are accepted.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::serve_path))
        .route("/{*path}", get(handlers::serve_path))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
