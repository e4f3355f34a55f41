//! Top-level router.
//!
//! # Route Structure
//!
//! - `GET  /{code}`        - Short link redirect
//! - `GET  /health`        - Schema and store health
//! - `POST /api/shorten`   - Create a short URL
//!
//! Requests are traced and trailing slashes are trimmed before routing.

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Builds the application router.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let router = Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/health", get(health_handler))
        .nest("/api", api::routes::api_routes())
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
