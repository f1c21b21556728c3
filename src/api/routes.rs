//! HTTP API route definitions.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    health, metrics, rates, ready, refresh, status, toggle_favorite, toggle_platform, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Scanner endpoints
        .route("/api/v1/rates", get(rates))
        .route("/api/v1/status", get(status))
        .route("/api/v1/refresh", post(refresh))
        .route("/api/v1/favorites/:asset", post(toggle_favorite))
        .route("/api/v1/platforms/:platform", post(toggle_platform))
        // Prometheus scrape endpoint
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
