//! HTTP API handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::info;

use crate::exchange::Platform;
use crate::scanner::{Scanner, ScannerStatus};
use crate::screener::QueryParams;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// The scanner serving queries and refreshes.
    pub scanner: Arc<Scanner>,
    /// Prometheus render handle, absent when the exporter is not installed.
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// State without a metrics exporter.
    pub fn new(scanner: Arc<Scanner>) -> Self {
        Self {
            scanner,
            metrics_handle: None,
        }
    }

    /// Attach a Prometheus render handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether at least one snapshot has landed.
    pub ready: bool,
    /// Timestamp of the freshest snapshot, if any.
    pub last_updated: Option<String>,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Scanner state, flattened in.
    #[serde(flatten)]
    pub scanner: ScannerStatus,
}

/// Refresh acknowledgement.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// Status: "refreshing".
    pub status: &'static str,
}

/// Favorite toggle response.
#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    /// Canonical asset name.
    pub asset: String,
    /// Whether the asset is now a favorite.
    pub favorite: bool,
}

/// Platform toggle response.
#[derive(Debug, Serialize)]
pub struct PlatformResponse {
    /// The platform that was toggled.
    pub platform: Platform,
    /// Whether the platform is now selected.
    pub selected: bool,
}

/// Error payload for 4xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error.
    pub error: String,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - 200 once a snapshot has landed, 503 before.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.scanner.status().await;
    let is_ready = status.last_updated.is_some();

    let response = ReadyResponse {
        ready: is_ready,
        last_updated: status.last_updated,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Rates handler - one screened, ranked, paginated page.
pub async fn rates(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> impl IntoResponse {
    Json(state.scanner.page(&params).await)
}

/// Status handler - per-source fetch state and scanner totals.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let scanner = state.scanner.status().await;
    let status = if scanner.last_updated.is_some() {
        "running"
    } else {
        "starting"
    };

    Json(StatusResponse { status, scanner })
}

/// Refresh handler - kicks off a refresh of all selected sources.
pub async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    info!("Manual refresh requested");
    let scanner = Arc::clone(&state.scanner);
    tokio::spawn(async move { scanner.refresh_all().await });

    (
        StatusCode::ACCEPTED,
        Json(RefreshResponse {
            status: "refreshing",
        }),
    )
}

/// Favorite toggle handler.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(asset): Path<String>,
) -> impl IntoResponse {
    let favorite = state.scanner.toggle_favorite(&asset).await;
    Json(FavoriteResponse {
        asset: crate::rates::canonicalize(&asset),
        favorite,
    })
}

/// Platform toggle handler - 404 for unknown or unconfigured platforms.
pub async fn toggle_platform(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> impl IntoResponse {
    let Ok(parsed) = Platform::from_str(&platform) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("unknown platform: {platform}"),
            }),
        )
            .into_response();
    };

    match state.scanner.toggle_platform(parsed).await {
        Some(selected) => Json(PlatformResponse {
            platform: parsed,
            selected,
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("platform not configured: {platform}"),
            }),
        )
            .into_response(),
    }
}

/// Prometheus metrics handler - 503 when no exporter is installed.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics_handle {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics exporter not installed\n",
        )
            .into_response(),
    }
}
