use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// `memory` or `redis`.
    pub cache: &'static str,
    pub payments_enabled: bool,
}

/// GET /health -- service, database and dependency status.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = studiora_db::health_check(&state.pool).await.is_ok();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        cache: state.cache.backend_name(),
        payments_enabled: state.payments.is_some(),
    })
}

/// Mount health check routes (root level, outside `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
