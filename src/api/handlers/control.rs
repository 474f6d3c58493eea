use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::config::StoreBackend;
use crate::AppState;

/// POST /api/control/stop: Pause signal propagation.
pub async fn stop(State(state): State<AppState>) -> impl IntoResponse {
    state.pause_flag.store(true, Ordering::Relaxed);
    tracing::warn!("Propagation PAUSED via control API");
    (StatusCode::OK, Json(json!({ "status": "paused" })))
}

/// POST /api/control/resume: Resume signal propagation.
pub async fn resume(State(state): State<AppState>) -> impl IntoResponse {
    state.pause_flag.store(false, Ordering::Relaxed);
    tracing::info!("Propagation RESUMED via control API");
    (StatusCode::OK, Json(json!({ "status": "running" })))
}

/// GET /api/control/status: Current system status.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let paused = state.pause_flag.load(Ordering::Relaxed);
    let mode = if state.config.trading_engine_url.is_none() {
        "dry_run"
    } else {
        "live"
    };
    let store = match state.config.store_backend {
        StoreBackend::Postgres => "postgres",
        StoreBackend::Memory => "memory",
    };

    Json(json!({
        "mode": mode,
        "paused": paused,
        "propagation_enabled": state.config.propagation_enabled,
        "store": store,
        "ledger": if state.config.wallet_service_url.is_some() { "wallet_service" } else { "in_memory" },
    }))
}
