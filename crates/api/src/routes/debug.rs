//! `/api/debug/*` (§6): non-production diagnostics, only mounted in debug
//! builds or with the `debug-routes` feature (see `routes::mod::router`).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::ApiState;

/// `GET /api/debug/metrics`: Prometheus text exposition of process metrics.
pub async fn metrics(State(state): State<ApiState>) -> impl IntoResponse {
    match state.metrics() {
        Some(exporter) => (StatusCode::OK, exporter.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}

/// `GET /api/debug/peers`: the raw known/alive peer sets, unlike `/api/peers`
/// which only returns the merged endpoint map.
pub async fn peers(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let known = state.peers().known_peers().await;
    let alive = state.peers().alive_peers().await;
    Json(json!({
        "selfId": state.peers().self_id().to_string(),
        "known": known.into_iter().map(|(id, ep)| (id.to_string(), ep)).collect::<std::collections::BTreeMap<_, _>>(),
        "alive": alive.into_iter().map(|(id, ep)| (id.to_string(), ep)).collect::<std::collections::BTreeMap<_, _>>(),
        "leader": state.peers().is_leader().await,
    }))
}

/// `GET /api/debug/uptime`: seconds since this process bound the HTTP port.
pub async fn uptime(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(json!({ "uptimeSeconds": state.uptime_seconds() }))
}
