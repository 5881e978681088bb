use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::bytesize::format_bytes;
use crate::conditional::expires_header;
use crate::error::ApiResult;
use crate::state::ApiState;

pub async fn up(State(state): State<ApiState>) -> Response {
    let mut response = Json(json!(true)).into_response();
    response
        .headers_mut()
        .insert(header::EXPIRES, expires_header(state.config().peer_check_interval));
    response
}

#[derive(Serialize)]
struct InfoResponse {
    id: String,
    version: String,
    build: String,
    #[serde(rename = "apiVersion")]
    api_version: u32,
    leader: bool,
}

pub async fn info(State(state): State<ApiState>) -> Json<InfoResponse> {
    let leader = state.peers().is_leader().await;
    let config = state.config();
    Json(InfoResponse {
        id: config.self_id.to_string(),
        version: config.version.clone(),
        build: config.build.clone(),
        api_version: config.api_version,
        leader,
    })
}

#[derive(Serialize)]
struct DataStatsResponse {
    counts: std::collections::BTreeMap<&'static str, u64>,
    #[serde(rename = "approximateStorageSize")]
    approximate_storage_size: String,
}

/// Average bytes assumed per persisted record, used only to produce a
/// human-readable order-of-magnitude estimate; the real backend reports its
/// own storage size.
const AVG_RECORD_BYTES: u64 = 256;

pub async fn datastats(State(state): State<ApiState>) -> ApiResult<Json<DataStatsResponse>> {
    let counts = state.repo().entity_counts().await?;
    let total: u64 = counts.values().sum();
    Ok(Json(DataStatsResponse {
        counts,
        approximate_storage_size: format_bytes(total * AVG_RECORD_BYTES),
    }))
}

