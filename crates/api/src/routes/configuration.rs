use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pulsewatch_model::Check;

use crate::conditional::{expires_header, modified_header, not_modified, parse_if_modified_since};
use crate::error::ApiResult;
use crate::state::ApiState;

#[derive(Serialize)]
struct AgentConfigResponse {
    name: String,
    coordinators: Vec<String>,
    checks: Vec<Check>,
}

/// `GET /api/configuration/{name}?roles=r1,r2` (§6).
pub async fn get_configuration(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: axum::http::HeaderMap,
) -> ApiResult<Response> {
    let initial_roles = params.get("roles").map(|roles| {
        roles
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    });

    let now = chrono::Utc::now();
    let cached = pulsewatch_agentconfig::synthesize(
        state.repo(),
        state.peers(),
        &state.config().self_endpoint,
        &name,
        initial_roles,
        now,
    )
    .await?;

    let if_modified_since = parse_if_modified_since(&headers);
    if not_modified(cached.effective_modified, if_modified_since) {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        response
            .headers_mut()
            .insert(header::LAST_MODIFIED, modified_header(cached.effective_modified));
        return Ok(response);
    }

    let body = AgentConfigResponse {
        name: cached.value.name,
        coordinators: cached.value.coordinators,
        checks: cached.value.checks,
    };
    let mut response = Json(body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::LAST_MODIFIED, modified_header(cached.effective_modified));
    headers.insert(header::EXPIRES, expires_header(state.config().agent_update_interval));
    Ok(response)
}
