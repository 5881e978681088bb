use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use pulsewatch_model::Alert;

use crate::error::{ApiError, ApiResult};
use crate::routes::util::{parse_id, parse_name_regex};
use crate::state::ApiState;

/// `GET /api/alerts?name=...&tag=...` (§6).
pub async fn search(
    State(state): State<ApiState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Vec<Alert>>> {
    let name_regex = parse_name_regex(&params)?;
    let tag = params.get("tag").map(String::as_str);
    let alerts = state.repo().search_alerts(name_regex.as_ref(), tag).await?;
    Ok(Json(alerts))
}

pub async fn create(
    State(state): State<ApiState>,
    Json(mut alert): Json<Alert>,
) -> ApiResult<impl IntoResponse> {
    alert.id = pulsewatch_ids::Id::new();
    alert.modified = chrono::Utc::now();
    state.repo().create_alert(alert.clone()).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn get(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<Alert>> {
    let id = parse_id(&id)?;
    Ok(Json(state.repo().find_alert(id).await?))
}

pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(mut alert): Json<Alert>,
) -> ApiResult<Json<Alert>> {
    let id = parse_id(&id)?;
    if alert.id != id {
        return Err(ApiError::bad_request("path id does not match body id"));
    }
    alert.modified = chrono::Utc::now();
    state.repo().update_alert(alert.clone()).await?;
    Ok(Json(alert))
}

pub async fn delete(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.repo().delete_alert(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
