use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use pulsewatch_model::Check;

use crate::error::{ApiError, ApiResult};
use crate::routes::util::{parse_id, parse_name_regex};
use crate::state::ApiState;

/// `GET /api/checks?name=...&tag=...` (§6).
pub async fn search(
    State(state): State<ApiState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Vec<Check>>> {
    let name_regex = parse_name_regex(&params)?;
    let tag = params.get("tag").map(String::as_str);
    let checks = state.repo().search_checks(name_regex.as_ref(), tag).await?;
    Ok(Json(checks))
}

pub async fn create(
    State(state): State<ApiState>,
    Json(mut check): Json<Check>,
) -> ApiResult<impl IntoResponse> {
    check.validate_params().map_err(|err| ApiError::bad_request(err.to_string()))?;
    check.id = pulsewatch_ids::Id::new();
    check.modified = chrono::Utc::now();
    state.repo().create_check(check.clone()).await?;
    Ok((StatusCode::CREATED, Json(check)))
}

pub async fn get(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<Check>> {
    let id = parse_id(&id)?;
    Ok(Json(state.repo().find_check(id).await?))
}

pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(mut check): Json<Check>,
) -> ApiResult<Json<Check>> {
    let id = parse_id(&id)?;
    if check.id != id {
        return Err(ApiError::bad_request("path id does not match body id"));
    }
    check.validate_params().map_err(|err| ApiError::bad_request(err.to_string()))?;
    check.modified = chrono::Utc::now();
    state.repo().update_check(check.clone()).await?;
    Ok(Json(check))
}

pub async fn delete(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.repo().delete_check(id).await?;
    pulsewatch_cleanup::spawn_cleanup(
        state.repo_arc(),
        pulsewatch_cleanup::CleanupJob::CheckDeleted { check_id: id },
    );
    Ok(StatusCode::NO_CONTENT)
}
