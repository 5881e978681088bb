use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use pulsewatch_model::Period;

use crate::error::{ApiError, ApiResult};
use crate::routes::util::{parse_id, parse_name_regex};
use crate::state::ApiState;

/// `GET /api/periods?name=...&tag=...` (§6).
pub async fn search(
    State(state): State<ApiState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Vec<Period>>> {
    let name_regex = parse_name_regex(&params)?;
    let tag = params.get("tag").map(String::as_str);
    let periods = state.repo().search_periods(name_regex.as_ref(), tag).await?;
    Ok(Json(periods))
}

pub async fn create(
    State(state): State<ApiState>,
    Json(mut period): Json<Period>,
) -> ApiResult<impl IntoResponse> {
    period.id = pulsewatch_ids::Id::new();
    period.modified = chrono::Utc::now();
    state.repo().create_period(period.clone()).await?;
    Ok((StatusCode::CREATED, Json(period)))
}

pub async fn get(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<Period>> {
    let id = parse_id(&id)?;
    Ok(Json(state.repo().find_period(id).await?))
}

pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(mut period): Json<Period>,
) -> ApiResult<Json<Period>> {
    let id = parse_id(&id)?;
    if period.id != id {
        return Err(ApiError::bad_request("path id does not match body id"));
    }
    period.modified = chrono::Utc::now();
    state.repo().update_period(period.clone()).await?;
    Ok(Json(period))
}

pub async fn delete(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.repo().delete_period(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
