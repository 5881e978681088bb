use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use pulsewatch_model::Subject;

use crate::error::{ApiError, ApiResult};
use crate::routes::util::{parse_id, parse_name_regex};
use crate::state::ApiState;

/// `GET /api/subjects?name=...&role=...` (§6).
pub async fn search(
    State(state): State<ApiState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Vec<Subject>>> {
    let name_regex = parse_name_regex(&params)?;
    let role = params.get("role").map(String::as_str);
    let subjects = state.repo().search_subjects(name_regex.as_ref(), role).await?;
    Ok(Json(subjects))
}

/// `POST /api/subjects`: the body carries the new subject's name and roles;
/// `id`/`modified` are assigned here regardless of what the caller sent.
pub async fn create(
    State(state): State<ApiState>,
    Json(mut subject): Json<Subject>,
) -> ApiResult<impl IntoResponse> {
    subject.id = pulsewatch_ids::Id::new();
    subject.modified = chrono::Utc::now();
    state.repo().create_subject(subject.clone()).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

pub async fn get(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<Subject>> {
    let id = parse_id(&id)?;
    Ok(Json(state.repo().find_subject(id).await?))
}

/// `PUT /api/subjects/{id}`: the path id wins over any id in the body.
pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(mut subject): Json<Subject>,
) -> ApiResult<Json<Subject>> {
    let id = parse_id(&id)?;
    if subject.id != id {
        return Err(ApiError::bad_request("path id does not match body id"));
    }
    subject.modified = chrono::Utc::now();
    state.repo().update_subject(subject.clone()).await?;
    Ok(Json(subject))
}

pub async fn delete(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.repo().delete_subject(id).await?;
    pulsewatch_cleanup::spawn_cleanup(
        state.repo_arc(),
        pulsewatch_cleanup::CleanupJob::SubjectDeleted { subject_id: id },
    );
    Ok(StatusCode::NO_CONTENT)
}
