use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use pulsewatch_model::CheckStatus;
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::ApiState;

/// `GET /api/roles` (§6): distinct subject roles.
pub async fn list(State(state): State<ApiState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.repo().distinct_subject_roles().await?))
}

#[derive(Serialize)]
pub struct RoleSummary {
    counts: BTreeMap<CheckStatus, u64>,
    #[serde(rename = "sharedRoles")]
    shared_roles: Vec<String>,
}

/// `GET /api/roles/{role}?sharedRole=s` (§6): per-role worst-status summary.
/// `sharedRole` is accepted for symmetry with the route table but the shared
/// set is always computed for the path role, not the query value.
pub async fn get(
    State(state): State<ApiState>,
    Path(role): Path<String>,
    Query(_params): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<RoleSummary>> {
    let counts = state.repo().subject_counts_by_worst_status(Some(&role)).await?;
    let shared_roles = state.repo().roles_shared_with(&role).await?;
    Ok(Json(RoleSummary { counts, shared_roles }))
}
