use axum::extract::State;
use axum::Json;

use crate::error::ApiResult;
use crate::state::ApiState;

/// `GET /api/tags` (§6): distinct check tags.
pub async fn list(State(state): State<ApiState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.repo().distinct_check_tags().await?))
}
