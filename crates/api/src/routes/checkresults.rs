use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use pulsewatch_model::CheckStatus;

use crate::error::ApiResult;
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct IngestCheckResult {
    #[serde(rename = "subjectId")]
    subject_id: pulsewatch_ids::Id,
    #[serde(rename = "checkId")]
    check_id: pulsewatch_ids::Id,
    timestamp: DateTime<Utc>,
    status: CheckStatus,
}

/// `POST /api/checkresults` (§6): ingest one result, running state transition
/// and alert evaluation inline.
pub async fn create(
    State(state): State<ApiState>,
    Json(body): Json<IngestCheckResult>,
) -> ApiResult<impl IntoResponse> {
    pulsewatch_alerting::record_result(
        state.repo(),
        state.sinks(),
        body.subject_id,
        body.check_id,
        body.timestamp,
        body.status,
    )
    .await?;
    Ok(StatusCode::ACCEPTED)
}
