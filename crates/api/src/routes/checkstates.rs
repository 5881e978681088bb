use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use pulsewatch_model::{CheckState, CheckStatus};

use crate::error::ApiResult;
use crate::routes::util::csv_param;
use crate::state::ApiState;

#[derive(Serialize)]
pub struct CheckStateResponse {
    #[serde(flatten)]
    state: CheckState,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    check_name: Option<String>,
}

fn default_statuses() -> Vec<CheckStatus> {
    vec![CheckStatus::Ok, CheckStatus::Warning, CheckStatus::Critical]
}

/// `GET /api/checkstates?status=1,2,3&role=r&detail=1` (§6): reverse-sorted
/// by (status desc, status_changed asc); `detail` joins subject+check name.
pub async fn list(
    State(state): State<ApiState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Vec<CheckStateResponse>>> {
    let raw_statuses = csv_param(&params, "status");
    let statuses = if raw_statuses.is_empty() {
        default_statuses()
    } else {
        raw_statuses
            .iter()
            .filter_map(|s| s.parse::<i32>().ok())
            .filter_map(CheckStatus::from_rank)
            .collect()
    };
    let role = params.get("role").map(String::as_str);
    let detail = params.get("detail").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);

    let mut states = state.repo().states_in_statuses_and_roles(&statuses, role).await?;
    states.sort_by(|a, b| {
        b.status
            .rank()
            .cmp(&a.status.rank())
            .then(a.status_changed.cmp(&b.status_changed))
    });

    let mut out = Vec::with_capacity(states.len());
    for s in states {
        let (subject_name, check_name) = if detail {
            let subject_name = state.repo().find_subject(s.id.subject_id).await.ok().map(|s| s.name);
            let check_name = state.repo().find_check(s.id.check_id).await.ok().map(|c| c.name);
            (subject_name, check_name)
        } else {
            (None, None)
        };
        out.push(CheckStateResponse { state: s, subject_name, check_name });
    }
    Ok(Json(out))
}
