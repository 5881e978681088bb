use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;

use crate::state::ApiState;

/// `GET /api/peers?iam={uuid}&endpoint=host:port` (§6): registers the
/// caller as a known peer, then returns the full known set including self.
pub async fn get_peers(
    State(state): State<ApiState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<BTreeMap<String, String>> {
    if let (Some(iam), Some(endpoint)) = (params.get("iam"), params.get("endpoint")) {
        if let Ok(id) = iam.parse() {
            state.peers().add_peer_hint(id, endpoint.clone()).await;
        }
    }

    let mut known = state.peers().known_peers().await;
    known.insert(state.peers().self_id(), state.config().self_endpoint.clone());

    Json(
        known
            .into_iter()
            .map(|(id, endpoint)| (id.to_string(), endpoint))
            .collect::<BTreeMap<_, _>>(),
    )
}
