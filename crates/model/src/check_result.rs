use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::check_state::SubjectCheckId;
use crate::CheckStatus;
use pulsewatch_ids::Id;

/// An immutable check execution event. Create-only; bulk-deleted alongside
/// state cleanups (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: Id,
    pub subject_check: SubjectCheckId,
    pub timestamp: DateTime<Utc>,
    pub status: CheckStatus,
}

impl CheckResult {
    pub fn new(subject_id: Id, check_id: Id, timestamp: DateTime<Utc>, status: CheckStatus) -> Self {
        Self {
            id: Id::new(),
            subject_check: SubjectCheckId::new(subject_id, check_id),
            timestamp,
            status,
        }
    }
}
