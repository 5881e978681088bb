use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulsewatch_ids::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AlertKind {
    Exec,
    Email,
    PagerDuty,
    /// Test-only: firings are recorded into a process-wide observable set
    /// instead of being delivered.
    Mock,
}

/// A rule binding a delivery mechanism to a role+tag scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Id,
    pub name: String,
    pub kind: AlertKind,
    pub params: BTreeMap<String, String>,
    pub reminder_interval_minutes: i64,
    pub roles: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub modified: DateTime<Utc>,
}
