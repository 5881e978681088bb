use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulsewatch_ids::Id;

/// A monitored entity, auto-created on first agent check-in under a unique
/// name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: Id,
    pub name: String,
    pub roles: BTreeSet<String>,
    pub modified: DateTime<Utc>,
    pub last_check_in: Option<DateTime<Utc>>,
}

impl Subject {
    pub fn new(name: impl Into<String>, roles: BTreeSet<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Id::new(),
            name: name.into(),
            roles,
            modified: now,
            last_check_in: Some(now),
        }
    }

    /// Stamp a check-in at `now`, per §3: "updated on each check-in
    /// (last-check-in stamp only)". `modified` is intentionally left alone.
    pub fn record_check_in(&mut self, now: DateTime<Utc>) {
        self.last_check_in = Some(now);
    }
}
