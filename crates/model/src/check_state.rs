use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::check::CheckKind;
use crate::CheckStatus;
use pulsewatch_ids::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectCheckId {
    pub subject_id: Id,
    pub check_id: Id,
}

impl SubjectCheckId {
    pub fn new(subject_id: Id, check_id: Id) -> Self {
        Self {
            subject_id,
            check_id,
        }
    }
}

/// The current status of one (subject, check) pair.
///
/// Invariant: when `status` is `Ok`, `reminders` is empty (enforced by
/// [`CheckState::clear_reminders_if_ok`], called at every mutation site).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckState {
    pub id: SubjectCheckId,
    pub status_changed: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub status: CheckStatus,
    pub roles: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub kind: CheckKind,
    pub owner: Option<Id>,
    /// alert id -> last-reminder timestamp
    pub reminders: BTreeMap<Id, DateTime<Utc>>,
}

impl CheckState {
    pub fn new(
        id: SubjectCheckId,
        kind: CheckKind,
        roles: BTreeSet<String>,
        tags: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status_changed: now,
            updated: now,
            status: CheckStatus::None,
            roles,
            tags,
            kind,
            owner: None,
            reminders: BTreeMap::new(),
        }
    }

    pub fn clear_reminders_if_ok(&mut self) {
        if matches!(self.status, CheckStatus::Ok) {
            self.reminders.clear();
        }
    }
}
