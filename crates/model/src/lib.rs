//! Entity definitions and cross-entity invariants for pulsewatch.
//!
//! Entities reference one another only by [`Id`]; joins are computed lazily
//! by callers (see `pulsewatch_agentconfig` and `pulsewatch_exec` for the
//! per-request cache that avoids refetching the same join twice).

mod alert;
mod check;
mod check_result;
mod check_state;
mod period;
mod peer;
mod subject;

pub use alert::{Alert, AlertKind};
pub use check::{Check, CheckKind};
pub use check_result::CheckResult;
pub use check_state::{CheckState, SubjectCheckId};
pub use period::{Period, PeriodKind};
pub use peer::PeerId;
pub use subject::Subject;

use std::collections::BTreeSet;

pub use pulsewatch_ids::Id;

/// Severity of one (subject, check) pair. Ordered `None < Ok < Warning <
/// Critical`; `Failed` is a distinct tag that sorts and alerts like
/// `Critical` but is never produced by a successful check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CheckStatus {
    None,
    Ok,
    Warning,
    Critical,
    Failed,
}

impl CheckStatus {
    /// Numeric rank used for ordering and for the `status=1,2,3` query
    /// parameter on `/api/checkstates`. `Failed` is represented as `-1`.
    pub fn rank(self) -> i32 {
        match self {
            CheckStatus::Failed => -1,
            CheckStatus::None => 0,
            CheckStatus::Ok => 1,
            CheckStatus::Warning => 2,
            CheckStatus::Critical => 3,
        }
    }

    pub fn from_rank(rank: i32) -> Option<Self> {
        match rank {
            -1 => Some(CheckStatus::Failed),
            0 => Some(CheckStatus::None),
            1 => Some(CheckStatus::Ok),
            2 => Some(CheckStatus::Warning),
            3 => Some(CheckStatus::Critical),
            _ => None,
        }
    }

    /// Operational severity used for alert/reassignment decisions: `Failed`
    /// behaves like `Critical` here even though its rank differs.
    pub fn severity(self) -> i32 {
        match self {
            CheckStatus::Failed => CheckStatus::Critical.rank(),
            other => other.rank(),
        }
    }

    pub fn is_at_most_ok(self) -> bool {
        matches!(self, CheckStatus::None | CheckStatus::Ok)
    }
}

impl PartialOrd for CheckStatus {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CheckStatus {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl Eq for CheckStatus {}

/// Role/tag set intersection used by [`Period::matches`]: an empty filter is
/// universal ("no restriction"); otherwise membership is set intersection.
pub fn filter_matches(filter: &BTreeSet<String>, subject_values: &BTreeSet<String>) -> bool {
    filter.is_empty() || filter.intersection(subject_values).next().is_some()
}

/// Check/alert applicability test (§4.8): membership is plain set
/// intersection, with no universal-on-empty case. A check or alert with an
/// empty role/tag filter matches nothing, not everything — otherwise
/// invariant #3 (`subject.roles ∩ check.roles ≠ ∅` at acceptance) would be
/// violated by any filter left unset.
pub fn applicability_matches(filter: &BTreeSet<String>, values: &BTreeSet<String>) -> bool {
    filter.intersection(values).next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordering() {
        assert!(CheckStatus::None < CheckStatus::Ok);
        assert!(CheckStatus::Ok < CheckStatus::Warning);
        assert!(CheckStatus::Warning < CheckStatus::Critical);
    }

    #[test]
    fn failed_has_negative_rank_but_critical_severity() {
        assert_eq!(CheckStatus::Failed.rank(), -1);
        assert_eq!(CheckStatus::Failed.severity(), CheckStatus::Critical.severity());
    }

    #[test]
    fn empty_filter_is_universal() {
        let empty = BTreeSet::new();
        let roles: BTreeSet<String> = ["default".into()].into_iter().collect();
        assert!(filter_matches(&empty, &roles));
    }

    #[test]
    fn non_overlapping_filter_does_not_match() {
        let filter: BTreeSet<String> = ["billing".into()].into_iter().collect();
        let roles: BTreeSet<String> = ["default".into()].into_iter().collect();
        assert!(!filter_matches(&filter, &roles));
    }

    #[test]
    fn empty_applicability_filter_matches_nothing() {
        let empty = BTreeSet::new();
        let roles: BTreeSet<String> = ["default".into()].into_iter().collect();
        assert!(!applicability_matches(&empty, &roles));
    }

    #[test]
    fn overlapping_applicability_filter_matches() {
        let filter: BTreeSet<String> = ["default".into()].into_iter().collect();
        let roles: BTreeSet<String> = ["default".into()].into_iter().collect();
        assert!(applicability_matches(&filter, &roles));
    }
}
