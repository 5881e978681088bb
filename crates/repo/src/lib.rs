//! The repository interface (§4.8): the single capability bundle the core
//! requires from persistent storage. The document-store-backed production
//! implementation is an external collaborator and is not part of this crate;
//! [`memory::InMemoryRepository`] is the in-memory variant used by tests and
//! by the coordinator binary's standalone mode.

mod cache;
mod memory;

pub use cache::RequestCache;
pub use memory::InMemoryRepository;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;

use pulsewatch_ids::Id;
use pulsewatch_model::{
    Alert, Check, CheckKind, CheckResult, CheckState, CheckStatus, Period, PeriodKind, PeerId,
    Subject, SubjectCheckId,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Helper used throughout §4: a "not found" on a query is not an error, it's
/// an empty result.
pub fn not_found_is_empty<T>(result: RepoResult<T>) -> RepoResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RepoError::NotFound) => Ok(None),
        Err(other) => Err(other),
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    // ---- Subject ----
    async fn find_subject(&self, id: Id) -> RepoResult<Subject>;
    async fn find_subject_by_name(&self, name: &str) -> RepoResult<Subject>;
    async fn search_subjects(&self, name_regex: Option<&Regex>, role: Option<&str>) -> RepoResult<Vec<Subject>>;
    async fn subjects_by_roles(&self, roles: &[String]) -> RepoResult<Vec<Subject>>;
    async fn create_subject(&self, subject: Subject) -> RepoResult<()>;
    async fn update_subject(&self, subject: Subject) -> RepoResult<()>;
    async fn delete_subject(&self, id: Id) -> RepoResult<()>;
    async fn count_subjects(&self) -> RepoResult<u64>;
    async fn distinct_subject_roles(&self) -> RepoResult<Vec<String>>;
    /// Roles that co-occur on at least one subject that also carries `role`.
    async fn roles_shared_with(&self, role: &str) -> RepoResult<Vec<String>>;

    // ---- Check ----
    async fn find_check(&self, id: Id) -> RepoResult<Check>;
    async fn search_checks(&self, name_regex: Option<&Regex>, tag: Option<&str>) -> RepoResult<Vec<Check>>;
    async fn create_check(&self, check: Check) -> RepoResult<()>;
    async fn update_check(&self, check: Check) -> RepoResult<()>;
    async fn delete_check(&self, id: Id) -> RepoResult<()>;
    async fn checks_by_role_set(&self, roles: &[String]) -> RepoResult<Vec<Check>>;
    async fn checks_by_kind_set(&self, kinds: &[CheckKind]) -> RepoResult<Vec<Check>>;
    async fn checks_by_kind_set_and_role_set(&self, kinds: &[CheckKind], roles: &[String]) -> RepoResult<Vec<Check>>;
    async fn distinct_check_tags(&self) -> RepoResult<Vec<String>>;

    // ---- CheckResult ----
    async fn create_check_result(&self, result: CheckResult) -> RepoResult<()>;
    async fn delete_results_by_subject(&self, subject_id: Id) -> RepoResult<()>;
    async fn delete_results_by_check(&self, check_id: Id) -> RepoResult<()>;
    async fn delete_results_by_subject_check(&self, id: SubjectCheckId) -> RepoResult<()>;

    // ---- CheckState ----
    async fn find_state(&self, id: SubjectCheckId) -> RepoResult<CheckState>;
    async fn upsert_state(&self, state: CheckState) -> RepoResult<()>;
    async fn delete_state(&self, id: SubjectCheckId) -> RepoResult<()>;
    async fn delete_states_by_subject(&self, subject_id: Id) -> RepoResult<()>;
    async fn delete_states_by_check(&self, check_id: Id) -> RepoResult<()>;
    async fn states_for_owner(&self, owner: PeerId) -> RepoResult<Vec<CheckState>>;
    async fn states_for_kind_set(&self, kinds: &[CheckKind]) -> RepoResult<Vec<CheckState>>;
    /// Count of owned remote states, grouped by owning coordinator.
    async fn workload_by_owner(&self) -> RepoResult<BTreeMap<PeerId, u64>>;
    async fn states_in_statuses_and_roles(&self, statuses: &[CheckStatus], role: Option<&str>) -> RepoResult<Vec<CheckState>>;
    /// Distinct subjects (under `role`, if given) bucketed by their
    /// worst-status check, for the `/api/roles/{role}` summary endpoint.
    async fn subject_counts_by_worst_status(&self, role: Option<&str>) -> RepoResult<BTreeMap<CheckStatus, u64>>;

    // ---- Alert ----
    async fn find_alert(&self, id: Id) -> RepoResult<Alert>;
    async fn search_alerts(&self, name_regex: Option<&Regex>, tag: Option<&str>) -> RepoResult<Vec<Alert>>;
    async fn create_alert(&self, alert: Alert) -> RepoResult<()>;
    async fn update_alert(&self, alert: Alert) -> RepoResult<()>;
    async fn delete_alert(&self, id: Id) -> RepoResult<()>;
    async fn alerts_matching(&self, roles: &[String], tags: &[String]) -> RepoResult<Vec<Alert>>;

    // ---- Period ----
    async fn find_period(&self, id: Id) -> RepoResult<Period>;
    async fn search_periods(&self, name_regex: Option<&Regex>, tag: Option<&str>) -> RepoResult<Vec<Period>>;
    async fn create_period(&self, period: Period) -> RepoResult<()>;
    async fn update_period(&self, period: Period) -> RepoResult<()>;
    async fn delete_period(&self, id: Id) -> RepoResult<()>;
    /// Periods matching (subject, check-tags) under the given kinds. `None`
    /// matches any kind.
    async fn active_for_subject(
        &self,
        subject_id: Id,
        subject_roles: &BTreeSet<String>,
        check_tags: &BTreeSet<String>,
        now: DateTime<Utc>,
        kinds: Option<&[PeriodKind]>,
    ) -> RepoResult<Vec<Period>>;
    async fn active_by_type(&self, kind: PeriodKind, now: DateTime<Utc>) -> RepoResult<Vec<Period>>;

    // ---- Datastats ----
    async fn entity_counts(&self) -> RepoResult<BTreeMap<&'static str, u64>>;
}
