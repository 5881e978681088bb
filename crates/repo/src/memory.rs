//! In-memory [`Repository`] implementation.
//!
//! Grounded on the teacher's preference for a single lock-protected map per
//! resource (`server/gateway/src/rate_limit.rs` keeps its token buckets
//! behind a `parking_lot::Mutex`); each entity collection here gets its own
//! `parking_lot::RwLock<HashMap<..>>` so unrelated entities never contend.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use regex::Regex;

use pulsewatch_ids::Id;
use pulsewatch_model::{
    applicability_matches, filter_matches, Alert, Check, CheckKind, CheckResult, CheckState, CheckStatus, Period,
    PeriodKind, PeerId, Subject, SubjectCheckId,
};

use crate::{RepoError, RepoResult, Repository};

#[derive(Default)]
pub struct InMemoryRepository {
    subjects: RwLock<HashMap<Id, Subject>>,
    checks: RwLock<HashMap<Id, Check>>,
    results: RwLock<Vec<CheckResult>>,
    states: RwLock<HashMap<SubjectCheckId, CheckState>>,
    alerts: RwLock<HashMap<Id, Alert>>,
    periods: RwLock<HashMap<Id, Period>>,
}

impl InMemoryRepository {
    /// Mirrors the teacher's `open()/close()` context-factory shape (§4.8);
    /// an in-memory repository has nothing to open, so this just constructs.
    pub fn open() -> Self {
        Self::default()
    }
}

fn name_matches(regex: Option<&Regex>, name: &str) -> bool {
    regex.map(|re| re.is_match(name)).unwrap_or(true)
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_subject(&self, id: Id) -> RepoResult<Subject> {
        self.subjects.read().get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn find_subject_by_name(&self, name: &str) -> RepoResult<Subject> {
        self.subjects
            .read()
            .values()
            .find(|s| s.name == name)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn search_subjects(&self, name_regex: Option<&Regex>, role: Option<&str>) -> RepoResult<Vec<Subject>> {
        Ok(self
            .subjects
            .read()
            .values()
            .filter(|s| name_matches(name_regex, &s.name))
            .filter(|s| role.map(|r| s.roles.contains(r)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn subjects_by_roles(&self, roles: &[String]) -> RepoResult<Vec<Subject>> {
        let roles: std::collections::BTreeSet<String> = roles.iter().cloned().collect();
        Ok(self
            .subjects
            .read()
            .values()
            .filter(|s| filter_matches(&roles, &s.roles))
            .cloned()
            .collect())
    }

    async fn create_subject(&self, subject: Subject) -> RepoResult<()> {
        let mut subjects = self.subjects.write();
        if subjects.values().any(|s| s.name == subject.name) {
            return Err(RepoError::Conflict(format!("subject name {} already exists", subject.name)));
        }
        subjects.insert(subject.id, subject);
        Ok(())
    }

    async fn update_subject(&self, subject: Subject) -> RepoResult<()> {
        let mut subjects = self.subjects.write();
        if !subjects.contains_key(&subject.id) {
            return Err(RepoError::NotFound);
        }
        subjects.insert(subject.id, subject);
        Ok(())
    }

    async fn delete_subject(&self, id: Id) -> RepoResult<()> {
        self.subjects.write().remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    async fn count_subjects(&self) -> RepoResult<u64> {
        Ok(self.subjects.read().len() as u64)
    }

    async fn distinct_subject_roles(&self) -> RepoResult<Vec<String>> {
        let mut roles: Vec<String> = self
            .subjects
            .read()
            .values()
            .flat_map(|s| s.roles.iter().cloned())
            .collect();
        roles.sort();
        roles.dedup();
        Ok(roles)
    }

    async fn roles_shared_with(&self, role: &str) -> RepoResult<Vec<String>> {
        let subjects = self.subjects.read();
        let mut roles: Vec<String> = subjects
            .values()
            .filter(|s| s.roles.contains(role))
            .flat_map(|s| s.roles.iter().cloned())
            .filter(|r| r != role)
            .collect();
        roles.sort();
        roles.dedup();
        Ok(roles)
    }

    async fn find_check(&self, id: Id) -> RepoResult<Check> {
        self.checks.read().get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn search_checks(&self, name_regex: Option<&Regex>, tag: Option<&str>) -> RepoResult<Vec<Check>> {
        Ok(self
            .checks
            .read()
            .values()
            .filter(|c| name_matches(name_regex, &c.name))
            .filter(|c| tag.map(|t| c.tags.contains(t)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn create_check(&self, check: Check) -> RepoResult<()> {
        self.checks.write().insert(check.id, check);
        Ok(())
    }

    async fn update_check(&self, check: Check) -> RepoResult<()> {
        let mut checks = self.checks.write();
        if !checks.contains_key(&check.id) {
            return Err(RepoError::NotFound);
        }
        checks.insert(check.id, check);
        Ok(())
    }

    async fn delete_check(&self, id: Id) -> RepoResult<()> {
        self.checks.write().remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    async fn checks_by_role_set(&self, roles: &[String]) -> RepoResult<Vec<Check>> {
        let roles: std::collections::BTreeSet<String> = roles.iter().cloned().collect();
        Ok(self
            .checks
            .read()
            .values()
            .filter(|c| applicability_matches(&c.roles, &roles))
            .cloned()
            .collect())
    }

    async fn checks_by_kind_set(&self, kinds: &[CheckKind]) -> RepoResult<Vec<Check>> {
        Ok(self
            .checks
            .read()
            .values()
            .filter(|c| kinds.contains(&c.kind))
            .cloned()
            .collect())
    }

    async fn checks_by_kind_set_and_role_set(&self, kinds: &[CheckKind], roles: &[String]) -> RepoResult<Vec<Check>> {
        let roles: std::collections::BTreeSet<String> = roles.iter().cloned().collect();
        Ok(self
            .checks
            .read()
            .values()
            .filter(|c| kinds.contains(&c.kind) && applicability_matches(&c.roles, &roles))
            .cloned()
            .collect())
    }

    async fn distinct_check_tags(&self) -> RepoResult<Vec<String>> {
        let mut tags: Vec<String> = self
            .checks
            .read()
            .values()
            .flat_map(|c| c.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    async fn create_check_result(&self, result: CheckResult) -> RepoResult<()> {
        self.results.write().push(result);
        Ok(())
    }

    async fn delete_results_by_subject(&self, subject_id: Id) -> RepoResult<()> {
        self.results.write().retain(|r| r.subject_check.subject_id != subject_id);
        Ok(())
    }

    async fn delete_results_by_check(&self, check_id: Id) -> RepoResult<()> {
        self.results.write().retain(|r| r.subject_check.check_id != check_id);
        Ok(())
    }

    async fn delete_results_by_subject_check(&self, id: SubjectCheckId) -> RepoResult<()> {
        self.results.write().retain(|r| r.subject_check != id);
        Ok(())
    }

    async fn find_state(&self, id: SubjectCheckId) -> RepoResult<CheckState> {
        self.states.read().get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn upsert_state(&self, state: CheckState) -> RepoResult<()> {
        self.states.write().insert(state.id, state);
        Ok(())
    }

    async fn delete_state(&self, id: SubjectCheckId) -> RepoResult<()> {
        self.states.write().remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    async fn delete_states_by_subject(&self, subject_id: Id) -> RepoResult<()> {
        self.states.write().retain(|id, _| id.subject_id != subject_id);
        Ok(())
    }

    async fn delete_states_by_check(&self, check_id: Id) -> RepoResult<()> {
        self.states.write().retain(|id, _| id.check_id != check_id);
        Ok(())
    }

    async fn states_for_owner(&self, owner: PeerId) -> RepoResult<Vec<CheckState>> {
        Ok(self
            .states
            .read()
            .values()
            .filter(|s| s.owner == Some(owner))
            .cloned()
            .collect())
    }

    async fn states_for_kind_set(&self, kinds: &[CheckKind]) -> RepoResult<Vec<CheckState>> {
        Ok(self
            .states
            .read()
            .values()
            .filter(|s| kinds.contains(&s.kind))
            .cloned()
            .collect())
    }

    async fn workload_by_owner(&self) -> RepoResult<BTreeMap<PeerId, u64>> {
        let mut load = BTreeMap::new();
        for state in self.states.read().values() {
            if let Some(owner) = state.owner {
                *load.entry(owner).or_insert(0) += 1;
            }
        }
        Ok(load)
    }

    async fn states_in_statuses_and_roles(&self, statuses: &[CheckStatus], role: Option<&str>) -> RepoResult<Vec<CheckState>> {
        Ok(self
            .states
            .read()
            .values()
            .filter(|s| statuses.iter().any(|st| st.rank() == s.status.rank()))
            .filter(|s| role.map(|r| s.roles.contains(r)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn subject_counts_by_worst_status(&self, role: Option<&str>) -> RepoResult<BTreeMap<CheckStatus, u64>> {
        let states = self.states.read();
        let mut worst_by_subject: HashMap<Id, CheckStatus> = HashMap::new();
        for state in states.values() {
            if let Some(role) = role {
                if !state.roles.contains(role) {
                    continue;
                }
            }
            let entry = worst_by_subject.entry(state.id.subject_id).or_insert(CheckStatus::None);
            if state.status > *entry {
                *entry = state.status;
            }
        }
        let mut counts = BTreeMap::new();
        for status in worst_by_subject.into_values() {
            *counts.entry(status).or_insert(0u64) += 1;
        }
        Ok(counts)
    }

    async fn find_alert(&self, id: Id) -> RepoResult<Alert> {
        self.alerts.read().get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn search_alerts(&self, name_regex: Option<&Regex>, tag: Option<&str>) -> RepoResult<Vec<Alert>> {
        Ok(self
            .alerts
            .read()
            .values()
            .filter(|a| name_matches(name_regex, &a.name))
            .filter(|a| tag.map(|t| a.tags.contains(t)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn create_alert(&self, alert: Alert) -> RepoResult<()> {
        self.alerts.write().insert(alert.id, alert);
        Ok(())
    }

    async fn update_alert(&self, alert: Alert) -> RepoResult<()> {
        let mut alerts = self.alerts.write();
        if !alerts.contains_key(&alert.id) {
            return Err(RepoError::NotFound);
        }
        alerts.insert(alert.id, alert);
        Ok(())
    }

    async fn delete_alert(&self, id: Id) -> RepoResult<()> {
        self.alerts.write().remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    async fn alerts_matching(&self, roles: &[String], tags: &[String]) -> RepoResult<Vec<Alert>> {
        let roles: std::collections::BTreeSet<String> = roles.iter().cloned().collect();
        let tags: std::collections::BTreeSet<String> = tags.iter().cloned().collect();
        Ok(self
            .alerts
            .read()
            .values()
            .filter(|a| applicability_matches(&a.roles, &roles) && applicability_matches(&a.tags, &tags))
            .cloned()
            .collect())
    }

    async fn find_period(&self, id: Id) -> RepoResult<Period> {
        self.periods.read().get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn search_periods(&self, name_regex: Option<&Regex>, tag: Option<&str>) -> RepoResult<Vec<Period>> {
        Ok(self
            .periods
            .read()
            .values()
            .filter(|p| name_matches(name_regex, &p.name))
            .filter(|p| tag.map(|t| p.tags.contains(t)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn create_period(&self, period: Period) -> RepoResult<()> {
        self.periods.write().insert(period.id, period);
        Ok(())
    }

    async fn update_period(&self, period: Period) -> RepoResult<()> {
        let mut periods = self.periods.write();
        if !periods.contains_key(&period.id) {
            return Err(RepoError::NotFound);
        }
        periods.insert(period.id, period);
        Ok(())
    }

    async fn delete_period(&self, id: Id) -> RepoResult<()> {
        self.periods.write().remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    async fn active_for_subject(
        &self,
        subject_id: Id,
        subject_roles: &std::collections::BTreeSet<String>,
        check_tags: &std::collections::BTreeSet<String>,
        now: DateTime<Utc>,
        kinds: Option<&[PeriodKind]>,
    ) -> RepoResult<Vec<Period>> {
        Ok(self
            .periods
            .read()
            .values()
            .filter(|p| p.is_active(now))
            .filter(|p| kinds.map(|ks| ks.contains(&p.kind)).unwrap_or(true))
            .filter(|p| p.matches(subject_id, subject_roles, check_tags))
            .cloned()
            .collect())
    }

    async fn active_by_type(&self, kind: PeriodKind, now: DateTime<Utc>) -> RepoResult<Vec<Period>> {
        Ok(self
            .periods
            .read()
            .values()
            .filter(|p| p.kind == kind && p.is_active(now))
            .cloned()
            .collect())
    }

    async fn entity_counts(&self) -> RepoResult<BTreeMap<&'static str, u64>> {
        let mut counts = BTreeMap::new();
        counts.insert("subjects", self.subjects.read().len() as u64);
        counts.insert("checks", self.checks.read().len() as u64);
        counts.insert("checkResults", self.results.read().len() as u64);
        counts.insert("checkStates", self.states.read().len() as u64);
        counts.insert("alerts", self.alerts.read().len() as u64);
        counts.insert("periods", self.periods.read().len() as u64);
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn subject(name: &str, roles: &[&str]) -> Subject {
        Subject::new(name, roles.iter().map(|r| r.to_string()).collect(), Utc::now())
    }

    #[tokio::test]
    async fn create_subject_rejects_duplicate_name() {
        let repo = InMemoryRepository::open();
        repo.create_subject(subject("host42", &["default"])).await.unwrap();
        let err = repo
            .create_subject(subject("host42", &["default"]))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_subject_by_name_round_trips() {
        let repo = InMemoryRepository::open();
        let s = subject("host42", &["default"]);
        let id = s.id;
        repo.create_subject(s).await.unwrap();
        let found = repo.find_subject_by_name("host42").await.unwrap();
        assert_eq!(found.id, id);
    }

    #[tokio::test]
    async fn workload_by_owner_counts_remote_states() {
        let repo = InMemoryRepository::open();
        let owner = Id::new();
        let mut state = CheckState::new(
            SubjectCheckId::new(Id::new(), Id::new()),
            CheckKind::AgentDown,
            BTreeSet::new(),
            BTreeSet::new(),
            Utc::now(),
        );
        state.owner = Some(owner);
        repo.upsert_state(state).await.unwrap();
        let load = repo.workload_by_owner().await.unwrap();
        assert_eq!(load.get(&owner), Some(&1));
    }

    #[tokio::test]
    async fn deleting_subject_does_not_auto_delete_states() {
        // Cleanup is a deliberate, separate step (§4.7); the repository layer
        // never cascades on its own.
        let repo = InMemoryRepository::open();
        let s = subject("host42", &["default"]);
        let subject_id = s.id;
        repo.create_subject(s).await.unwrap();
        let state = CheckState::new(
            SubjectCheckId::new(subject_id, Id::new()),
            CheckKind::Http,
            BTreeSet::new(),
            BTreeSet::new(),
            Utc::now(),
        );
        let sc_id = state.id;
        repo.upsert_state(state).await.unwrap();
        repo.delete_subject(subject_id).await.unwrap();
        assert!(repo.find_state(sc_id).await.is_ok());
    }
}
