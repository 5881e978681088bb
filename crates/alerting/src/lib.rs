//! Result ingestion, state transition, and alert evaluation (§4.5, §4.6).
//!
//! Per the reconciled Open Question on the reminder race (spec §9), ingestion
//! and evaluation are merged into one function that loads the check state
//! exactly once and performs exactly one upsert carrying both the status
//! transition and any reminder-timestamp updates.

mod sinks;
mod template;
mod tokenizer;

pub use sinks::{AlertSink, DeliveryError, EmailSink, FireContext, SinkRegistry, SmtpConfig};
#[cfg(any(test, feature = "mock-alerts"))]
pub use sinks::MockSink;
pub use tokenizer::tokenize;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::warn;

use pulsewatch_ids::Id;
use pulsewatch_model::{applicability_matches, CheckResult, CheckState, CheckStatus, PeriodKind, SubjectCheckId};
use pulsewatch_repo::{RepoError, Repository};

#[derive(Debug, Error)]
pub enum AlertingError {
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationOutcome {
    /// True if the result was dropped without touching state (applicability
    /// guard or a matching Blackout period).
    pub dropped: bool,
    pub fired_alerts: Vec<Id>,
}

/// `record_result` merged with alert evaluation (§4.5 + §4.6).
pub async fn record_result(
    repo: &dyn Repository,
    sinks: &SinkRegistry,
    subject_id: Id,
    check_id: Id,
    time: DateTime<Utc>,
    status: CheckStatus,
) -> Result<EvaluationOutcome, AlertingError> {
    let (subject, check) = tokio::try_join!(repo.find_subject(subject_id), repo.find_check(check_id))?;

    // Applicability guard (§4.5 step 2): protects against posts after role
    // unlinking.
    if !applicability_matches(&check.roles, &subject.roles) {
        return Ok(EvaluationOutcome { dropped: true, fired_alerts: Vec::new() });
    }

    let periods = repo
        .active_for_subject(subject.id, &subject.roles, &check.tags, time, None)
        .await?;
    if periods.iter().any(|p| p.kind == PeriodKind::Blackout) {
        return Ok(EvaluationOutcome { dropped: true, fired_alerts: Vec::new() });
    }
    let quiet_hit = periods.iter().any(|p| p.kind == PeriodKind::Quiet);

    let sc_id = SubjectCheckId::new(subject.id, check.id);
    let (mut state, prior_status) = match repo.find_state(sc_id).await {
        Ok(mut state) => {
            let prior_status = state.status;
            state.updated = time;
            state.roles = subject.roles.clone();
            state.tags = check.tags.clone();
            state.kind = check.kind;
            if status != state.status {
                state.status_changed = time;
                state.status = status;
            }
            (state, prior_status)
        }
        Err(RepoError::NotFound) => {
            let mut state = CheckState::new(sc_id, check.kind, subject.roles.clone(), check.tags.clone(), time);
            state.status = status;
            (state, CheckStatus::None)
        }
        Err(other) => return Err(other.into()),
    };

    let mut fired_alerts = Vec::new();
    let skip_evaluation = prior_status.is_at_most_ok() && status.is_at_most_ok();
    if !quiet_hit && !skip_evaluation {
        let roles: Vec<String> = subject.roles.iter().cloned().collect();
        let tags: Vec<String> = check.tags.iter().cloned().collect();
        let candidates = repo.alerts_matching(&roles, &tags).await?;

        for alert in candidates {
            // Open Question #4: suppress firing if an active Blackout
            // period's tag filter overlaps the *alert's* tags, even when
            // the check itself does not carry that tag.
            let alert_blackouts = repo
                .active_for_subject(subject.id, &subject.roles, &alert.tags, time, Some(&[PeriodKind::Blackout]))
                .await?;
            if !alert_blackouts.is_empty() {
                continue;
            }

            if prior_status == CheckStatus::Ok || status == CheckStatus::Ok {
                state.reminders.remove(&alert.id);
            }

            let last = state.reminders.get(&alert.id).copied();
            let should_fire = match last {
                None => true,
                Some(last) => {
                    alert.reminder_interval_minutes > 0
                        && (time - last) >= Duration::minutes(alert.reminder_interval_minutes)
                }
            };
            if !should_fire {
                continue;
            }

            let ctx = FireContext {
                subject_id: subject.id.to_string(),
                subject_name: subject.name.clone(),
                check_id: check.id.to_string(),
                check_name: check.name.clone(),
                status,
                prior_status,
            };
            match sinks.deliver(&alert, &ctx) {
                Ok(()) => {
                    state.reminders.insert(alert.id, time);
                    fired_alerts.push(alert.id);
                }
                Err(err) => warn!(alert = %alert.name, %err, "alert delivery failed"),
            }
        }
    }
    state.clear_reminders_if_ok();

    let result = CheckResult::new(subject.id, check.id, time, status);
    tokio::try_join!(repo.create_check_result(result), repo.upsert_state(state))?;

    Ok(EvaluationOutcome { dropped: false, fired_alerts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use pulsewatch_model::{Alert, AlertKind, Check, CheckKind, Period, Subject};
    use pulsewatch_repo::InMemoryRepository;
    use std::collections::{BTreeMap, BTreeSet};

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sinks() -> SinkRegistry {
        SinkRegistry::new(EmailSink::new(SmtpConfig {
            host: "localhost".into(),
            port: 25,
            user: "".into(),
            password: "".into(),
            from: "pulsewatch@example.com".into(),
        }))
    }

    async fn seed(repo: &InMemoryRepository, now: DateTime<Utc>) -> (Id, Id) {
        let subject = Subject::new("host1", roles(&["default"]), now);
        let subject_id = subject.id;
        repo.create_subject(subject).await.unwrap();

        let check = Check {
            id: Id::new(),
            name: "disk".into(),
            kind: CheckKind::Disk,
            params: BTreeMap::new(),
            interval_seconds: 60,
            roles: roles(&["default"]),
            tags: roles(&["default"]),
            modified: now,
        };
        let check_id = check.id;
        repo.create_check(check).await.unwrap();
        (subject_id, check_id)
    }

    #[tokio::test]
    async fn result_dropped_when_roles_no_longer_overlap() {
        let repo = InMemoryRepository::open();
        let now = Utc::now();
        let (subject_id, check_id) = seed(&repo, now).await;

        let mut check = repo.find_check(check_id).await.unwrap();
        check.roles = roles(&["billing"]);
        repo.update_check(check).await.unwrap();

        let outcome = record_result(&repo, &sinks(), subject_id, check_id, now, CheckStatus::Critical)
            .await
            .unwrap();
        assert!(outcome.dropped);
    }

    #[tokio::test]
    async fn alert_fires_once_then_waits_for_reminder_interval() {
        let repo = InMemoryRepository::open();
        let now = Utc::now();
        let (subject_id, check_id) = seed(&repo, now).await;

        let alert = Alert {
            id: Id::new(),
            name: "page".into(),
            kind: AlertKind::Mock,
            params: BTreeMap::new(),
            reminder_interval_minutes: 15,
            roles: roles(&["default"]),
            tags: roles(&["default"]),
            modified: now,
        };
        repo.create_alert(alert.clone()).await.unwrap();

        let first = record_result(&repo, &sinks(), subject_id, check_id, now, CheckStatus::Critical)
            .await
            .unwrap();
        assert_eq!(first.fired_alerts, vec![alert.id]);

        let soon = now + ChronoDuration::minutes(5);
        let second = record_result(&repo, &sinks(), subject_id, check_id, soon, CheckStatus::Critical)
            .await
            .unwrap();
        assert!(second.fired_alerts.is_empty());

        let later = now + ChronoDuration::minutes(20);
        let third = record_result(&repo, &sinks(), subject_id, check_id, later, CheckStatus::Critical)
            .await
            .unwrap();
        assert_eq!(third.fired_alerts, vec![alert.id]);
    }

    #[tokio::test]
    async fn both_ok_statuses_skip_evaluation_entirely() {
        let repo = InMemoryRepository::open();
        let now = Utc::now();
        let (subject_id, check_id) = seed(&repo, now).await;

        let alert = Alert {
            id: Id::new(),
            name: "page".into(),
            kind: AlertKind::Mock,
            params: BTreeMap::new(),
            reminder_interval_minutes: 0,
            roles: roles(&["default"]),
            tags: BTreeSet::new(),
            modified: now,
        };
        repo.create_alert(alert).await.unwrap();

        let outcome = record_result(&repo, &sinks(), subject_id, check_id, now, CheckStatus::Ok)
            .await
            .unwrap();
        assert!(outcome.fired_alerts.is_empty());
    }

    #[tokio::test]
    async fn blackout_matching_alert_tags_suppresses_firing() {
        let repo = InMemoryRepository::open();
        let now = Utc::now();
        let (subject_id, check_id) = seed(&repo, now).await;

        let alert = Alert {
            id: Id::new(),
            name: "page".into(),
            kind: AlertKind::Mock,
            params: BTreeMap::new(),
            reminder_interval_minutes: 0,
            roles: roles(&["default"]),
            tags: roles(&["default", "db"]),
            modified: now,
        };
        repo.create_alert(alert).await.unwrap();

        let period = Period {
            id: Id::new(),
            name: "db-maintenance".into(),
            kind: PeriodKind::Blackout,
            start: now - ChronoDuration::minutes(5),
            end: now + ChronoDuration::minutes(5),
            roles: BTreeSet::new(),
            tags: roles(&["db"]),
            subjects: BTreeSet::new(),
            modified: now,
        };
        repo.create_period(period).await.unwrap();

        let outcome = record_result(&repo, &sinks(), subject_id, check_id, now, CheckStatus::Critical)
            .await
            .unwrap();
        assert!(outcome.fired_alerts.is_empty());
    }
}
