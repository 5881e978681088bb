//! Agent configuration synthesis (§4.2): turns a subject's check-in into the
//! AgentConfig it should run, honoring whole-subject and per-check blackouts.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use pulsewatch_ids::Id;
use pulsewatch_model::{filter_matches, Check, CheckKind, Period, PeriodKind, Subject};
use pulsewatch_peers::PeerMembership;
use pulsewatch_repo::{RepoError, Repository};

const LOCAL_KINDS: [CheckKind; 6] = [
    CheckKind::Exec,
    CheckKind::Http,
    CheckKind::Port,
    CheckKind::Memory,
    CheckKind::Cpu,
    CheckKind::Disk,
];

#[derive(Debug, Error)]
pub enum AgentConfigError {
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("subject {0:?} not found and no initial role list was supplied")]
    SubjectNotFound(String),
}

/// A value wrapped with the effective-modified timestamp that drives
/// conditional-GET on `/api/configuration/{name}` (§6).
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    pub effective_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub subject_id: Id,
    pub name: String,
    pub coordinators: Vec<String>,
    pub checks: Vec<Check>,
}

/// Look up (or create) the subject by name, then synthesize its AgentConfig.
pub async fn synthesize(
    repo: &dyn Repository,
    peers: &PeerMembership,
    self_endpoint: &str,
    name: &str,
    initial_roles: Option<BTreeSet<String>>,
    now: DateTime<Utc>,
) -> Result<Cached<AgentConfig>, AgentConfigError> {
    let mut subject = find_or_create_subject(repo, name, initial_roles, now).await?;
    subject.record_check_in(now);
    repo.update_subject(subject.clone()).await?;

    let active_blackouts = repo.active_by_type(PeriodKind::Blackout, now).await?;

    let whole_subject_blackout = active_blackouts
        .iter()
        .find(|p| p.matches_subject_only(subject.id, &subject.roles));

    let (checks, participating_periods): (Vec<Check>, Vec<Period>) = if let Some(period) = whole_subject_blackout {
        (Vec::new(), vec![period.clone()])
    } else {
        let roles: Vec<String> = subject.roles.iter().cloned().collect();
        let mut candidates = repo.checks_by_kind_set_and_role_set(&LOCAL_KINDS, &roles).await?;

        let tag_union: BTreeSet<String> = candidates.iter().flat_map(|c| c.tags.iter().cloned()).collect();

        let matching_periods: Vec<Period> = active_blackouts
            .into_iter()
            .filter(|p| p.matches(subject.id, &subject.roles, &tag_union))
            .collect();

        candidates.retain(|c| !matching_periods.iter().any(|p| filter_matches(&p.tags, &c.tags)));

        (candidates, matching_periods)
    };

    let alive = peers.alive_peers().await;
    let mut coordinators: Vec<String> = alive.into_values().collect();
    coordinators.push(self_endpoint.to_string());
    coordinators.sort();
    coordinators.dedup();

    let mut effective_modified = subject.modified;
    for check in &checks {
        if check.modified > effective_modified {
            effective_modified = check.modified;
        }
    }
    for period in &participating_periods {
        let period_modified = period.effective_modified(now);
        if period_modified > effective_modified {
            effective_modified = period_modified;
        }
    }

    Ok(Cached {
        value: AgentConfig {
            subject_id: subject.id,
            name: subject.name,
            coordinators,
            checks,
        },
        effective_modified,
    })
}

async fn find_or_create_subject(
    repo: &dyn Repository,
    name: &str,
    initial_roles: Option<BTreeSet<String>>,
    now: DateTime<Utc>,
) -> Result<Subject, AgentConfigError> {
    match repo.find_subject_by_name(name).await {
        Ok(subject) => Ok(subject),
        Err(RepoError::NotFound) => match initial_roles {
            Some(roles) => {
                let subject = Subject::new(name, roles, now);
                repo.create_subject(subject.clone()).await?;
                Ok(subject)
            }
            None => Err(AgentConfigError::SubjectNotFound(name.to_string())),
        },
        Err(other) => Err(other.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pulsewatch_repo::InMemoryRepository;
    use std::collections::BTreeMap;

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    async fn peers_with_self(self_id: Id) -> PeerMembership {
        PeerMembership::spawn(self_id, "http://self:8080", reqwest::Client::new())
    }

    #[tokio::test]
    async fn creates_subject_on_first_check_in() {
        let repo = InMemoryRepository::open();
        let peers = peers_with_self(Id::new()).await;
        let now = Utc::now();

        let result = synthesize(
            &repo,
            &peers,
            "http://self:8080",
            "host1",
            Some(roles(&["default"])),
            now,
        )
        .await
        .unwrap();

        assert_eq!(result.value.name, "host1");
        assert!(repo.find_subject_by_name("host1").await.is_ok());
    }

    #[tokio::test]
    async fn missing_subject_without_roles_is_an_error() {
        let repo = InMemoryRepository::open();
        let peers = peers_with_self(Id::new()).await;

        let err = synthesize(&repo, &peers, "http://self:8080", "ghost", None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentConfigError::SubjectNotFound(_)));
    }

    #[tokio::test]
    async fn whole_subject_blackout_empties_check_list() {
        let repo = InMemoryRepository::open();
        let peers = peers_with_self(Id::new()).await;
        let now = Utc::now();

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
            tags: BTreeSet::new(),
            modified: now,
        };
        repo.create_check(check).await.unwrap();

        let period = Period {
            id: Id::new(),
            name: "maintenance".into(),
            kind: PeriodKind::Blackout,
            start: now - Duration::minutes(5),
            end: now + Duration::minutes(5),
            roles: roles(&["default"]),
            tags: BTreeSet::new(),
            subjects: BTreeSet::new(),
            modified: now - Duration::hours(1),
        };
        repo.create_period(period).await.unwrap();

        let result = synthesize(&repo, &peers, "http://self:8080", "host1", None, now)
            .await
            .unwrap();

        assert_eq!(result.value.subject_id, subject_id);
        assert!(result.value.checks.is_empty());
    }

    #[tokio::test]
    async fn check_excluded_when_its_tags_overlap_a_matching_blackout() {
        let repo = InMemoryRepository::open();
        let peers = peers_with_self(Id::new()).await;
        let now = Utc::now();

        let subject = Subject::new("host1", roles(&["default"]), now);
        repo.create_subject(subject).await.unwrap();

        let mut db_check = Check {
            id: Id::new(),
            name: "db".into(),
            kind: CheckKind::Exec,
            params: [("command".to_string(), "true".to_string())].into_iter().collect(),
            interval_seconds: 60,
            roles: roles(&["default"]),
            tags: roles(&["db"]),
            modified: now,
        };
        let http_check = Check {
            id: Id::new(),
            name: "http".into(),
            kind: CheckKind::Http,
            params: [("url".to_string(), "http://x".to_string())].into_iter().collect(),
            interval_seconds: 60,
            roles: roles(&["default"]),
            tags: BTreeSet::new(),
            modified: now,
        };
        db_check.tags = roles(&["db"]);
        repo.create_check(db_check).await.unwrap();
        repo.create_check(http_check).await.unwrap();

        let period = Period {
            id: Id::new(),
            name: "db-maintenance".into(),
            kind: PeriodKind::Blackout,
            start: now - Duration::minutes(5),
            end: now + Duration::minutes(5),
            roles: BTreeSet::new(),
            tags: roles(&["db"]),
            subjects: BTreeSet::new(),
            modified: now,
        };
        repo.create_period(period).await.unwrap();

        let result = synthesize(&repo, &peers, "http://self:8080", "host1", None, now)
            .await
            .unwrap();

        assert_eq!(result.value.checks.len(), 1);
        assert_eq!(result.value.checks[0].kind, CheckKind::Http);
    }
}
