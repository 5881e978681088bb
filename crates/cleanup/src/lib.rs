//! CRUD cleanup actions (§4.7, §4.10.E): run outside the request's critical
//! path, best-effort, log-only — matching the teacher's fire-and-forget
//! shutdown-telemetry task in `ApiServer::run`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, info};

use pulsewatch_ids::Id;
use pulsewatch_model::SubjectCheckId;
use pulsewatch_repo::Repository;

#[derive(Debug, Clone)]
pub enum CleanupJob {
    SubjectDeleted { subject_id: Id },
    CheckDeleted { check_id: Id },
    /// A check's role set changed; `lost_subjects` held a state under the
    /// old role set but no longer qualify under the new one.
    CheckRolesChanged { check_id: Id, lost_subjects: BTreeSet<Id> },
    /// A subject's role set changed; `lost_checks` were applicable under the
    /// old role set but no longer qualify under the new one.
    SubjectRolesChanged { subject_id: Id, lost_checks: BTreeSet<Id> },
}

/// Fire-and-forget: spawns a task that performs `job` against `repo`,
/// logging and dropping any error. Never retried.
pub fn spawn_cleanup(repo: Arc<dyn Repository>, job: CleanupJob) {
    tokio::spawn(async move {
        let result = match &job {
            CleanupJob::SubjectDeleted { subject_id } => {
                let a = repo.delete_states_by_subject(*subject_id).await;
                let b = repo.delete_results_by_subject(*subject_id).await;
                a.and(b)
            }
            CleanupJob::CheckDeleted { check_id } => {
                let a = repo.delete_states_by_check(*check_id).await;
                let b = repo.delete_results_by_check(*check_id).await;
                a.and(b)
            }
            CleanupJob::CheckRolesChanged { check_id, lost_subjects } => {
                run_pairwise(&*repo, lost_subjects.iter().map(|s| (*s, *check_id))).await
            }
            CleanupJob::SubjectRolesChanged { subject_id, lost_checks } => {
                run_pairwise(&*repo, lost_checks.iter().map(|c| (*subject_id, *c))).await
            }
        };

        match result {
            Ok(()) => info!(?job, "cleanup completed"),
            Err(err) => error!(?job, %err, "cleanup failed, not retried"),
        }
    });
}

async fn run_pairwise(
    repo: &dyn Repository,
    pairs: impl Iterator<Item = (Id, Id)>,
) -> pulsewatch_repo::RepoResult<()> {
    for (subject_id, check_id) in pairs {
        let id = SubjectCheckId::new(subject_id, check_id);
        repo.delete_results_by_subject_check(id).await?;
        // `delete_state` returns NotFound if the state was already gone,
        // which is an expected outcome here, not a failure.
        match repo.delete_state(id).await {
            Ok(()) | Err(pulsewatch_repo::RepoError::NotFound) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulsewatch_model::{CheckKind, CheckState, SubjectCheckId};
    use pulsewatch_repo::InMemoryRepository;
    use std::collections::BTreeSet as Set;

    #[tokio::test]
    async fn subject_deleted_removes_its_states() {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::open());
        let subject_id = Id::new();
        let check_id = Id::new();
        let state = CheckState::new(
            SubjectCheckId::new(subject_id, check_id),
            CheckKind::Http,
            Set::new(),
            Set::new(),
            Utc::now(),
        );
        let sc_id = state.id;
        repo.upsert_state(state).await.unwrap();

        spawn_cleanup(repo.clone(), CleanupJob::SubjectDeleted { subject_id });
        // Give the spawned task a turn to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(repo.find_state(sc_id).await.is_err());
    }
}
