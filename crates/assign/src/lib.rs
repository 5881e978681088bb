//! Leader-only remote-check assignment and load rebalancing (§4.3).
//!
//! Runs as a periodic cycle gated on [`PeerMembership::is_leader`], matching
//! the teacher's probe/exchange loop shape in `pulsewatch_peers`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use pulsewatch_model::{applicability_matches, CheckKind, CheckState, PeerId, SubjectCheckId};
use pulsewatch_peers::PeerMembership;
use pulsewatch_repo::{RepoError, Repository};

const REMOTE_KINDS: [CheckKind; 2] = [CheckKind::AgentDown, CheckKind::Version];

#[derive(Debug, Error)]
pub enum AssignError {
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentOutcome {
    pub materialized: usize,
    pub reassigned: usize,
}

/// Runs one assignment cycle. A no-op (returns the default outcome) unless
/// `peers` currently believes this coordinator is leader.
pub async fn run_cycle(
    repo: &dyn Repository,
    peers: &PeerMembership,
    now: DateTime<Utc>,
) -> Result<AssignmentOutcome, AssignError> {
    if !peers.is_leader().await {
        return Ok(AssignmentOutcome::default());
    }

    let checks = repo.checks_by_kind_set(&REMOTE_KINDS).await?;
    if checks.is_empty() {
        return Ok(AssignmentOutcome::default());
    }
    let role_union: Vec<String> = checks
        .iter()
        .flat_map(|c| c.roles.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let subjects = repo.subjects_by_roles(&role_union).await?;
    let checks_by_id: BTreeMap<_, _> = checks.iter().map(|c| (c.id, c)).collect();

    // applicable = {(s,c): c.roles ∩ s.roles != ∅}. The Derived section of
    // §4.3 corrects the source's `subject.roles ∩ check.tags`; see
    // DESIGN.md for the Open Question this resolves.
    let mut applicable: Vec<SubjectCheckId> = Vec::new();
    for subject in &subjects {
        for check in &checks {
            if applicability_matches(&check.roles, &subject.roles) {
                applicable.push(SubjectCheckId::new(subject.id, check.id));
            }
        }
    }

    // Step 1: state materialization.
    let mut materialized = 0;
    let mut states: BTreeMap<SubjectCheckId, CheckState> = BTreeMap::new();
    for sc_id in &applicable {
        match repo.find_state(*sc_id).await {
            Ok(state) => {
                states.insert(*sc_id, state);
            }
            Err(RepoError::NotFound) => {
                let subject = subjects
                    .iter()
                    .find(|s| s.id == sc_id.subject_id)
                    .expect("applicable subject present in fetched set");
                let check = checks_by_id
                    .get(&sc_id.check_id)
                    .expect("applicable check present in fetched set");
                let state = CheckState::new(*sc_id, check.kind, subject.roles.clone(), check.tags.clone(), now);
                repo.upsert_state(state.clone()).await?;
                states.insert(*sc_id, state);
                materialized += 1;
            }
            Err(other) => return Err(other.into()),
        }
    }

    // Step 2: load snapshot. Self is seeded explicitly since
    // `alive_peers()` never includes it; live peers absent from the
    // workload map start at 0; down peers are dropped from the map entirely
    // (their states are reassignment candidates via the owner-down check
    // below).
    let alive = peers.alive_peers().await;
    let known = peers.known_peers().await;
    let self_id = peers.self_id();
    let mut workload = repo.workload_by_owner().await?;
    let mut load: BTreeMap<PeerId, i64> = BTreeMap::new();
    load.insert(self_id, workload.remove(&self_id).unwrap_or(0) as i64);
    for id in alive.keys() {
        load.insert(*id, workload.remove(id).unwrap_or(0) as i64);
    }
    let down: BTreeSet<PeerId> = known.keys().filter(|id| !alive.contains_key(*id)).copied().collect();

    // Step 3: imbalance classification.
    let min_l = load.values().copied().min().unwrap_or(0);
    let max_l = load.values().copied().max().unwrap_or(0);
    let mut imbalance = if max_l == 0 { 0.0 } else { 1.0 - (min_l as f64 / max_l as f64) };
    let max_rebalance = if applicable.is_empty() { 0.0 } else { max_l as f64 / applicable.len() as f64 };
    imbalance = imbalance.min(max_rebalance);
    if imbalance < 0.05 || max_l - min_l <= 1 {
        imbalance = 0.0;
    }

    // Steps 4-5: selection and placement.
    let mut reassigned = 0;
    let mut rng = rand::thread_rng();
    for sc_id in &applicable {
        let state = states.get_mut(sc_id).expect("materialized in step 1");
        let check = checks_by_id.get(&sc_id.check_id).expect("applicable check present");

        let stale = now - state.updated > Duration::seconds(2 * check.interval_seconds as i64);
        let owner_down = state.owner.map(|o| down.contains(&o)).unwrap_or(false);
        let needs_reassign = state.owner.is_none()
            || owner_down
            || stale
            || (imbalance > 0.0 && rng.gen::<f64>() < imbalance);
        if !needs_reassign {
            continue;
        }

        // Decrementing is a no-op when the prior owner is nil (nothing to
        // decrement) or already dropped from `load` (the down-peer case).
        if let Some(prior) = state.owner {
            if let Some(counter) = load.get_mut(&prior) {
                *counter -= 1;
            }
        }

        let target = match load.iter().min_by_key(|(_, count)| **count).map(|(id, _)| *id) {
            Some(id) => id,
            None => continue,
        };
        state.owner = Some(target);
        *load.get_mut(&target).expect("target drawn from load map") += 1;
        repo.upsert_state(state.clone()).await?;
        reassigned += 1;
    }

    info!(materialized, reassigned, "assignment cycle complete");
    Ok(AssignmentOutcome { materialized, reassigned })
}

/// Spawn the periodic assignment loop. Returns once `cancel` is triggered.
pub fn spawn_loop(
    repo: Arc<dyn Repository>,
    peers: PeerMembership,
    interval: StdDuration,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = run_cycle(&*repo, &peers, Utc::now()).await {
                        error!(%err, "assignment cycle failed");
                    }
                }
            }
        }
    });
}
