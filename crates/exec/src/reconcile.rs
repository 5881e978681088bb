//! The per-coordinator running-task registry and reconcile loop (§4.4),
//! ported from `remotecheck.runningChecks`/`repeatCheck` in the original:
//! a local mutex over a map of control channels, one spawned task per
//! (subject, check) pair this coordinator owns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pulsewatch_alerting::SinkRegistry;
use pulsewatch_model::{Check, CheckKind, CheckStatus, PeerId, PeriodKind, Subject, SubjectCheckId};
use pulsewatch_repeater::Repeater;
use pulsewatch_repo::{RequestCache, Repository};

use crate::executors::{execute_agent_down, execute_version};
use crate::ExecError;

#[derive(Clone)]
struct TaskSnapshot {
    subject: Subject,
    check: Check,
}

enum ControlMsg {
    Update(TaskSnapshot),
    Stop,
}

struct RunningTask {
    control: mpsc::UnboundedSender<ControlMsg>,
}

/// Shared, cloneable dependencies every spawned per-check task needs.
struct ExecDeps {
    repo: Arc<dyn Repository>,
    sinks: Arc<SinkRegistry>,
    client: reqwest::Client,
    version_manifest_url: String,
    our_version: String,
}

/// Owns the running per-check task set for this coordinator.
pub struct Reconciler {
    self_id: PeerId,
    deps: Arc<ExecDeps>,
    running: Mutex<HashMap<SubjectCheckId, RunningTask>>,
}

impl Reconciler {
    pub fn new(
        self_id: PeerId,
        repo: Arc<dyn Repository>,
        sinks: Arc<SinkRegistry>,
        client: reqwest::Client,
        version_manifest_url: impl Into<String>,
        our_version: impl Into<String>,
    ) -> Self {
        Self {
            self_id,
            deps: Arc::new(ExecDeps {
                repo,
                sinks,
                client,
                version_manifest_url: version_manifest_url.into(),
                our_version: our_version.into(),
            }),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Refresh the set of states owned by this coordinator and reconcile it
    /// with the running task set.
    pub async fn reconcile(&self) -> Result<(), ExecError> {
        let now = Utc::now();
        let owned = self.deps.repo.states_for_owner(self.self_id).await?;

        let mut cache = RequestCache::new();
        let mut new_set: HashMap<SubjectCheckId, TaskSnapshot> = HashMap::new();
        for state in owned {
            let subject = match self.deps.repo.find_subject(state.id.subject_id).await {
                Ok(subject) => subject,
                Err(err) => {
                    warn!(%err, subject_id = %state.id.subject_id, "could not load subject for owned state");
                    continue;
                }
            };
            let check = match cache.get_check(&*self.deps.repo, state.id.check_id).await {
                Ok(check) => check,
                Err(err) => {
                    warn!(%err, check_id = %state.id.check_id, "could not load check for owned state");
                    continue;
                }
            };

            let blackouts = self
                .deps
                .repo
                .active_for_subject(subject.id, &subject.roles, &check.tags, now, Some(&[PeriodKind::Blackout]))
                .await?;
            if !blackouts.is_empty() {
                continue;
            }

            new_set.insert(state.id, TaskSnapshot { subject, check });
        }

        let mut running = self.running.lock();
        running.retain(|id, task| {
            if let Some(snapshot) = new_set.get(id) {
                let _ = task.control.send(ControlMsg::Update(snapshot.clone()));
                true
            } else {
                let _ = task.control.send(ControlMsg::Stop);
                false
            }
        });

        for (id, snapshot) in new_set {
            if running.contains_key(&id) {
                continue;
            }
            let (tx, rx) = mpsc::unbounded_channel();
            spawn_task(snapshot, rx, self.deps.clone());
            running.insert(id, RunningTask { control: tx });
        }

        info!(owned = running.len(), "remote-check reconcile complete");
        Ok(())
    }
}

fn spawn_task(initial: TaskSnapshot, mut control: mpsc::UnboundedReceiver<ControlMsg>, deps: Arc<ExecDeps>) {
    tokio::spawn(async move {
        let mut snapshot = initial;
        execute(&snapshot, &deps).await;

        let (repeater, mut ticks) = Repeater::start(StdDuration::from_secs(snapshot.check.interval_seconds.max(1)));
        loop {
            tokio::select! {
                msg = control.recv() => {
                    match msg {
                        Some(ControlMsg::Update(new_snapshot)) => {
                            repeater.update_interval(StdDuration::from_secs(new_snapshot.check.interval_seconds.max(1)));
                            snapshot = new_snapshot;
                        }
                        Some(ControlMsg::Stop) | None => {
                            repeater.stop();
                            return;
                        }
                    }
                }
                tick = ticks.recv() => {
                    if tick.is_none() {
                        return;
                    }
                    execute(&snapshot, &deps).await;
                }
            }
        }
    });
}

async fn execute(snapshot: &TaskSnapshot, deps: &ExecDeps) {
    let now = Utc::now();
    let status = match snapshot.check.kind {
        CheckKind::AgentDown => execute_agent_down(&snapshot.subject, &snapshot.check, now),
        CheckKind::Version => execute_version(&snapshot.check, &deps.client, &deps.version_manifest_url, &deps.our_version).await,
        other => {
            warn!(?other, "remote-check execution task given a non-remote check kind");
            CheckStatus::None
        }
    };

    if let Err(err) =
        pulsewatch_alerting::record_result(&*deps.repo, &deps.sinks, snapshot.subject.id, snapshot.check.id, now, status).await
    {
        warn!(%err, subject_id = %snapshot.subject.id, check_id = %snapshot.check.id, "failed to record remote check result");
    }
}

/// Spawn the periodic reconcile loop (`RemoteCheckUpdateInterval`, default
/// 30s). Runs one reconcile immediately, then on every tick.
pub fn spawn_reconcile_loop(reconciler: Arc<Reconciler>, interval: StdDuration, cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = reconciler.reconcile().await {
            warn!(%err, "initial remote-check reconcile failed");
        }
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // consume the immediate first tick
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = reconciler.reconcile().await {
                        warn!(%err, "remote-check reconcile failed");
                    }
                }
            }
        }
    });
}
