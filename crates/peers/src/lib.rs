//! Peer membership and leader election (§4.1).
//!
//! A single actor task owns the *known* and *alive* peer maps behind an
//! `mpsc` channel ("Non-locked peer state", spec §9); [`PeerMembership`] is a
//! cheap `Clone`-able handle around the channel sender, the same
//! handle-wraps-channel shape as the teacher's `Gateway` wrapping its
//! subsystems.

use std::collections::HashMap;
use std::time::Duration;

use pulsewatch_ids::Id;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, warn};

pub type PeerId = Id;
pub type PeerMap = HashMap<PeerId, String>;

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("peer request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("actor channel closed")]
    ActorGone,
}

enum Command {
    Snapshot {
        want_alive: bool,
        reply: oneshot::Sender<PeerMap>,
    },
    MergeKnown(PeerMap),
    SetAlive(PeerMap),
    ResetKnownToAlive,
}

/// Handle to the peer-membership actor. Cheap to clone; every clone shares
/// the same underlying state.
#[derive(Clone)]
pub struct PeerMembership {
    commands: mpsc::Sender<Command>,
    self_id: PeerId,
    self_endpoint: String,
    client: reqwest::Client,
}

struct Actor {
    known: PeerMap,
    alive: PeerMap,
    commands: mpsc::Receiver<Command>,
}

impl Actor {
    fn run(mut self) {
        tokio::spawn(async move {
            while let Some(cmd) = self.commands.recv().await {
                match cmd {
                    Command::Snapshot { want_alive, reply } => {
                        let snapshot = if want_alive {
                            self.alive.clone()
                        } else {
                            self.known.clone()
                        };
                        let _ = reply.send(snapshot);
                    }
                    Command::MergeKnown(updates) => {
                        self.known.extend(updates);
                    }
                    Command::SetAlive(alive) => {
                        self.alive = alive;
                    }
                    Command::ResetKnownToAlive => {
                        self.known = self.alive.clone();
                    }
                }
            }
            debug!("peer membership actor shutting down");
        });
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PeersResponse(PeerMap);

impl PeerMembership {
    /// Spawn the owning actor and return a handle to it.
    pub fn spawn(self_id: PeerId, self_endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        let (tx, rx) = mpsc::channel(32);
        Actor {
            known: HashMap::new(),
            alive: HashMap::new(),
            commands: rx,
        }
        .run();
        Self {
            commands: tx,
            self_id,
            self_endpoint: self_endpoint.into(),
            client,
        }
    }

    pub fn self_id(&self) -> PeerId {
        self.self_id
    }

    /// One-shot: fetch `/peers` on `endpoint` and merge the returned
    /// identifiers (excluding self) into *known*.
    #[instrument(skip(self))]
    pub async fn add_peer(&self, endpoint: &str) -> Result<(), PeerError> {
        let url = format!("{}/peers", endpoint.trim_end_matches('/'));
        let response: PeersResponse = self.client.get(&url).send().await?.json().await?;
        self.merge_known(response.0).await;
        Ok(())
    }

    /// Fold an explicit hint (from an inbound `/peers?iam=...` request) into
    /// *known*.
    pub async fn add_peer_hint(&self, id: PeerId, endpoint: String) {
        if id == self.self_id {
            return;
        }
        let mut updates = HashMap::new();
        updates.insert(id, endpoint);
        self.merge_known(updates).await;
    }

    async fn merge_known(&self, mut updates: PeerMap) {
        updates.remove(&self.self_id);
        let _ = self.commands.send(Command::MergeKnown(updates)).await;
    }

    pub async fn known_peers(&self) -> PeerMap {
        self.snapshot(false).await
    }

    pub async fn alive_peers(&self) -> PeerMap {
        self.snapshot(true).await
    }

    async fn snapshot(&self, want_alive: bool) -> PeerMap {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Snapshot { want_alive, reply }).await.is_err() {
            return HashMap::new();
        }
        rx.await.unwrap_or_default()
    }

    /// True iff `self_id` is lexically smallest among `alive_peers() ∪
    /// {self}`. Identifiers are time-encoded, so the oldest surviving
    /// coordinator always wins; no election messages are exchanged.
    pub async fn is_leader(&self) -> bool {
        let alive = self.alive_peers().await;
        !alive.keys().any(|id| *id < self.self_id)
    }

    /// Liveness probe (§4.1 periodic action 1): `GET /up` on every known
    /// peer with a short timeout; responders become the new *alive* set.
    #[instrument(skip(self))]
    async fn probe_liveness(&self, timeout: Duration) {
        let known = self.known_peers().await;
        let mut alive = HashMap::new();
        for (id, endpoint) in known {
            let url = format!("{}/up", endpoint.trim_end_matches('/'));
            let ok = self
                .client
                .get(&url)
                .timeout(timeout)
                .send()
                .await
                .map(|resp| resp.status().is_success())
                .unwrap_or(false);
            if ok {
                alive.insert(id, endpoint);
            } else {
                warn!(%id, "peer failed liveness probe");
            }
        }
        let _ = self.commands.send(Command::SetAlive(alive)).await;
    }

    /// Update exchange (§4.1 periodic action 2): known := alive, then
    /// `GET /peers?iam=...` on every alive peer, merging results back into
    /// known.
    #[instrument(skip(self))]
    async fn exchange_updates(&self) {
        let _ = self.commands.send(Command::ResetKnownToAlive).await;
        let alive = self.alive_peers().await;
        for (_, endpoint) in alive {
            let url = format!(
                "{}/peers?iam={}&endpoint={}",
                endpoint.trim_end_matches('/'),
                self.self_id,
                self.self_endpoint
            );
            let outcome = async {
                let response = self.client.get(&url).send().await?;
                response.json::<PeersResponse>().await
            }
            .await;
            match outcome {
                Ok(PeersResponse(updates)) => self.merge_known(updates).await,
                Err(err) => warn!(%endpoint, %err, "peer update exchange failed"),
            }
        }
    }

    /// Spawn the liveness-probe and update-exchange background loops.
    /// Returns when `cancel` is triggered.
    pub fn spawn_loops(
        &self,
        probe_interval: Duration,
        probe_timeout: Duration,
        exchange_interval: Duration,
        cancel: tokio_util::sync::CancellationToken,
    ) {
        let probe_handle = self.clone();
        let probe_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(probe_interval);
            loop {
                tokio::select! {
                    _ = probe_cancel.cancelled() => break,
                    _ = ticker.tick() => probe_handle.probe_liveness(probe_timeout).await,
                }
            }
        });

        let exchange_handle = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(exchange_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => exchange_handle.exchange_updates().await,
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_at(nanos: u64) -> PeerId {
        Id::at(nanos)
    }

    #[tokio::test]
    async fn is_leader_true_when_self_is_smallest() {
        let self_id = id_at(1_000);
        let membership = PeerMembership::spawn(self_id, "http://self:8080", reqwest::Client::new());
        membership
            .merge_known({
                let mut m = HashMap::new();
                m.insert(id_at(2_000), "http://b:8080".into());
                m
            })
            .await;
        // alive starts empty; leadership among the empty alive set ∪ {self}
        // is trivially true.
        assert!(membership.is_leader().await);
    }

    #[tokio::test]
    async fn is_leader_false_when_an_older_peer_is_alive() {
        let self_id = id_at(2_000);
        let membership = PeerMembership::spawn(self_id, "http://self:8080", reqwest::Client::new());
        let older = id_at(1_000);
        let _ = membership
            .commands
            .send(Command::SetAlive({
                let mut m = HashMap::new();
                m.insert(older, "http://a:8080".into());
                m
            }))
            .await;
        assert!(!membership.is_leader().await);
    }

    #[tokio::test]
    async fn add_peer_hint_excludes_self() {
        let self_id = id_at(1_000);
        let membership = PeerMembership::spawn(self_id, "http://self:8080", reqwest::Client::new());
        membership.add_peer_hint(self_id, "http://self:8080".into()).await;
        assert!(membership.known_peers().await.is_empty());
    }

    #[tokio::test]
    async fn merge_known_accumulates_across_calls() {
        let self_id = id_at(1_000);
        let membership = PeerMembership::spawn(self_id, "http://self:8080", reqwest::Client::new());
        membership.add_peer_hint(id_at(2_000), "http://b:8080".into()).await;
        membership.add_peer_hint(id_at(3_000), "http://c:8080".into()).await;
        assert_eq!(membership.known_peers().await.len(), 2);
    }
}
