use std::sync::Arc;
use std::time::{Duration, Instant};

use pulsewatch_alerting::SinkRegistry;
use pulsewatch_ids::Id;
use pulsewatch_observability::MetricsExporter;
use pulsewatch_peers::PeerMembership;
use pulsewatch_repo::Repository;

/// Static coordinator identity and timing knobs the routes need (§6
/// configuration file options not already owned by a background loop).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub self_id: Id,
    pub self_endpoint: String,
    pub allow_cors: String,
    pub agent_update_interval: Duration,
    pub peer_check_interval: Duration,
    pub version: String,
    pub build: String,
    pub api_version: u32,
}

#[derive(Clone)]
pub struct ApiState {
    inner: Arc<ApiStateInner>,
}

struct ApiStateInner {
    repo: Arc<dyn Repository>,
    peers: PeerMembership,
    sinks: Arc<SinkRegistry>,
    config: ApiConfig,
    metrics: Option<MetricsExporter>,
    started_at: Instant,
}

impl ApiState {
    pub fn new(
        repo: Arc<dyn Repository>,
        peers: PeerMembership,
        sinks: Arc<SinkRegistry>,
        config: ApiConfig,
        metrics: Option<MetricsExporter>,
    ) -> Self {
        Self {
            inner: Arc::new(ApiStateInner {
                repo,
                peers,
                sinks,
                config,
                metrics,
                started_at: Instant::now(),
            }),
        }
    }

    pub fn repo(&self) -> &dyn Repository {
        &*self.inner.repo
    }

    pub fn repo_arc(&self) -> Arc<dyn Repository> {
        self.inner.repo.clone()
    }

    pub fn peers(&self) -> &PeerMembership {
        &self.inner.peers
    }

    pub fn sinks(&self) -> &SinkRegistry {
        &self.inner.sinks
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }

    pub fn metrics(&self) -> Option<&MetricsExporter> {
        self.inner.metrics.as_ref()
    }
}
