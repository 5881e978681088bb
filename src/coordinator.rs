//! Coordinator assembly (§1, §6): owns every long-running piece
//! (peer gossip, leader-only assignment, remote-check reconcile, HTTP API)
//! and starts/stops them together, mirroring the teacher's
//! `UnifiedOrchestrator` as the single object a binary constructs and runs.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pulsewatch_alerting::{EmailSink, SinkRegistry, SmtpConfig};
use pulsewatch_api::{ApiConfig, ApiServer, ApiState};
use pulsewatch_config::CoordinatorConfig;
use pulsewatch_exec::Reconciler;
use pulsewatch_ids::Id;
use pulsewatch_observability::{LogFormat, MetricsExporter, TracingConfig, TracingGuard};
use pulsewatch_peers::PeerMembership;
use pulsewatch_repo::{InMemoryRepository, Repository};

/// Everything needed to serve one coordinator process, assembled from a
/// loaded [`CoordinatorConfig`] and ready to `run()`.
pub struct Coordinator {
    config: CoordinatorConfig,
    self_id: Id,
    self_endpoint: String,
    repo: Arc<dyn Repository>,
    sinks: Arc<SinkRegistry>,
    peers: PeerMembership,
    metrics: MetricsExporter,
    _tracing_guard: TracingGuard,
}

impl Coordinator {
    /// Initializes observability, identity, the in-memory repository
    /// (§4.8: the production document store is an external collaborator),
    /// and peer membership seeded with `BootstrapPeers`. Does not start any
    /// background loop yet; call [`Coordinator::run`] for that.
    pub async fn build(config: CoordinatorConfig) -> Result<Self> {
        let tracing_config = TracingConfig {
            service_name: "pulsewatch-coordinator".into(),
            log_format: config
                .observability
                .log_format
                .parse::<LogFormat>()
                .unwrap_or(LogFormat::Pretty),
            log_level: config.observability.log_level.clone(),
            otlp_endpoint: config.observability.otlp_endpoint.clone(),
            resource_attributes: Vec::new(),
        };
        let (tracing_guard, metrics) = pulsewatch_observability::init(&tracing_config, None)
            .context("failed to initialize observability")?;

        let self_id = match &config.id {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(id = %raw, "configured ID is not a valid identifier, generating one instead");
                Id::new()
            }),
            None => Id::new(),
        };
        let address = config.address.clone().unwrap_or_else(discover_non_loopback_address);
        let self_endpoint = format!("http://{address}:{}", config.port);
        info!(%self_id, %self_endpoint, "coordinator starting");

        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::open());

        let sinks = Arc::new(SinkRegistry::new(EmailSink::new(SmtpConfig {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            user: config.smtp_user.clone(),
            password: config.smtp_password.clone(),
            from: config.email_from.clone(),
        })));

        let peers = PeerMembership::spawn(self_id, self_endpoint.clone(), reqwest::Client::new());
        for endpoint in &config.bootstrap_peers {
            if let Err(err) = peers.add_peer(endpoint).await {
                warn!(%endpoint, %err, "failed to register bootstrap peer");
            }
        }

        Ok(Self {
            config,
            self_id,
            self_endpoint,
            repo,
            sinks,
            peers,
            metrics,
            _tracing_guard: tracing_guard,
        })
    }

    /// Starts every background loop, binds the HTTP API, and blocks until a
    /// shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        let cancel = CancellationToken::new();

        self.peers.spawn_loops(
            Duration::from_secs(self.config.peer_check_interval_seconds),
            Duration::from_secs(2),
            Duration::from_secs(self.config.peer_update_interval_seconds),
            cancel.clone(),
        );

        pulsewatch_assign::spawn_loop(
            self.repo.clone(),
            self.peers.clone(),
            Duration::from_secs(self.config.remote_check_assign_interval_seconds),
            cancel.clone(),
        );

        let reconciler = Arc::new(Reconciler::new(
            self.self_id,
            self.repo.clone(),
            self.sinks.clone(),
            reqwest::Client::new(),
            format!("{}/api/info", self.self_endpoint),
            env!("CARGO_PKG_VERSION"),
        ));
        pulsewatch_exec::spawn_reconcile_loop(
            reconciler,
            Duration::from_secs(self.config.remote_check_update_interval_seconds),
            cancel.clone(),
        );

        let shutdown_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received, stopping background loops");
                shutdown_cancel.cancel();
            }
        });

        let api_state = ApiState::new(
            self.repo,
            self.peers,
            self.sinks,
            ApiConfig {
                self_id: self.self_id,
                self_endpoint: self.self_endpoint,
                allow_cors: self.config.allow_cors.clone(),
                agent_update_interval: Duration::from_secs(self.config.agent_update_interval_seconds),
                peer_check_interval: Duration::from_secs(self.config.peer_check_interval_seconds),
                version: env!("CARGO_PKG_VERSION").to_string(),
                build: "unknown".to_string(),
                api_version: 1,
            },
            Some(self.metrics),
        );

        let bind_addr: SocketAddr = format!("0.0.0.0:{}", self.config.port)
            .parse()
            .context("invalid bind address")?;
        ApiServer::new(bind_addr, api_state).run().await
    }
}

/// Probes the default outbound route to discover a non-loopback IPv4
/// address, per §6's "default ... first non-loopback IPv4". No packets are
/// actually sent; `connect` on a UDP socket only resolves the local route.
fn discover_non_loopback_address() -> String {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".into())
}
