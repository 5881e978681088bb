//! HTTP transport glue over the coordinator core (§6): axum routing, JSON
//! codec, conditional-GET/JSONP support. All domain logic lives in the
//! `pulsewatch_repo`/`pulsewatch_agentconfig`/`pulsewatch_alerting`/
//! `pulsewatch_peers` crates this one calls into.

mod bytesize;
mod conditional;
mod error;
mod jsonp;
pub mod routes;
mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, ApiState};

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

/// Binds the full route table and serves it until a shutdown signal arrives.
pub struct ApiServer {
    addr: SocketAddr,
    state: ApiState,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, state: ApiState) -> Self {
        Self { addr, state }
    }

    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        info!(addr = %self.addr, "API server listening");

        let app = routes::router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("api server terminated with error")
    }
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::warn!(?err, "ctrl-c listener failed");
    }
}
