//! Thin binary wrapper (§1, §6): parses the CLI, loads configuration, and
//! hands off to [`pulsewatch::Coordinator`] for the actual wiring and run
//! loop.

use anyhow::{Context, Result};
use clap::Parser;

use pulsewatch::Coordinator;
use pulsewatch_config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(author, version, about = "pulsewatch coordinator", long_about = None)]
struct Cli {
    /// Path to a JSON configuration file (§6).
    #[arg(long = "config", short = 'c')]
    config: Option<std::path::PathBuf>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    address: Option<String>,

    /// Bootstrap peer endpoints, comma-separated.
    #[arg(long, value_delimiter = ',')]
    peers: Vec<String>,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long)]
    log_format: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = pulsewatch_config::load(ConfigOverrides {
        config_path: cli.config,
        profile: None,
        port: cli.port,
        address: cli.address,
        peers: cli.peers,
        log_level: cli.log_level,
        log_format: cli.log_format,
    })
    .context("failed to load coordinator configuration")?;

    let runtime = tokio::runtime::Runtime::new().context("failed to build tokio runtime")?;
    runtime.block_on(async move { Coordinator::build(config).await?.run().await })
}
