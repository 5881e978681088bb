use std::path::{Path, PathBuf};

use config::{Config, ConfigError as BuilderError, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

/// Coordinator configuration (§6 "Configuration file"). Field names match
/// the JSON keys the spec names verbatim, including the non-uniform casing
/// of the SMTP group.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "Port", default = "default_port")]
    pub port: u16,
    #[serde(rename = "Address", default)]
    pub address: Option<String>,
    #[serde(rename = "AllowCors", default)]
    pub allow_cors: String,
    #[serde(rename = "AgentUpdateInterval", default = "default_agent_update_interval")]
    pub agent_update_interval_seconds: u64,
    #[serde(rename = "PeerUpdateInterval", default = "default_peer_update_interval")]
    pub peer_update_interval_seconds: u64,
    #[serde(rename = "PeerCheckInterval", default = "default_peer_check_interval")]
    pub peer_check_interval_seconds: u64,
    #[serde(rename = "RemoteCheckUpdateInterval", default = "default_remote_check_update_interval")]
    pub remote_check_update_interval_seconds: u64,
    #[serde(rename = "RemoteCheckAssignInterval", default = "default_remote_check_assign_interval")]
    pub remote_check_assign_interval_seconds: u64,
    #[serde(rename = "MongoHost", default)]
    pub mongo_host: String,
    #[serde(rename = "MongoDatabase", default)]
    pub mongo_database: String,
    #[serde(rename = "MongoUser", default)]
    pub mongo_user: String,
    #[serde(rename = "MongoPassword", default)]
    pub mongo_password: String,
    #[serde(rename = "BootstrapPeers", default)]
    pub bootstrap_peers: Vec<String>,
    #[serde(rename = "SMTPHost", default)]
    pub smtp_host: String,
    #[serde(rename = "SMTPPort", default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(rename = "SMTPUser", default)]
    pub smtp_user: String,
    #[serde(rename = "SMTPPassword", default)]
    pub smtp_password: String,
    #[serde(rename = "EmailFrom", default)]
    pub email_from: String,

    #[serde(default)]
    pub observability: ObservabilitySection,
}

fn default_port() -> u16 {
    13100
}

fn default_agent_update_interval() -> u64 {
    60
}

fn default_peer_update_interval() -> u64 {
    10
}

fn default_peer_check_interval() -> u64 {
    5
}

fn default_remote_check_update_interval() -> u64 {
    30
}

fn default_remote_check_assign_interval() -> u64 {
    60
}

fn default_smtp_port() -> u16 {
    25
}

/// Not part of §6's recognized option table, but carried per the ambient
/// logging/metrics stack (§1.E) so a single configuration file drives both.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilitySection {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for ObservabilitySection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

/// CLI-sourced overrides (§6 "CLI": `--port`, `--address`, `--peers`, plus
/// `--config`), applied after file and environment sources.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub profile: Option<String>,
    pub port: Option<u16>,
    pub address: Option<String>,
    pub peers: Vec<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Builder(#[from] BuilderError),
}

/// Layered load: built-in defaults -> optional profile file -> explicit
/// `--config` file -> `PULSEWATCH__*` environment variables -> CLI flags.
pub fn load(overrides: ConfigOverrides) -> Result<CoordinatorConfig, ConfigError> {
    let mut builder = Config::builder()
        .set_default("Port", default_port() as i64)?
        .set_default("AllowCors", "")?
        .set_default("AgentUpdateInterval", default_agent_update_interval() as i64)?
        .set_default("PeerUpdateInterval", default_peer_update_interval() as i64)?
        .set_default("PeerCheckInterval", default_peer_check_interval() as i64)?
        .set_default(
            "RemoteCheckUpdateInterval",
            default_remote_check_update_interval() as i64,
        )?
        .set_default(
            "RemoteCheckAssignInterval",
            default_remote_check_assign_interval() as i64,
        )?
        .set_default("MongoHost", "")?
        .set_default("MongoDatabase", "")?
        .set_default("MongoUser", "")?
        .set_default("MongoPassword", "")?
        .set_default("BootstrapPeers", Vec::<String>::new())?
        .set_default("SMTPHost", "")?
        .set_default("SMTPPort", default_smtp_port() as i64)?
        .set_default("SMTPUser", "")?
        .set_default("SMTPPassword", "")?
        .set_default("EmailFrom", "")?;

    if let Some(profile) = overrides.profile.as_deref() {
        let profile_file = format!("{profile}.json");
        builder = builder.add_source(optional_file(".", &profile_file));
    }

    if let Some(path) = &overrides.config_path {
        builder = builder.add_source(File::from(path.clone()).format(FileFormat::Json));
    }

    builder = builder.add_source(Environment::with_prefix("PULSEWATCH").separator("__"));

    if let Some(port) = overrides.port {
        builder = builder.set_override("Port", port as i64)?;
    }
    if let Some(address) = overrides.address {
        builder = builder.set_override("Address", address)?;
    }
    if !overrides.peers.is_empty() {
        builder = builder.set_override("BootstrapPeers", overrides.peers)?;
    }
    if let Some(log_level) = overrides.log_level {
        builder = builder.set_override("observability.log_level", log_level)?;
    }
    if let Some(log_format) = overrides.log_format {
        builder = builder.set_override("observability.log_format", log_format)?;
    }

    let config = builder.build()?;
    config
        .try_deserialize()
        .map_err(|err| ConfigError::Message(format!("invalid configuration: {err}")))
}

fn optional_file(dir: &str, name: &str) -> File<config::FileSourceFile, FileFormat> {
    File::from(Path::new(dir).join(name))
        .required(false)
        .format(FileFormat::Json)
}
