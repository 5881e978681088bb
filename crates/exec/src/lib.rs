//! Remote-check execution loop (§4.4): per-owned-state tasks that execute
//! `AgentDown`/`Version` checks and funnel results through
//! `pulsewatch_alerting::record_result`.

mod duration;
mod executors;
mod reconcile;
mod semver;

pub use executors::{execute_agent_down, execute_version};
pub use reconcile::{spawn_reconcile_loop, Reconciler};
pub use semver::{compare as compare_semver, InvalidSemVer};

use thiserror::Error;

use pulsewatch_repo::RepoError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),
}
