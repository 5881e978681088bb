use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pulsewatch_ids::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CheckKind {
    Exec,
    Http,
    Port,
    Memory,
    Cpu,
    Disk,
    AgentDown,
    Version,
}

impl CheckKind {
    /// Locally-executed kinds (§4.2 step 3); the remainder are remote.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            CheckKind::Exec
                | CheckKind::Http
                | CheckKind::Port
                | CheckKind::Memory
                | CheckKind::Cpu
                | CheckKind::Disk
        )
    }

    pub fn is_remote(self) -> bool {
        !self.is_local()
    }

    /// Parameter keys required by this kind, per §3 Check invariant.
    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            CheckKind::Exec => &["command"],
            CheckKind::Http => &["url"],
            CheckKind::Port => &["port"],
            CheckKind::Memory | CheckKind::Cpu | CheckKind::Disk => &["warning", "critical"],
            CheckKind::AgentDown => &["warning", "critical"],
            CheckKind::Version => &[],
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("check kind {kind:?} is missing required parameter {missing:?}")]
pub struct MissingParameterError {
    pub kind: CheckKind,
    pub missing: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
    pub id: Id,
    pub name: String,
    pub kind: CheckKind,
    pub params: BTreeMap<String, String>,
    pub interval_seconds: u64,
    pub roles: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub modified: DateTime<Utc>,
}

impl Check {
    /// Validate the invariant from §3: the parameter map must carry the key
    /// set required by its kind.
    pub fn validate_params(&self) -> Result<(), MissingParameterError> {
        for key in self.kind.required_params() {
            if !self.params.contains_key(*key) {
                return Err(MissingParameterError {
                    kind: self.kind,
                    missing: key,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(kind: CheckKind, params: &[(&str, &str)]) -> Check {
        Check {
            id: Id::new(),
            name: "test".into(),
            kind,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            interval_seconds: 60,
            roles: BTreeSet::new(),
            tags: BTreeSet::new(),
            modified: Utc::now(),
        }
    }

    #[test]
    fn exec_requires_command() {
        assert!(check(CheckKind::Exec, &[]).validate_params().is_err());
        assert!(check(CheckKind::Exec, &[("command", "true")])
            .validate_params()
            .is_ok());
    }

    #[test]
    fn agent_down_requires_warning_and_critical() {
        let err = check(CheckKind::AgentDown, &[("warning", "1m")])
            .validate_params()
            .unwrap_err();
        assert_eq!(err.missing, "critical");
    }

    #[test]
    fn local_vs_remote_classification() {
        assert!(CheckKind::Http.is_local());
        assert!(CheckKind::AgentDown.is_remote());
        assert!(CheckKind::Version.is_remote());
    }
}
