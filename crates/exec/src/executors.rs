//! Per-kind check execution (§4.4): `AgentDown` and `Version`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use pulsewatch_model::{Check, CheckStatus, Subject};

use crate::duration::parse_duration;
use crate::semver::compare as compare_semver;

/// `AgentDown`: compares elapsed time since the subject's last check-in
/// against the `critical` threshold before `warning` (§4.6.E item 3 — the
/// reconciled, non-swapped ordering).
pub fn execute_agent_down(subject: &Subject, check: &Check, now: DateTime<Utc>) -> CheckStatus {
    let warning = check.params.get("warning").and_then(|raw| parse_duration(raw).ok()).unwrap_or_else(Duration::zero);
    let critical = check.params.get("critical").and_then(|raw| parse_duration(raw).ok()).unwrap_or_else(Duration::zero);

    // A subject with no recorded check-in has nothing to compare against;
    // treat it as freshly checked-in rather than failing the check.
    let last_check_in = subject.last_check_in.unwrap_or(now);
    let elapsed = now - last_check_in;

    if critical > Duration::zero() && elapsed > critical {
        CheckStatus::Critical
    } else if warning > Duration::zero() && elapsed > warning {
        CheckStatus::Warning
    } else {
        CheckStatus::Ok
    }
}

/// `Version`: GETs a version manifest and compares our build version against
/// the entry selected by the check's `type` parameter (default `stable`).
pub async fn execute_version(check: &Check, client: &reqwest::Client, manifest_url: &str, our_version: &str) -> CheckStatus {
    let response = match client.get(manifest_url).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            warn!(status = %response.status(), "version manifest request failed");
            return CheckStatus::Failed;
        }
        Err(err) => {
            warn!(%err, "version manifest request failed");
            return CheckStatus::Failed;
        }
    };

    let manifest: BTreeMap<String, String> = match response.json().await {
        Ok(manifest) => manifest,
        Err(err) => {
            warn!(%err, "version manifest body was not valid JSON");
            return CheckStatus::Failed;
        }
    };

    let requested_type = check.params.get("type").map(String::as_str).unwrap_or("stable");
    let latest = manifest
        .get(requested_type)
        .filter(|v| !v.is_empty())
        .or_else(|| manifest.get("stable"))
        .cloned()
        .unwrap_or_default();

    match compare_semver(our_version, &latest) {
        Ok(cmp) if cmp < 0 => CheckStatus::Warning,
        Ok(_) => CheckStatus::Ok,
        Err(_) => CheckStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsewatch_ids::Id;
    use std::collections::BTreeSet;

    fn subject(last_check_in: Option<DateTime<Utc>>) -> Subject {
        Subject {
            id: Id::new(),
            name: "host1".into(),
            roles: BTreeSet::new(),
            modified: Utc::now(),
            last_check_in,
        }
    }

    fn agent_down_check(warning: &str, critical: &str) -> Check {
        Check {
            id: Id::new(),
            name: "agent-down".into(),
            kind: pulsewatch_model::CheckKind::AgentDown,
            params: BTreeMap::from([("warning".into(), warning.into()), ("critical".into(), critical.into())]),
            interval_seconds: 60,
            roles: BTreeSet::new(),
            tags: BTreeSet::new(),
            modified: Utc::now(),
        }
    }

    #[test]
    fn fresh_check_in_is_ok() {
        let now = Utc::now();
        let s = subject(Some(now));
        let c = agent_down_check("1m", "5m");
        assert_eq!(execute_agent_down(&s, &c, now), CheckStatus::Ok);
    }

    #[test]
    fn past_warning_but_not_critical_is_warning() {
        let now = Utc::now();
        let s = subject(Some(now - Duration::minutes(2)));
        let c = agent_down_check("1m", "5m");
        assert_eq!(execute_agent_down(&s, &c, now), CheckStatus::Warning);
    }

    #[test]
    fn past_both_thresholds_is_critical_not_warning() {
        let now = Utc::now();
        let s = subject(Some(now - Duration::minutes(10)));
        let c = agent_down_check("1m", "5m");
        assert_eq!(execute_agent_down(&s, &c, now), CheckStatus::Critical);
    }
}
