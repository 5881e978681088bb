//! Alert delivery (§4.11.E): one [`AlertSink`] implementation per
//! [`AlertKind`].

use std::collections::{BTreeMap, HashSet};
use std::process::Command;

use parking_lot::Mutex;
use thiserror::Error;

use pulsewatch_model::{Alert, AlertKind, CheckStatus};

use crate::template::render;
use crate::tokenizer::tokenize;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("exec sink: {0}")]
    Exec(String),
    #[error("email sink: {0}")]
    Email(String),
    #[error("no sink registered for alert kind {0:?}")]
    UnknownKind(AlertKind),
}

/// Everything a sink needs to render and fire one alert.
#[derive(Debug, Clone)]
pub struct FireContext {
    pub subject_id: String,
    pub subject_name: String,
    pub check_id: String,
    pub check_name: String,
    pub status: CheckStatus,
    pub prior_status: CheckStatus,
}

impl FireContext {
    fn template_values(&self) -> BTreeMap<&'static str, String> {
        let mut values = BTreeMap::new();
        values.insert("subject_id", self.subject_id.clone());
        values.insert("subject_name", self.subject_name.clone());
        values.insert("check_id", self.check_id.clone());
        values.insert("check_name", self.check_name.clone());
        values.insert("status", format!("{:?}", self.status));
        values.insert("prior_status", format!("{:?}", self.prior_status));
        values
    }
}

pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &Alert, ctx: &FireContext) -> Result<(), DeliveryError>;
}

/// Dispatches to the sink registered for `alert.kind`.
pub struct SinkRegistry {
    exec: ExecSink,
    email: EmailSink,
    #[cfg(any(test, feature = "mock-alerts"))]
    mock: MockSink,
}

impl SinkRegistry {
    pub fn new(email: EmailSink) -> Self {
        Self {
            exec: ExecSink,
            email,
            #[cfg(any(test, feature = "mock-alerts"))]
            mock: MockSink::default(),
        }
    }

    #[cfg(any(test, feature = "mock-alerts"))]
    pub fn mock(&self) -> &MockSink {
        &self.mock
    }

    pub fn deliver(&self, alert: &Alert, ctx: &FireContext) -> Result<(), DeliveryError> {
        match alert.kind {
            AlertKind::Exec => self.exec.deliver(alert, ctx),
            AlertKind::Email => self.email.deliver(alert, ctx),
            #[cfg(any(test, feature = "mock-alerts"))]
            AlertKind::Mock => self.mock.deliver(alert, ctx),
            #[cfg(not(any(test, feature = "mock-alerts")))]
            AlertKind::Mock => Err(DeliveryError::UnknownKind(alert.kind)),
            AlertKind::PagerDuty => Err(DeliveryError::UnknownKind(alert.kind)),
        }
    }
}

/// Renders `command` as a template, tokenizes it shell-style, and spawns it.
pub struct ExecSink;

impl AlertSink for ExecSink {
    fn deliver(&self, alert: &Alert, ctx: &FireContext) -> Result<(), DeliveryError> {
        let template = alert
            .params
            .get("command")
            .ok_or_else(|| DeliveryError::Exec("missing `command` parameter".into()))?;
        let rendered = render(template, &ctx.template_values());
        let mut argv = tokenize(&rendered);
        if argv.is_empty() {
            return Err(DeliveryError::Exec("command template rendered to no tokens".into()));
        }
        let program = argv.remove(0);
        let status = Command::new(program)
            .args(argv)
            .status()
            .map_err(|e| DeliveryError::Exec(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(DeliveryError::Exec(format!("exited with {status}")))
        }
    }
}

/// SMTP configuration shared by every fired email alert, resolved from the
/// coordinator's configuration (§6: `EmailFrom`/`SMTPHost/Port/User/Password`).
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
}

pub struct EmailSink {
    config: SmtpConfig,
}

impl EmailSink {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<lettre::SmtpTransport, DeliveryError> {
        lettre::SmtpTransport::relay(&self.config.host)
            .map_err(|e| DeliveryError::Email(e.to_string()))
            .map(|builder| {
                builder
                    .port(self.config.port)
                    .credentials(lettre::transport::smtp::authentication::Credentials::new(
                        self.config.user.clone(),
                        self.config.password.clone(),
                    ))
                    .build()
            })
    }
}

impl AlertSink for EmailSink {
    fn deliver(&self, alert: &Alert, ctx: &FireContext) -> Result<(), DeliveryError> {
        let values = ctx.template_values();
        let subject_template = alert
            .params
            .get("subject")
            .ok_or_else(|| DeliveryError::Email("missing `subject` parameter".into()))?;
        let body_template = alert
            .params
            .get("body")
            .ok_or_else(|| DeliveryError::Email("missing `body` parameter".into()))?;
        let to = alert
            .params
            .get("to")
            .ok_or_else(|| DeliveryError::Email("missing `to` parameter".into()))?;

        let message = lettre::Message::builder()
            .from(self.config.from.parse().map_err(|e: lettre::address::AddressError| DeliveryError::Email(e.to_string()))?)
            .to(to.parse().map_err(|e: lettre::address::AddressError| DeliveryError::Email(e.to_string()))?)
            .subject(render(subject_template, &values))
            .body(render(body_template, &values))
            .map_err(|e| DeliveryError::Email(e.to_string()))?;

        use lettre::Transport;
        self.transport()?
            .send(&message)
            .map_err(|e| DeliveryError::Email(e.to_string()))?;
        Ok(())
    }
}

/// Test-only sink: records `"<subject_id>/<check_id>"` into a process-wide
/// observable set instead of delivering anything.
#[cfg(any(test, feature = "mock-alerts"))]
#[derive(Default)]
pub struct MockSink {
    fired: Mutex<HashSet<String>>,
}

#[cfg(any(test, feature = "mock-alerts"))]
impl MockSink {
    pub fn fired(&self) -> HashSet<String> {
        self.fired.lock().clone()
    }
}

#[cfg(any(test, feature = "mock-alerts"))]
impl AlertSink for MockSink {
    fn deliver(&self, _alert: &Alert, ctx: &FireContext) -> Result<(), DeliveryError> {
        self.fired.lock().insert(format!("{}/{}", ctx.subject_id, ctx.check_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FireContext {
        FireContext {
            subject_id: "subj-1".into(),
            subject_name: "host1".into(),
            check_id: "check-1".into(),
            check_name: "disk".into(),
            status: CheckStatus::Critical,
            prior_status: CheckStatus::Ok,
        }
    }

    #[test]
    fn mock_sink_records_subject_and_check() {
        let sink = MockSink::default();
        let alert = Alert {
            id: pulsewatch_ids::Id::new(),
            name: "page-oncall".into(),
            kind: AlertKind::Mock,
            params: BTreeMap::new(),
            reminder_interval_minutes: 15,
            roles: Default::default(),
            tags: Default::default(),
            modified: chrono::Utc::now(),
        };
        sink.deliver(&alert, &ctx()).unwrap();
        assert_eq!(sink.fired(), HashSet::from(["subj-1/check-1".to_string()]));
    }

    #[test]
    fn exec_sink_runs_rendered_command() {
        let mut params = BTreeMap::new();
        params.insert("command".to_string(), "true".to_string());
        let alert = Alert {
            id: pulsewatch_ids::Id::new(),
            name: "noop".into(),
            kind: AlertKind::Exec,
            params,
            reminder_interval_minutes: 0,
            roles: Default::default(),
            tags: Default::default(),
            modified: chrono::Utc::now(),
        };
        ExecSink.deliver(&alert, &ctx()).unwrap();
    }
}
