//! Router-level tests for the literal end-to-end scenarios in §8.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;

use pulsewatch_alerting::{EmailSink, SinkRegistry, SmtpConfig};
use pulsewatch_api::{routes::router, ApiConfig, ApiState};
use pulsewatch_ids::Id;
use pulsewatch_model::{Check, CheckKind};
use pulsewatch_peers::PeerMembership;
use pulsewatch_repo::{InMemoryRepository, Repository};

fn sinks() -> Arc<SinkRegistry> {
    Arc::new(SinkRegistry::new(EmailSink::new(SmtpConfig {
        host: "localhost".into(),
        port: 25,
        user: String::new(),
        password: String::new(),
        from: "pulsewatch@example.com".into(),
    })))
}

fn test_state(repo: Arc<dyn Repository>) -> ApiState {
    let self_id = Id::new();
    let peers = PeerMembership::spawn(self_id, "http://self:13100", reqwest::Client::new());
    ApiState::new(
        repo,
        peers,
        sinks(),
        ApiConfig {
            self_id,
            self_endpoint: "http://self:13100".into(),
            allow_cors: String::new(),
            agent_update_interval: Duration::from_secs(60),
            peer_check_interval: Duration::from_secs(5),
            version: "test".into(),
            build: "test".into(),
            api_version: 1,
        },
        None,
    )
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Scenario 1 (§8): bootstrap agent via `/api/configuration/host42?roles=...`.
#[tokio::test]
async fn bootstrap_agent_returns_name_coordinators_and_checks() {
    let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::open());
    let now = Utc::now();

    let check = Check {
        id: Id::new(),
        name: "Test OK".into(),
        kind: CheckKind::Http,
        params: [("url".to_string(), "http://localhost".to_string())].into_iter().collect(),
        interval_seconds: 60,
        roles: ["healthy".to_string()].into_iter().collect(),
        tags: Default::default(),
        modified: now,
    };
    repo.create_check(check.clone()).await.unwrap();

    let app = router(test_state(repo.clone()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/configuration/host42?roles=healthy,default")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "host42");
    assert_eq!(body["coordinators"], serde_json::json!(["http://self:13100"]));
    let checks = body["checks"].as_array().unwrap();
    assert!(checks.iter().any(|c| c["name"] == "Test OK"));

    let subject = repo.find_subject_by_name("host42").await.unwrap();
    assert!(subject.roles.contains("healthy") && subject.roles.contains("default"));
    assert!(subject.last_check_in.is_some());
}

/// Scenarios 2+3 (§8): alert fires once, reminders are stable on repeat,
/// and recovery clears them.
#[tokio::test]
async fn alert_fires_then_recovers() {
    let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::open());
    let now = Utc::now();

    let subject = pulsewatch_model::Subject::new("host1", ["default".to_string()].into_iter().collect(), now);
    let subject_id = subject.id;
    repo.create_subject(subject).await.unwrap();

    let check = Check {
        id: Id::new(),
        name: "disk".into(),
        kind: CheckKind::Disk,
        params: [("warning".to_string(), "80".to_string()), ("critical".to_string(), "90".to_string())]
            .into_iter()
            .collect(),
        interval_seconds: 60,
        roles: ["default".to_string()].into_iter().collect(),
        tags: ["default".to_string()].into_iter().collect(),
        modified: now,
    };
    let check_id = check.id;
    repo.create_check(check).await.unwrap();

    let alert = pulsewatch_model::Alert {
        id: Id::new(),
        name: "page".into(),
        kind: pulsewatch_model::AlertKind::Mock,
        params: Default::default(),
        reminder_interval_minutes: 0,
        roles: ["default".to_string()].into_iter().collect(),
        tags: ["default".to_string()].into_iter().collect(),
        modified: now,
    };
    repo.create_alert(alert).await.unwrap();

    let state = test_state(repo.clone());
    let app = router(state);

    let post_result = |subject_id: Id, check_id: Id, status: &'static str| {
        let body = serde_json::json!({
            "subjectId": subject_id.to_string(),
            "checkId": check_id.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
            "status": status,
        });
        Request::builder()
            .method("POST")
            .uri("/api/checkresults")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(post_result(subject_id, check_id, "Critical"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let sc_id = pulsewatch_model::SubjectCheckId::new(subject_id, check_id);
    let state_after_first = repo.find_state(sc_id).await.unwrap();
    assert_eq!(state_after_first.status, pulsewatch_model::CheckStatus::Critical);
    assert_eq!(state_after_first.reminders.len(), 1);

    // Repeat: still critical, reminder map unchanged in size (no duplicate entries).
    let response = app
        .clone()
        .oneshot(post_result(subject_id, check_id, "Critical"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let state_after_repeat = repo.find_state(sc_id).await.unwrap();
    assert_eq!(state_after_repeat.reminders.len(), 1);

    // Recovery clears reminders.
    let response = app.oneshot(post_result(subject_id, check_id, "Ok")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let state_after_recovery = repo.find_state(sc_id).await.unwrap();
    assert_eq!(state_after_recovery.status, pulsewatch_model::CheckStatus::Ok);
    assert!(state_after_recovery.reminders.is_empty());
}

#[tokio::test]
async fn up_returns_true_with_expires_header() {
    let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::open());
    let app = router(test_state(repo));
    let response = app
        .oneshot(Request::builder().uri("/api/up").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(axum::http::header::EXPIRES));
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!(true));
}

#[tokio::test]
async fn subject_crud_round_trips() {
    let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::open());
    let app = router(test_state(repo));

    let create_body = serde_json::json!({
        "id": Id::new().to_string(),
        "name": "crud-subject",
        "roles": ["default"],
        "modified": Utc::now().to_rfc3339(),
        "lastCheckIn": null,
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/subjects")
                .header("content-type", "application/json")
                .body(Body::from(create_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/subjects/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/subjects/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
