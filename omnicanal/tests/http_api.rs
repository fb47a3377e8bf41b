//! Integration tests for the HTTP API
//!
//! Drives the full router with a recording transport and templates in a
//! temporary directory.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use axum_test::TestServer;
use omnicanal::{
    config::OmnicanalConfig,
    email::{EmailSender, Sender},
    middleware::REQUEST_ID_HEADER,
    routes::router,
    state::AppState,
    testing::RecordingTransport,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const WELCOME_MJML: &str = "<mjml><mj-body><mj-section><mj-column>\
    <mj-text>Hello {{ name }}</mj-text>\
    </mj-column></mj-section></mj-body></mjml>";

struct Harness {
    server: TestServer,
    transport: RecordingTransport,
    _dir: TempDir,
}

fn config(dir: &TempDir) -> OmnicanalConfig {
    let mut config = OmnicanalConfig::default();
    config.app.env = "development".to_string();
    config.logging.request_logging = true;
    config.templates.template_dir = dir.path().to_path_buf();
    config.templates.attachment_dir = dir.path().to_path_buf();
    config
}

fn state(config: OmnicanalConfig, transport: &RecordingTransport) -> AppState {
    let sender = EmailSender::new(
        Arc::new(transport.clone()),
        Sender::new("noreply@example.com", Some("Omnicanal".to_string())),
    )
    .with_template_dir(&config.templates.template_dir)
    .with_attachment_dir(&config.templates.attachment_dir);

    AppState::new(config, sender)
}

fn template_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("welcome.mjml"), WELCOME_MJML).unwrap();
    std::fs::write(dir.path().join("status.html"), "<p>Status for {{ name }}</p>").unwrap();
    std::fs::write(dir.path().join("terms.pdf"), b"%PDF-1.4").unwrap();
    dir
}

fn harness(transport: RecordingTransport) -> Harness {
    let dir = template_dir();
    let app = router(state(config(&dir), &transport));

    Harness {
        server: TestServer::new(app).unwrap(),
        transport,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_index_reports_service() {
    let h = harness(RecordingTransport::new());

    let response = h.server.get("/").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["service"], "omnicanal");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_send_delivers_rendered_message() {
    let h = harness(RecordingTransport::new());

    let response = h
        .server
        .post("/email/send")
        .json(&json!({
            "to": "juan@example.com",
            "subject": "Welcome",
            "template": "welcome.mjml",
            "variables": {"name": "Juan"},
            "attachments": ["terms.pdf"],
            "cc": ["manager@example.com"]
        }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"success": true}));

    let envelope = h.transport.sent_to("juan@example.com").unwrap();
    assert_eq!(envelope.subject, "Welcome");
    assert!(envelope.html.contains("Hello Juan"));
    assert_eq!(envelope.cc, vec!["manager@example.com"]);
    assert_eq!(envelope.attachments.len(), 1);
    assert_eq!(envelope.attachments[0].filename, "terms.pdf");
}

#[tokio::test]
async fn test_send_reports_failure_without_detail() {
    let h = harness(RecordingTransport::new().failing_for("bounce@example.com"));

    let missing_template = h
        .server
        .post("/email/send")
        .json(&json!({
            "to": "juan@example.com",
            "subject": "Welcome",
            "template": "missing.mjml",
            "variables": {"name": "Juan"}
        }))
        .await;
    missing_template.assert_status_ok();
    missing_template.assert_json(&json!({"success": false}));

    let missing_attachment = h
        .server
        .post("/email/send")
        .json(&json!({
            "to": "juan@example.com",
            "subject": "Welcome",
            "template": "welcome.mjml",
            "variables": {"name": "Juan"},
            "attachments": ["missing.pdf"]
        }))
        .await;
    missing_attachment.assert_json(&json!({"success": false}));

    let rejected = h
        .server
        .post("/email/send")
        .json(&json!({
            "to": "bounce@example.com",
            "subject": "Welcome",
            "template": "welcome.mjml",
            "variables": {"name": "Juan"}
        }))
        .await;
    rejected.assert_json(&json!({"success": false}));

    assert_eq!(h.transport.sent_count(), 0);
    assert_eq!(h.transport.attempts(), 1);
}

#[tokio::test]
async fn test_send_rejects_invalid_payload() {
    let h = harness(RecordingTransport::new());

    let response = h
        .server
        .post("/email/send")
        .json(&json!({
            "to": "not-an-address",
            "subject": "Welcome",
            "template": "welcome.mjml"
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["status_code"], 422);
    assert!(body["message"].as_str().unwrap().contains("to"));
    assert_eq!(h.transport.attempts(), 0);
}

#[tokio::test]
async fn test_send_missing_field_returns_json_error() {
    let h = harness(RecordingTransport::new());

    let response = h
        .server
        .post("/email/send")
        .json(&json!({"to": "a@example.com"}))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["status_code"], 422);
    let message = body["message"].as_str().unwrap();
    assert!(!message.contains("line 1 column"));
    assert_eq!(h.transport.attempts(), 0);
}

#[tokio::test]
async fn test_malformed_bodies_return_json_errors() {
    let h = harness(RecordingTransport::new());

    let not_json = h
        .server
        .post("/email/send")
        .text(r#"{"to": "a@example.com""#)
        .content_type("application/json")
        .await;
    not_json.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(not_json.json::<Value>()["status_code"], 400);

    let wrong_type = h
        .server
        .post("/email/bulk")
        .text("recipients=a@example.com")
        .await;
    wrong_type.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = wrong_type.json();
    assert_eq!(body["status_code"], 415);
    assert_eq!(body["message"], "expected Content-Type: application/json");

    assert_eq!(h.transport.attempts(), 0);
}

#[tokio::test]
async fn test_send_rejects_escaping_paths() {
    let h = harness(RecordingTransport::new());

    for (template, attachment) in [("../welcome.mjml", "terms.pdf"), ("welcome.mjml", "/etc/passwd")] {
        let response = h
            .server
            .post("/email/send")
            .json(&json!({
                "to": "juan@example.com",
                "subject": "Welcome",
                "template": template,
                "variables": {"name": "Juan"},
                "attachments": [attachment]
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    assert_eq!(h.transport.attempts(), 0);
}

#[tokio::test]
async fn test_bulk_partitions_recipients() {
    let h = harness(RecordingTransport::new().failing_for("b@example.com"));

    let response = h
        .server
        .post("/email/bulk")
        .json(&json!({
            "recipients": [
                {"email": "a@example.com", "variables": {"name": "A"}},
                {"email": "b@example.com", "variables": {"name": "B"}},
                {"email": "c@example.com", "variables": {"name": "C"}}
            ],
            "subject": "Status - {name}",
            "template": "status.html"
        }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "delivered": ["a@example.com", "c@example.com"],
        "failed": ["b@example.com"]
    }));

    let a = h.transport.sent_to("a@example.com").unwrap();
    assert_eq!(a.subject, "Status - A");
    assert_eq!(a.html, "<p>Status for A</p>");
    assert_eq!(h.transport.sent_to("c@example.com").unwrap().subject, "Status - C");
}

#[tokio::test]
async fn test_bulk_with_no_recipients() {
    let h = harness(RecordingTransport::new());

    let response = h
        .server
        .post("/email/bulk")
        .json(&json!({
            "recipients": [],
            "subject": "Status - {name}",
            "template": "status.html"
        }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"delivered": [], "failed": []}));
    assert_eq!(h.transport.attempts(), 0);
}

#[tokio::test]
async fn test_bulk_rejects_invalid_recipient() {
    let h = harness(RecordingTransport::new());

    let response = h
        .server
        .post("/email/bulk")
        .json(&json!({
            "recipients": [{"email": "nope", "variables": {"name": "A"}}],
            "subject": "Status - {name}",
            "template": "status.html"
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_request_id_header_when_logging_enabled() {
    let h = harness(RecordingTransport::new());

    let response = h.server.get("/").await;
    let id = response.header(REQUEST_ID_HEADER);
    let id = id.to_str().unwrap();

    assert_eq!(id.len(), 16);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_no_request_id_when_logging_disabled() {
    let dir = template_dir();
    let transport = RecordingTransport::new();
    let mut config = config(&dir);
    config.logging.request_logging = false;

    let server = TestServer::new(router(state(config, &transport))).unwrap();
    let response = server.get("/").await;

    response.assert_status_ok();
    assert!(response.headers().get(REQUEST_ID_HEADER).is_none());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let dir = template_dir();
    let transport = RecordingTransport::new();
    let mut config = config(&dir);
    config.server.body_limit_bytes = 64;

    let app = router(state(config, &transport));
    let body = json!({
        "to": "juan@example.com",
        "subject": "x".repeat(256),
        "template": "welcome.mjml"
    })
    .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/email/send")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(transport.attempts(), 0);
}
