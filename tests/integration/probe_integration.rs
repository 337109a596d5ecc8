// Probe runs against a wiremock stand-in for api.dropboxapi.com.
//
// The RecordingGate notes how many requests the server had seen at the
// moment the operator was asked to continue, which pins the ordering
// "call 1 → gate → call 2".

use async_trait::async_trait;
use cursor_probe::cmd::{run_probe, Cli};
use cursor_probe::config::ProbeConfig;
use cursor_probe::errors::{FaultKind, ProbeError, Result};
use cursor_probe::probe::{execute, PacingGate, CONTINUE_PROMPT, SUCCESS_MESSAGE};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LATEST: &str = "/2/files/list_folder/get_latest_cursor";
const CONTINUE: &str = "/2/files/list_folder/continue";

struct RecordingGate<'a> {
    server: &'a MockServer,
    seen: Vec<usize>,
}

impl<'a> RecordingGate<'a> {
    fn new(server: &'a MockServer) -> Self {
        Self {
            server,
            seen: Vec::new(),
        }
    }
}

#[async_trait]
impl PacingGate for RecordingGate<'_> {
    async fn wait(&mut self) -> Result<()> {
        let n = self
            .server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0);
        self.seen.push(n);
        Ok(())
    }
}

struct ClosedStdin;

#[async_trait]
impl PacingGate for ClosedStdin {
    async fn wait(&mut self) -> Result<()> {
        Err(ProbeError::Unexpected(
            "EOF when reading a line from stdin".to_string(),
        ))
    }
}

fn token(_: &str) -> Option<String> {
    Some("test-token".to_string())
}

fn config_for(server: &MockServer) -> ProbeConfig {
    ProbeConfig::with_api_base(&server.uri()).unwrap()
}

async fn mount_latest(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(LATEST))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_continue(server: &MockServer, body: Value, calls: u64) {
    Mock::given(method("POST"))
        .and(path(CONTINUE))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

async fn paths_seen(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_missing_token_makes_no_request() {
    let server = MockServer::start().await;
    let mut gate = RecordingGate::new(&server);
    let mut out: Vec<u8> = Vec::new();

    let err = execute(&config_for(&server), |_| None, &mut gate, &mut out)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FaultKind::MissingCredential);
    assert!(paths_seen(&server).await.is_empty());
    assert!(gate.seen.is_empty());
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_cursor_extracted_and_gate_runs_before_continue() {
    let server = MockServer::start().await;
    mount_latest(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"cursor": "abc123", "has_more": false})),
    )
    .await;
    mount_continue(&server, json!({"entries": [], "has_more": false}), 1).await;

    let mut gate = RecordingGate::new(&server);
    let mut out: Vec<u8> = Vec::new();
    let report = execute(&config_for(&server), token, &mut gate, &mut out)
        .await
        .unwrap();

    assert_eq!(report.cursor.as_str(), "abc123");
    assert_eq!(gate.seen, vec![1], "gate must run after call 1 and before call 2");
    assert_eq!(paths_seen(&server).await, vec![LATEST, CONTINUE]);

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Extracted cursor: abc123"));
    let prompt_at = out.find(CONTINUE_PROMPT).unwrap();
    let step2_at = out.find("Step 2").unwrap();
    assert!(prompt_at < step2_at);
}

#[tokio::test]
async fn test_conflict_stops_before_continue() {
    let server = MockServer::start().await;
    mount_latest(
        &server,
        ResponseTemplate::new(409).set_body_string(r#"{"error_summary": "path/not_found/"}"#),
    )
    .await;
    mount_continue(&server, json!({}), 0).await;

    let mut gate = RecordingGate::new(&server);
    let mut out: Vec<u8> = Vec::new();
    let err = execute(&config_for(&server), token, &mut gate, &mut out)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FaultKind::TransportFailure);
    assert_eq!(err.status().map(|s| s.as_u16()), Some(409));
    match &err {
        ProbeError::Status { body, .. } => {
            assert_eq!(body, r#"{"error_summary": "path/not_found/"}"#)
        }
        other => panic!("Expected Status error, got {other:?}"),
    }
    assert!(gate.seen.is_empty());
    assert_eq!(paths_seen(&server).await, vec![LATEST]);
}

#[tokio::test]
async fn test_missing_cursor_stops_before_continue() {
    let server = MockServer::start().await;
    mount_latest(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"has_more": false})),
    )
    .await;
    mount_continue(&server, json!({}), 0).await;

    let mut gate = RecordingGate::new(&server);
    let mut out: Vec<u8> = Vec::new();
    let err = execute(&config_for(&server), token, &mut gate, &mut out)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FaultKind::MissingCursor);
    assert!(gate.seen.is_empty());
    assert_eq!(paths_seen(&server).await, vec![LATEST]);

    // The first response is still shown before the cursor check fails.
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Response 1:"));
    assert!(out.contains("\"has_more\": false"));
}

#[tokio::test]
async fn test_continue_receives_cursor_and_run_succeeds() {
    let server = MockServer::start().await;
    mount_latest(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"cursor": "xyz"})),
    )
    .await;
    mount_continue(&server, json!({"entries": [], "has_more": false}), 1).await;

    let mut gate = RecordingGate::new(&server);
    let mut out: Vec<u8> = Vec::new();
    let report = execute(&config_for(&server), token, &mut gate, &mut out)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second, json!({"cursor": "xyz"}));

    assert_eq!(report.page, json!({"entries": [], "has_more": false}));
    let summary = report.summary.unwrap();
    assert_eq!(summary.entries(), 0);
    assert!(!summary.has_more);

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Response 2:"));
    assert!(out.trim_end().ends_with(SUCCESS_MESSAGE));
}

#[tokio::test]
async fn test_non_json_first_response_is_decode_failure() {
    let server = MockServer::start().await;
    mount_latest(
        &server,
        ResponseTemplate::new(200).set_body_string("definitely not json"),
    )
    .await;
    mount_continue(&server, json!({}), 0).await;

    let mut gate = RecordingGate::new(&server);
    let mut out: Vec<u8> = Vec::new();
    let err = execute(&config_for(&server), token, &mut gate, &mut out)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FaultKind::DecodeFailure);
    assert!(gate.seen.is_empty());
}

#[tokio::test]
async fn test_continue_failure_is_reported() {
    let server = MockServer::start().await;
    mount_latest(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"cursor": "xyz"})),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(CONTINUE))
        .respond_with(
            ResponseTemplate::new(409).set_body_string(r#"{"error_summary": "reset/..."}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut gate = RecordingGate::new(&server);
    let mut out: Vec<u8> = Vec::new();
    let err = execute(&config_for(&server), token, &mut gate, &mut out)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FaultKind::TransportFailure);
    assert_eq!(gate.seen, vec![1]);
    let out = String::from_utf8(out).unwrap();
    assert!(!out.contains(SUCCESS_MESSAGE));
}

#[tokio::test]
async fn test_closed_stdin_is_unexpected_failure() {
    let server = MockServer::start().await;
    mount_latest(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"cursor": "xyz"})),
    )
    .await;
    mount_continue(&server, json!({}), 0).await;

    let mut out: Vec<u8> = Vec::new();
    let err = execute(&config_for(&server), token, &mut ClosedStdin, &mut out)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FaultKind::UnexpectedFailure);
}

#[tokio::test]
async fn test_run_probe_reports_instead_of_failing() {
    let server = MockServer::start().await;
    let cli = Cli {
        api_base: "not a url".to_string(),
    };
    let mut gate = RecordingGate::new(&server);
    let mut out: Vec<u8> = Vec::new();

    let report = run_probe(&cli, &mut gate, &mut out).await;

    assert!(report.is_none());
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("Unexpected error: URL parse error"));
    assert!(paths_seen(&server).await.is_empty());
}
