// Job lifecycle end to end over a scripted transport: launch, poll to
// a terminal state, timeout and cancellation semantics.

mod support;

use awx_mcp_server::domain::{AwxError, JobStatus};
use awx_mcp_server::jobs::{FailureCategory, JobEngine};
use serde_json::{json, Map};
use std::sync::Arc;
use std::time::Duration;
use support::{client_over, environment, job_json, FakeTransport};

fn engine_over(transport: Arc<FakeTransport>) -> JobEngine {
    let client = Arc::new(client_over(transport, environment("prod")));
    JobEngine::new(client)
}

#[tokio::test]
async fn launch_returns_pending_handle_with_extra_vars_sent() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(Ok(job_json(42, "pending")));

    let engine = engine_over(Arc::clone(&transport));
    let mut extra_vars = Map::new();
    extra_vars.insert("version".to_string(), json!("2.0.0"));
    let handle = engine.launch(7, Some(extra_vars)).await.expect("launch");

    assert_eq!(handle.id, 42);
    assert_eq!(handle.state, JobStatus::Pending);

    let calls = transport.calls();
    assert_eq!(calls[0].path, "job_templates/7/launch/");
    let body = calls[0].body.as_ref().expect("launch body");
    assert_eq!(body["extra_vars"]["version"], json!("2.0.0"));
}

#[tokio::test]
async fn wait_polls_through_running_to_successful() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(Ok(job_json(42, "pending")));
    transport.push_json(Ok(job_json(42, "running")));
    transport.push_json(Ok(job_json(42, "successful")));

    let engine = engine_over(Arc::clone(&transport));
    let mut handle = engine.launch(7, None).await.expect("launch");

    let state = engine
        .wait_for_terminal(
            &mut handle,
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
        .await
        .expect("terminal state");

    assert_eq!(state, JobStatus::Successful);
    assert_eq!(handle.state, JobStatus::Successful);
    // Launch + two polls.
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn wait_times_out_reporting_last_observed_state() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(Ok(job_json(42, "running")));
    transport.push_json(Ok(job_json(42, "running")));

    let engine = engine_over(Arc::clone(&transport));
    let mut handle = awx_mcp_server::jobs::JobHandle::new(42);

    let result = engine
        .wait_for_terminal(
            &mut handle,
            Duration::from_millis(500),
            Duration::from_millis(100),
        )
        .await;

    match result {
        Err(AwxError::Timeout { job_id, last_state }) => {
            assert_eq!(job_id, 42);
            assert_eq!(last_state, JobStatus::Running);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    // The deadline shortens the final sleep instead of cutting the
    // wait short, so a last poll happens at the deadline itself.
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn wait_shorter_than_poll_interval_still_polls_until_the_deadline() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(Ok(job_json(42, "running")));
    transport.push_json(Ok(job_json(42, "successful")));

    let engine = engine_over(Arc::clone(&transport));
    let mut handle = awx_mcp_server::jobs::JobHandle::new(42);

    let state = engine
        .wait_for_terminal(
            &mut handle,
            Duration::from_secs(60),
            Duration::from_millis(200),
        )
        .await
        .expect("terminal before deadline");

    assert_eq!(state, JobStatus::Successful);
}

#[tokio::test]
async fn cancel_on_terminal_handle_is_a_noop() {
    let transport = Arc::new(FakeTransport::new());
    let engine = engine_over(Arc::clone(&transport));

    let mut handle = awx_mcp_server::jobs::JobHandle::new(42);
    handle.observe(JobStatus::Successful);

    let state = engine.cancel(&mut handle).await.expect("noop cancel");
    assert_eq!(state, JobStatus::Successful);
    // No platform calls at all.
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn cancel_refusal_is_forgiven_when_job_already_finished() {
    let transport = Arc::new(FakeTransport::new());
    // The platform rejects cancellation of a finished job, then the
    // re-read confirms it is terminal.
    transport.push_json(Err(AwxError::protocol("405 for jobs/42/cancel/")));
    transport.push_json(Ok(job_json(42, "successful")));

    let engine = engine_over(Arc::clone(&transport));
    let mut handle = awx_mcp_server::jobs::JobHandle::new(42);
    handle.observe(JobStatus::Running);

    let state = engine.cancel(&mut handle).await.expect("forgiven");
    assert_eq!(state, JobStatus::Successful);
}

#[tokio::test]
async fn cancel_of_running_job_reports_canceled_state() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(Ok(serde_json::Value::Null));
    transport.push_json(Ok(job_json(42, "canceled")));

    let engine = engine_over(Arc::clone(&transport));
    let mut handle = awx_mcp_server::jobs::JobHandle::new(42);
    handle.observe(JobStatus::Running);

    let state = engine.cancel(&mut handle).await.expect("cancel");
    assert_eq!(state, JobStatus::Canceled);

    let calls = transport.calls();
    assert_eq!(calls[0].path, "jobs/42/cancel/");
    assert_eq!(calls[1].path, "jobs/42/");
}

#[tokio::test]
async fn stdout_falls_back_to_events_when_endpoint_missing() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_text(Err(AwxError::not_found("jobs/42/stdout")));
    transport.push_json(Ok(support::page(
        2,
        None,
        vec![
            serde_json::json!({
                "id": 1, "event": "runner_on_ok", "failed": false, "changed": false,
                "task": "ping", "play": "all", "host_name": "web1", "stdout": "ok: [web1]",
            }),
            serde_json::json!({
                "id": 2, "event": "playbook_on_stats", "failed": false, "changed": false,
                "task": null, "play": null, "host_name": null, "stdout": "PLAY RECAP",
            }),
        ],
    )));

    let client = client_over(Arc::clone(&transport), environment("prod"));
    let output = client.get_job_output(42).await.expect("fallback output");
    assert_eq!(output, "ok: [web1]\nPLAY RECAP");
}

#[tokio::test]
async fn failure_summary_classifies_the_first_failed_event() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(Ok(support::page(
        1,
        None,
        vec![serde_json::json!({
            "id": 9, "event": "runner_on_unreachable", "failed": true, "changed": false,
            "task": "Gathering Facts", "play": "deploy", "host_name": "web1",
            "stdout": "fatal: [web1]: UNREACHABLE! => connection refused",
        })],
    )));
    transport.push_text(Ok("PLAY RECAP".to_string()));

    let engine = engine_over(Arc::clone(&transport));
    let summary = engine.failure_summary(42).await.expect("summary");

    assert_eq!(summary.category, FailureCategory::InventoryIssue);
    assert_eq!(summary.failed_events_count, 1);
    assert_eq!(summary.host.as_deref(), Some("web1"));
    assert!(!summary.suggested_fixes.is_empty());

    // Only failed events are requested.
    let calls = transport.calls();
    assert_eq!(calls[0].path, "jobs/42/job_events/");
    assert!(calls[0]
        .query
        .contains(&("failed".to_string(), "true".to_string())));
}

#[tokio::test]
async fn failure_summary_survives_a_missing_stdout_endpoint() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(Ok(support::page(0, None, vec![])));
    transport.push_text(Err(AwxError::not_found("jobs/42/stdout")));
    // The stdout fallback re-reads the events.
    transport.push_json(Ok(support::page(0, None, vec![])));

    let engine = engine_over(Arc::clone(&transport));
    let summary = engine.failure_summary(42).await.expect("summary");

    assert_eq!(summary.category, FailureCategory::Unknown);
    assert_eq!(summary.failed_events_count, 0);
}
