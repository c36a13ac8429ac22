// Retry behavior at the transport boundary: transient failures are
// retried with backoff, everything else surfaces immediately.

mod support;

use awx_mcp_server::client::{with_retry, RetryPolicy};
use awx_mcp_server::domain::AwxError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use support::{client_over, environment, job_json, FakeTransport};

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let attempts = AtomicU32::new(0);
    let result = with_retry(support::fast_retry(), "test", || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt < 2 {
                Err(AwxError::transient("connection reset"))
            } else {
                Ok(attempt)
            }
        }
    })
    .await;

    assert_eq!(result.expect("eventual success"), 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let attempts = AtomicU32::new(0);
    let result: Result<(), _> = with_retry(support::fast_retry(), "test", || {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { Err(AwxError::transient("still down")) }
    })
    .await;

    assert!(matches!(result, Err(AwxError::TransientNetwork { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn not_found_is_never_retried() {
    let attempts = AtomicU32::new(0);
    let result: Result<(), _> = with_retry(support::fast_retry(), "test", || {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { Err(AwxError::not_found("job 9")) }
    })
    .await;

    assert!(matches!(result, Err(AwxError::NotFound { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_retries_transient_get_and_returns_result() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(Err(AwxError::transient("503 from platform")));
    transport.push_json(Ok(job_json(9, "successful")));

    let client = client_over(Arc::clone(&transport), environment("prod"));
    let job = client.get_job(9).await.expect("job after retry");

    assert_eq!(job.id, 9);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn client_surfaces_auth_failure_without_retrying() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(Err(AwxError::authentication("prod")));

    let client = client_over(Arc::clone(&transport), environment("prod"));
    let result = client.get_job(9).await;

    assert!(matches!(result, Err(AwxError::Authentication { .. })));
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn backoff_grows_with_each_attempt() {
    let policy = RetryPolicy::default();
    assert!(policy.delay(2) > policy.delay(1));
    assert!(policy.delay(3) > policy.delay(2));
}

#[test]
fn sub_unity_multiplier_is_clamped_so_backoff_still_grows() {
    let policy = RetryPolicy::new(3, std::time::Duration::from_millis(10), 1);
    assert!(policy.delay(2) > policy.delay(1));
    assert!(policy.delay(3) > policy.delay(2));
}
