//! Retry client unit tests

use std::time::Duration;

use botforge::errors::ForgeError;
use botforge::http::response::RawResponse;
use botforge::http::retry::{send_with_retry, RetryPolicy, GATEWAY_STATUSES};
use serde_json::json;
use tokio::time::Instant;

use crate::mocks::{ctx, network_error, respond, Script};

async fn run(policy: &RetryPolicy, script: &Script) -> Result<RawResponse, ForgeError> {
    send_with_retry(&ctx(), policy, "test call", || {
        let outcome = script.next();
        async move { outcome }
    })
    .await
}

#[tokio::test(start_paused = true)]
async fn test_retriable_statuses_back_off_exponentially() {
    for status in GATEWAY_STATUSES {
        let script = Script::new(respond(status, json!({ "error": "gateway" })));
        let started = Instant::now();

        let response = run(&RetryPolicy::default(), &script).await.unwrap();

        // 1000ms after attempt 1, 2000ms after attempt 2, none after the last
        assert_eq!(response.status, status);
        assert_eq!(script.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_capped() {
    let policy = RetryPolicy {
        max_attempts: 5,
        ..RetryPolicy::default()
    };
    let script = Script::new(respond(503, json!({})));
    let started = Instant::now();

    run(&policy, &script).await.unwrap();

    // 1000 + 2000 + 4000 + 5000 (capped)
    assert_eq!(script.calls(), 5);
    assert_eq!(started.elapsed(), Duration::from_millis(12_000));
}

#[tokio::test(start_paused = true)]
async fn test_non_retriable_statuses_make_one_call() {
    for status in [200, 201, 400, 401, 403, 404, 409, 413, 422, 500, 522] {
        let script = Script::new(respond(status, json!({})));
        let response = run(&RetryPolicy::default(), &script).await.unwrap();
        assert_eq!(response.status, status);
        assert_eq!(script.calls(), 1, "status {} was retried", status);
    }
}

#[tokio::test(start_paused = true)]
async fn test_chat_policy_retries_origin_timeouts() {
    let script = Script::new(respond(200, json!({}))).then(respond(524, json!({})));
    let response = run(&RetryPolicy::chat(), &script).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(script.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_status() {
    let script = Script::new(respond(200, json!({ "ok": true }))).then(respond(502, json!({})));
    let started = Instant::now();

    let response = run(&RetryPolicy::default(), &script).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(script.calls(), 2);
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_network_errors_back_off_linearly_then_exhaust() {
    let script = Script::new(network_error());
    let started = Instant::now();

    let err = run(&RetryPolicy::default(), &script).await.unwrap_err();

    assert_eq!(script.calls(), 3);
    // 1000 * 1 + 1000 * 2
    assert_eq!(started.elapsed(), Duration::from_millis(3000));
    match err {
        ForgeError::ExhaustedRetries { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, ForgeError::Transport(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_attempts_are_bounded_by_their_deadline() {
    let policy = RetryPolicy {
        attempt_timeout: Duration::from_secs(10),
        ..RetryPolicy::default()
    };
    let started = Instant::now();

    let err = send_with_retry(&ctx(), &policy, "slow call", || async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(RawResponse::new(200, ""))
    })
    .await
    .unwrap_err();

    // three 10s deadlines plus 1s and 2s of backoff
    assert_eq!(started.elapsed(), Duration::from_secs(33));
    assert!(matches!(err.root_cause(), ForgeError::Timeout { .. }));
    assert_eq!(err.code(), "exhausted_retries");
    assert_eq!(err.status_code(), 504);
}
