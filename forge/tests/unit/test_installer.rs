//! Installation poller unit tests

use std::time::Duration;

use botforge::errors::ForgeError;
use botforge::http::retry::RetryPolicy;
use botforge::panel::installer::{InstallationPoller, Options};
use serde_json::json;
use tokio::time::Instant;

use crate::mocks::{ctx, network_error, respond, status_body, Script, ScriptedPanel};

fn poller(panel: &std::sync::Arc<ScriptedPanel>, options: Options) -> InstallationPoller {
    InstallationPoller::new(panel.clone(), options)
}

#[tokio::test(start_paused = true)]
async fn test_returns_after_exactly_three_polls() {
    let panel = ScriptedPanel {
        status: Script::new(respond(200, status_body("running", 1)))
            .then(respond(200, status_body("installing", 0)))
            .then(respond(200, status_body("installing", 0))),
        ..Default::default()
    }
    .shared();

    let report = poller(&panel, Options::default())
        .wait_for_installation(&ctx(), "1a7ce997")
        .await
        .unwrap();

    assert_eq!(report.polls, 3);
    assert_eq!(report.server_id, "1a7ce997");
    assert_eq!(report.elapsed_ms, 10_000);
    assert_eq!(panel.status.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_installed_flag_alone_is_not_running() {
    let panel = ScriptedPanel {
        status: Script::new(respond(200, status_body("running", 1)))
            .then(respond(200, status_body("installing", 1))),
        ..Default::default()
    }
    .shared();

    let report = poller(&panel, Options::default())
        .wait_for_installation(&ctx(), "srv")
        .await
        .unwrap();
    assert_eq!(report.polls, 2);
}

#[tokio::test(start_paused = true)]
async fn test_never_terminal_stops_within_timeout_plus_interval() {
    let panel = ScriptedPanel {
        status: Script::new(respond(200, status_body("installing", 0))),
        ..Default::default()
    }
    .shared();
    let options = Options::default();
    let limit = options.timeout + options.interval;
    let started = Instant::now();

    let err = poller(&panel, options)
        .wait_for_installation(&ctx(), "srv")
        .await
        .unwrap_err();

    assert!(matches!(err, ForgeError::InstallationTimeout { .. }));
    assert!(started.elapsed() <= limit);
    assert_eq!(err.status_code(), 504);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_poll_is_cut_off_at_the_deadline() {
    let options = Options::default();
    let started = Instant::now();
    let panel = ScriptedPanel {
        status: Script::new(respond(200, status_body("installing", 0))),
        status_stalls_at: Some(started + Duration::from_secs(295)),
        ..Default::default()
    }
    .shared();
    let timeout = options.timeout;
    let limit = options.timeout + options.interval;

    let err = poller(&panel, options)
        .wait_for_installation(&ctx(), "srv")
        .await
        .unwrap_err();

    assert!(started.elapsed() <= limit);
    match err {
        ForgeError::InstallationTimeout { timeout: reported, .. } => assert_eq!(reported, timeout),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_failures_raise_before_timeout() {
    let panel = ScriptedPanel {
        status: Script::new(network_error()),
        ..Default::default()
    }
    .shared();
    let options = Options {
        poll_policy: RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::status_poll()
        },
        ..Options::default()
    };
    let timeout = options.timeout;
    let started = Instant::now();

    let err = poller(&panel, options)
        .wait_for_installation(&ctx(), "srv")
        .await
        .unwrap_err();

    assert!(started.elapsed() < timeout);
    assert_eq!(panel.status.calls(), 11);
    match err {
        ForgeError::StatusCheckFailed { failures, last } => {
            assert_eq!(failures, 11);
            assert!(matches!(last.root_cause(), ForgeError::Transport(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failure_count_resets_on_success() {
    let mut script = Script::new(respond(200, status_body("running", 1)));
    for i in 0..20 {
        script = if i == 10 {
            script.then(respond(200, status_body("installing", 0)))
        } else {
            script.then(respond(500, json!({ "error": "boom" })))
        };
    }
    let panel = ScriptedPanel {
        status: script,
        ..Default::default()
    }
    .shared();
    let options = Options {
        timeout: Duration::from_secs(3_600),
        ..Options::default()
    };

    let report = poller(&panel, options)
        .wait_for_installation(&ctx(), "srv")
        .await
        .unwrap();
    assert_eq!(report.polls, 21);
}

#[tokio::test(start_paused = true)]
async fn test_suspended_server_is_terminal() {
    let panel = ScriptedPanel {
        status: Script::new(respond(
            200,
            json!({ "attributes": { "status": null, "is_suspended": true, "container": { "installed": 1 } } }),
        )),
        ..Default::default()
    }
    .shared();

    let err = poller(&panel, Options::default())
        .wait_for_installation(&ctx(), "srv")
        .await
        .unwrap_err();
    match err {
        ForgeError::TerminalRemoteState { server_id, state } => {
            assert_eq!(server_id, "srv");
            assert_eq!(state, "suspended");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(panel.status.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_install_failure_is_terminal() {
    let panel = ScriptedPanel {
        status: Script::new(respond(200, status_body("install_failed", 0))),
        ..Default::default()
    }
    .shared();
    let err = poller(&panel, Options::default())
        .wait_for_installation(&ctx(), "srv")
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::TerminalRemoteState { ref state, .. } if state == "error"));
}

#[tokio::test(start_paused = true)]
async fn test_auth_errors_stop_polling() {
    let panel = ScriptedPanel {
        status: Script::new(respond(403, json!({ "error": "This action is unauthorized." }))),
        ..Default::default()
    }
    .shared();
    let err = poller(&panel, Options::default())
        .wait_for_installation(&ctx(), "srv")
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Authentication(_)));
    assert_eq!(panel.status.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_server_id_is_rejected() {
    let panel = ScriptedPanel::default().shared();
    let err = poller(&panel, Options::default())
        .wait_for_installation(&ctx(), "../admin")
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Validation(_)));
    assert_eq!(panel.status.calls(), 0);
}
