//! Provisioner unit tests

use botforge::errors::ForgeError;
use botforge::http::retry::RetryPolicy;
use botforge::models::server::ServerStatus;
use botforge::panel::installer::{self, InstallationPoller};
use botforge::panel::files::{self, FileDeployer};
use botforge::models::upload::FileUploadJob;
use botforge::panel::provisioner::Provisioner;
use serde_json::json;

use crate::mocks::{ctx, network_error, respond, respond_text, Script, ScriptedPanel};

fn provisioner(panel: &std::sync::Arc<ScriptedPanel>) -> Provisioner {
    Provisioner::new(panel.clone(), RetryPolicy::provisioning())
}

#[tokio::test(start_paused = true)]
async fn test_provision_returns_identifier() {
    let panel = ScriptedPanel::default().shared();
    let server = provisioner(&panel)
        .provision_server(&ctx(), "Ping Bot", "replies pong", "42")
        .await
        .unwrap();

    assert_eq!(server.id, "1a7ce997");
    assert_eq!(server.name, "bot");
    assert_eq!(server.owner_account_id, "42");
    assert_eq!(server.status, ServerStatus::Installing);
    assert_eq!(panel.servers.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_numeric_ids_are_carried_verbatim() {
    let panel = ScriptedPanel {
        servers: Script::new(respond(201, json!({ "attributes": { "id": 1017, "uuid": "" } }))),
        ..Default::default()
    }
    .shared();
    let server = provisioner(&panel)
        .provision_server(&ctx(), "bot", "", "7")
        .await
        .unwrap();
    assert_eq!(server.id, "1017");
}

#[tokio::test(start_paused = true)]
async fn test_id_round_trip_through_poller_and_deployer() {
    let panel = ScriptedPanel::default().shared();
    let ctx = ctx();
    let server = provisioner(&panel)
        .provision_server(&ctx, "bot", "", "42")
        .await
        .unwrap();

    InstallationPoller::new(panel.clone(), installer::Options::default())
        .wait_for_installation(&ctx, &server.id)
        .await
        .unwrap();
    FileDeployer::new(panel.clone(), files::Options::default())
        .upload_files(&ctx, &server.id, &[FileUploadJob::new("index.js", "1")])
        .await
        .unwrap();

    let seen = panel.seen_ids();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|id| id == &server.id));
}

#[tokio::test(start_paused = true)]
async fn test_dotted_identifier_round_trips() {
    let panel = ScriptedPanel {
        servers: Script::new(respond(201, json!({ "attributes": { "identifier": "node-1.bot" } }))),
        ..Default::default()
    }
    .shared();
    let ctx = ctx();
    let server = provisioner(&panel)
        .provision_server(&ctx, "bot", "", "42")
        .await
        .unwrap();

    let report = InstallationPoller::new(panel.clone(), installer::Options::default())
        .wait_for_installation(&ctx, &server.id)
        .await
        .unwrap();
    assert_eq!(report.server_id, "node-1.bot");
    assert_eq!(panel.seen_ids(), vec!["node-1.bot".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_unaddressable_identifier_fails_at_creation() {
    let panel = ScriptedPanel {
        servers: Script::new(respond(201, json!({ "attributes": { "identifier": "pool/7" } }))),
        ..Default::default()
    }
    .shared();
    let err = provisioner(&panel)
        .provision_server(&ctx(), "bot", "", "42")
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::ProvisioningFailed(_)));
    assert_eq!(panel.servers.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_html_error_page_is_malformed() {
    let panel = ScriptedPanel {
        servers: Script::new(respond_text(
            500,
            "text/html",
            "<!DOCTYPE html><html><body>Bearer panel-secret upstream broke</body></html>",
        )),
        ..Default::default()
    }
    .shared();
    let err = provisioner(&panel)
        .provision_server(&ctx(), "bot", "", "42")
        .await
        .unwrap_err();

    match err {
        ForgeError::MalformedResponse { kind, excerpt } => {
            assert_eq!(kind, "HTML");
            assert!(!excerpt.contains("panel-secret"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(panel.servers.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_html_success_body_is_malformed() {
    let panel = ScriptedPanel {
        servers: Script::new(respond_text(200, "text/plain", "<html>maintenance</html>")),
        ..Default::default()
    }
    .shared();
    let err = provisioner(&panel)
        .provision_server(&ctx(), "bot", "", "42")
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::MalformedResponse { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_validation_messages_are_aggregated() {
    let panel = ScriptedPanel {
        servers: Script::new(respond(
            422,
            json!({
                "errors": [
                    { "code": "ValidationException", "detail": "The name field is required." },
                    { "code": "ValidationException", "detail": "The user must exist." }
                ]
            }),
        )),
        ..Default::default()
    }
    .shared();
    let err = provisioner(&panel)
        .provision_server(&ctx(), "bot", "", "42")
        .await
        .unwrap_err();

    match err {
        ForgeError::RemoteValidation { messages } => {
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[1], "The user must exist.");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_auth_failures_are_not_retried() {
    let panel = ScriptedPanel {
        servers: Script::new(respond(401, json!({ "error": "Unauthenticated." }))),
        ..Default::default()
    }
    .shared();
    let err = provisioner(&panel)
        .provision_server(&ctx(), "bot", "", "42")
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Authentication(_)));
    assert_eq!(panel.servers.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_gateway_errors_stay_service_unavailable() {
    let panel = ScriptedPanel {
        servers: Script::new(respond(503, json!({ "error": "maintenance" }))),
        ..Default::default()
    }
    .shared();
    let ctx = ctx();
    let err = provisioner(&panel)
        .provision_server(&ctx, "bot", "", "42")
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::ServiceUnavailable { status: 503, .. }));
    assert_eq!(panel.servers.calls(), 3);

    let retry_warnings = ctx
        .entries()
        .into_iter()
        .filter(|e| e.stage == "provision" && e.message.contains("may already have created"))
        .count();
    assert_eq!(retry_warnings, 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_identifier_fails() {
    let panel = ScriptedPanel {
        servers: Script::new(respond(201, json!({ "data": { "attributes": { "name": "bot" } } }))),
        ..Default::default()
    }
    .shared();
    let err = provisioner(&panel)
        .provision_server(&ctx(), "bot", "", "42")
        .await
        .unwrap_err();
    match err {
        ForgeError::ProvisioningFailed(msg) => {
            assert_eq!(msg, "identifier missing in success response")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_other_failures_carry_vendor_message() {
    let panel = ScriptedPanel {
        servers: Script::new(respond(400, json!({ "error": "bad_request", "message": "Egg not found" }))),
        ..Default::default()
    }
    .shared();
    let err = provisioner(&panel)
        .provision_server(&ctx(), "bot", "", "42")
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::ProvisioningFailed(ref m) if m.contains("Egg not found")));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_input_makes_no_calls() {
    let panel = ScriptedPanel::default().shared();
    let provisioner = provisioner(&panel);
    assert!(matches!(
        provisioner.provision_server(&ctx(), "  ", "", "42").await,
        Err(ForgeError::Validation(_))
    ));
    assert!(matches!(
        provisioner.provision_server(&ctx(), "bot", "", "").await,
        Err(ForgeError::Validation(_))
    ));
    assert!(matches!(
        provisioner.create_account(&ctx(), "not-an-email", "user").await,
        Err(ForgeError::Validation(_))
    ));
    assert_eq!(panel.servers.calls(), 0);
    assert_eq!(panel.users.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_account() {
    let panel = ScriptedPanel {
        users: Script::new(respond(201, json!({ "data": { "attributes": { "id": 42 } } })))
            .then(network_error()),
        ..Default::default()
    }
    .shared();
    let account = provisioner(&panel)
        .create_account(&ctx(), "dev@example.com", "dev")
        .await
        .unwrap();
    assert_eq!(account.id, "42");
    assert_eq!(account.email, "dev@example.com");
    assert_eq!(panel.users.calls(), 2);
}
