//! File deployer unit tests

use std::time::Duration;

use botforge::errors::ForgeError;
use botforge::models::upload::FileUploadJob;
use botforge::panel::files::{FileDeployer, Options};
use serde_json::json;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

use crate::mocks::{ctx, respond, Script, ScriptedPanel};

fn jobs(count: usize) -> Vec<FileUploadJob> {
    (1..=count)
        .map(|i| FileUploadJob::new(format!("file{}.js", i), format!("console.log({});", i)))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_one_failed_job_does_not_fail_the_batch() {
    let panel = ScriptedPanel {
        failing_paths: vec!["file3.js".to_string()],
        ..Default::default()
    }
    .shared();
    let deployer = FileDeployer::new(panel.clone(), Options::default());

    let summary = assert_ok!(deployer.upload_files(&ctx(), "srv", &jobs(5)).await);

    assert!(summary.success);
    assert_eq!(summary.total, 5);
    assert_eq!(summary.successful, 4);
    assert_eq!(summary.failed, 1);
    for result in &summary.results {
        if result.path == "file3.js" {
            assert!(!result.success);
            assert!(result.error.as_deref().unwrap().contains("disk quota exceeded"));
        } else {
            assert!(result.success);
            assert!(result.error.is_none());
        }
    }
    assert_eq!(panel.written.lock().unwrap().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_results_keep_job_order_and_sizes() {
    let panel = ScriptedPanel::default().shared();
    let deployer = FileDeployer::new(panel, Options::default());
    let jobs = jobs(3);

    let summary = deployer.upload_files(&ctx(), "srv", &jobs).await.unwrap();

    let paths: Vec<&str> = summary.results.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["file1.js", "file2.js", "file3.js"]);
    assert_eq!(summary.results[0].size, jobs[0].content.len());
}

#[tokio::test(start_paused = true)]
async fn test_all_failures_report_unsuccessful_summary() {
    let panel = ScriptedPanel {
        writes: Script::new(respond(413, json!({ "error": "too big" }))),
        ..Default::default()
    }
    .shared();
    let deployer = FileDeployer::new(panel, Options::default());

    let summary = deployer.upload_files(&ctx(), "srv", &jobs(2)).await.unwrap();

    assert!(!summary.success);
    assert_eq!(summary.failed, 2);
    assert!(summary.results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("file is too large"));
}

#[tokio::test(start_paused = true)]
async fn test_uploads_run_concurrently() {
    let panel = ScriptedPanel {
        writes: Script::new(respond(200, json!({})))
            .then(respond(503, json!({})))
            .then(respond(503, json!({})))
            .then(respond(503, json!({}))),
        ..Default::default()
    }
    .shared();
    let deployer = FileDeployer::new(panel.clone(), Options::default());
    let started = Instant::now();

    let summary = deployer.upload_files(&ctx(), "srv", &jobs(3)).await.unwrap();

    // every file hits one 503 and retries after the same 1s backoff
    assert_eq!(summary.successful, 3);
    assert_eq!(panel.writes.calls(), 6);
    assert_eq!(started.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_batches_make_no_calls() {
    let panel = ScriptedPanel::default().shared();
    let deployer = FileDeployer::new(panel.clone(), Options::default());

    let err = assert_err!(deployer.upload_files(&ctx(), "srv", &[]).await);
    assert!(matches!(err, ForgeError::Validation(_)));
    assert!(matches!(
        deployer
            .upload_files(&ctx(), "srv", &[FileUploadJob::new("", "x")])
            .await,
        Err(ForgeError::Validation(_))
    ));
    assert!(matches!(
        deployer.upload_files(&ctx(), "", &jobs(1)).await,
        Err(ForgeError::Validation(_))
    ));
    assert!(panel.written.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_readiness_guard_treats_409_as_not_ready() {
    let panel = ScriptedPanel {
        resources: Script::new(respond(200, json!({})))
            .then(respond(409, json!({ "error": "installing" }))),
        ..Default::default()
    }
    .shared();
    let deployer = FileDeployer::new(panel.clone(), Options::default());
    let started = Instant::now();

    assert!(deployer.wait_until_ready(&ctx(), "srv").await);
    assert_eq!(panel.resources.calls(), 2);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_readiness_guard_gives_up_without_failing() {
    let panel = ScriptedPanel {
        resources: Script::new(respond(409, json!({}))),
        ..Default::default()
    }
    .shared();
    let deployer = FileDeployer::new(panel.clone(), Options::default());

    assert!(!deployer.wait_until_ready(&ctx(), "srv").await);
    assert_eq!(panel.resources.calls(), 3);
}
