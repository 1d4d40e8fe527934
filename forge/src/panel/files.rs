//! File deployer
//!
//! Writes a batch of files into a running server. Uploads run concurrently and
//! are settled together: a failed file is reported in the summary and never
//! cancels its siblings.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use panel_models::WriteFileRequest;
use tokio::time::Instant;

use crate::context::OpContext;
use crate::errors::ForgeError;
use crate::http::retry::{send_with_retry, RetryPolicy};
use crate::models::upload::{FileUploadJob, FileUploadResult, UploadSummary};
use crate::panel::api::{validate_server_id, PanelTransport};
use crate::panel::classify::{classify_failure, PanelCall};

const STAGE: &str = "upload";

/// File deployer options
#[derive(Debug, Clone)]
pub struct Options {
    /// Retry policy for each file write
    pub upload_policy: RetryPolicy,

    /// Retry policy for one readiness check
    pub readiness_policy: RetryPolicy,

    /// Readiness checks before uploading anyway
    pub readiness_checks: u32,

    /// Pause between readiness checks
    pub readiness_pause: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            upload_policy: RetryPolicy::upload(),
            readiness_policy: RetryPolicy::status_poll(),
            readiness_checks: 3,
            readiness_pause: Duration::from_secs(30),
        }
    }
}

/// Uploads generated files to a server
pub struct FileDeployer {
    transport: Arc<dyn PanelTransport>,
    options: Options,
}

impl FileDeployer {
    pub fn new(transport: Arc<dyn PanelTransport>, options: Options) -> Self {
        Self { transport, options }
    }

    /// Best-effort readiness guard: `409` from the resources endpoint means not ready
    ///
    /// Returns whether the server reported ready. Never fails the deployment.
    pub async fn wait_until_ready(&self, ctx: &OpContext, server_id: &str) -> bool {
        let checks = self.options.readiness_checks.max(1);
        for check in 1..=checks {
            let result = send_with_retry(ctx, &self.options.readiness_policy, "server resources", || {
                self.transport.server_resources(server_id)
            })
            .await;

            match result {
                Ok(response) if response.is_success() => {
                    ctx.debug(STAGE, format!("Server {} is ready for uploads", server_id));
                    return true;
                }
                Ok(response) if response.status == 409 => {
                    ctx.info(
                        STAGE,
                        format!("Server {} not ready yet (check {}/{})", server_id, check, checks),
                    );
                }
                Ok(response) => {
                    let err = classify_failure(&response, ctx.redactor(), PanelCall::StatusCheck);
                    ctx.warn(STAGE, format!("Readiness check failed: {}", err));
                    return false;
                }
                Err(err) => {
                    ctx.warn(STAGE, format!("Readiness check failed: {}", err));
                    return false;
                }
            }

            if check < checks {
                tokio::time::sleep(self.options.readiness_pause).await;
            }
        }

        ctx.warn(
            STAGE,
            format!("Server {} still not ready, uploading anyway", server_id),
        );
        false
    }

    /// Upload every file concurrently and summarize the settled outcomes
    pub async fn upload_files(
        &self,
        ctx: &OpContext,
        server_id: &str,
        files: &[FileUploadJob],
    ) -> Result<UploadSummary, ForgeError> {
        validate_batch(server_id, files)?;

        ctx.info(
            STAGE,
            format!("Uploading {} files to server {}", files.len(), server_id),
        );

        let uploads = files.iter().map(|job| self.upload_one(ctx, server_id, job));
        let summary = UploadSummary::from_results(join_all(uploads).await);

        if summary.failed == 0 {
            ctx.info(STAGE, format!("All {} files uploaded", summary.total));
        } else {
            for failed in summary.failures() {
                ctx.warn(
                    STAGE,
                    format!(
                        "{} failed: {}",
                        failed.path,
                        failed.error.as_deref().unwrap_or("unknown error")
                    ),
                );
            }
            ctx.warn(
                STAGE,
                format!(
                    "{} of {} files uploaded",
                    summary.successful, summary.total
                ),
            );
        }

        Ok(summary)
    }

    async fn upload_one(
        &self,
        ctx: &OpContext,
        server_id: &str,
        job: &FileUploadJob,
    ) -> FileUploadResult {
        let started = Instant::now();
        let body = WriteFileRequest {
            file: job.path.clone(),
            content: job.content.clone(),
        };
        let action = format!("upload {}", job.path);

        let outcome = send_with_retry(ctx, &self.options.upload_policy, &action, || {
            self.transport.write_file(server_id, &body)
        })
        .await
        .and_then(|response| {
            if response.is_success() {
                Ok(())
            } else {
                Err(classify_failure(&response, ctx.redactor(), PanelCall::Upload))
            }
        });

        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => {
                ctx.debug(STAGE, format!("{} uploaded in {}ms", job.path, duration_ms));
                FileUploadResult {
                    path: job.path.clone(),
                    success: true,
                    error: None,
                    duration_ms,
                    size: job.content.len(),
                }
            }
            Err(err) => FileUploadResult {
                path: job.path.clone(),
                success: false,
                error: Some(ctx.redactor().redact(&err.to_string())),
                duration_ms,
                size: job.content.len(),
            },
        }
    }
}

/// Reject malformed batches before any network activity
pub fn validate_batch(server_id: &str, files: &[FileUploadJob]) -> Result<(), ForgeError> {
    validate_server_id(server_id)?;
    if files.is_empty() {
        return Err(ForgeError::Validation("at least one file is required".to_string()));
    }
    if let Some(index) = files.iter().position(|job| job.path.trim().is_empty()) {
        return Err(ForgeError::Validation(format!(
            "file #{} has an empty path",
            index + 1
        )));
    }
    Ok(())
}
