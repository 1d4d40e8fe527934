//! Installation poller
//!
//! Blocks a deployment until a freshly provisioned server reports that its
//! container is installed. Each poll has its own HTTP-level retries; on top
//! of that the poller tolerates a run of failed polls, backing off between
//! them, before giving up.

use std::sync::Arc;
use std::time::Duration;

use panel_models::{Envelope, StatusAttributes};
use tokio::time::Instant;

use crate::context::OpContext;
use crate::errors::ForgeError;
use crate::http::retry::{send_with_retry, RetryPolicy};
use crate::models::server::{InstallationReport, ServerStatus};
use crate::panel::api::{validate_server_id, PanelTransport};
use crate::panel::classify::{classify_failure, PanelCall};
use crate::utils::{calc_exp_backoff, BackoffOptions};

const STAGE: &str = "install";

/// Installation poller options
#[derive(Debug, Clone)]
pub struct Options {
    /// Sleep after a successful poll
    pub interval: Duration,

    /// Upper bound on the sleep after failed polls
    pub max_failure_interval: Duration,

    /// Give up once this much time has passed
    pub timeout: Duration,

    /// Consecutive failed polls tolerated before giving up
    pub max_consecutive_failures: u32,

    /// Retry policy for each individual poll
    pub poll_policy: RetryPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5_000),
            max_failure_interval: Duration::from_millis(10_000),
            timeout: Duration::from_millis(300_000),
            max_consecutive_failures: 10,
            poll_policy: RetryPolicy::status_poll(),
        }
    }
}

/// Map the panel's two status signals onto a lifecycle state
pub fn interpret_status(attributes: &StatusAttributes) -> ServerStatus {
    let state = attributes.reported_state();
    let state = state.as_deref();

    if attributes.is_suspended == Some(true) || state == Some("suspended") {
        return ServerStatus::Suspended;
    }
    if matches!(state, Some("error" | "install_failed" | "reinstall_failed")) {
        return ServerStatus::Error;
    }
    if attributes.is_installed() && state != Some("installing") {
        return ServerStatus::Running;
    }
    ServerStatus::Installing
}

/// Polls server status until installation completes
pub struct InstallationPoller {
    transport: Arc<dyn PanelTransport>,
    options: Options,
}

impl InstallationPoller {
    pub fn new(transport: Arc<dyn PanelTransport>, options: Options) -> Self {
        Self { transport, options }
    }

    /// Read the current status once, with HTTP-level retries
    pub async fn check_status(
        &self,
        ctx: &OpContext,
        server_id: &str,
    ) -> Result<ServerStatus, ForgeError> {
        let response = send_with_retry(ctx, &self.options.poll_policy, "server status", || {
            self.transport.server_status(server_id)
        })
        .await?;

        if !response.is_success() {
            return Err(classify_failure(&response, ctx.redactor(), PanelCall::StatusCheck));
        }

        let envelope: Envelope<StatusAttributes> = response.parse_json(ctx.redactor())?;
        let attributes = envelope.into_attributes().ok_or_else(|| ForgeError::MalformedResponse {
            kind: "status",
            excerpt: ctx.redactor().excerpt(&response.body),
        })?;
        Ok(interpret_status(&attributes))
    }

    /// Wait until the server is running
    ///
    /// Fails on a suspended or errored server, on too many consecutive failed
    /// polls, on authentication errors, and when the global timeout elapses.
    pub async fn wait_for_installation(
        &self,
        ctx: &OpContext,
        server_id: &str,
    ) -> Result<InstallationReport, ForgeError> {
        validate_server_id(server_id)?;

        let started = Instant::now();
        let deadline = started + self.options.timeout;
        let failure_backoff = BackoffOptions {
            base_delay: self.options.interval,
            max_delay: self.options.max_failure_interval,
        };
        let mut polls: u32 = 0;
        let mut consecutive_failures: u32 = 0;

        ctx.info(STAGE, format!("Waiting for server {} to finish installing", server_id));

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(ctx, server_id, polls));
            }

            polls += 1;
            let status = match tokio::time::timeout(remaining, self.check_status(ctx, server_id)).await {
                Ok(status) => status,
                Err(_) => return Err(self.timed_out(ctx, server_id, polls)),
            };
            let delay = match status {
                Ok(ServerStatus::Running) => {
                    let elapsed = started.elapsed();
                    ctx.info(
                        STAGE,
                        format!(
                            "Server {} is running after {} polls ({}ms)",
                            server_id,
                            polls,
                            elapsed.as_millis()
                        ),
                    );
                    return Ok(InstallationReport {
                        server_id: server_id.to_string(),
                        polls,
                        elapsed_ms: elapsed.as_millis() as u64,
                    });
                }
                Ok(status @ (ServerStatus::Suspended | ServerStatus::Error)) => {
                    ctx.error(
                        STAGE,
                        format!("Server {} is {}", server_id, status.as_str()),
                    );
                    return Err(ForgeError::TerminalRemoteState {
                        server_id: server_id.to_string(),
                        state: status.as_str().to_string(),
                    });
                }
                Ok(ServerStatus::Installing) => {
                    consecutive_failures = 0;
                    ctx.debug(STAGE, format!("Server {} still installing (poll {})", server_id, polls));
                    self.options.interval
                }
                Err(err @ (ForgeError::Authentication(_) | ForgeError::Validation(_))) => {
                    ctx.error(STAGE, format!("Status check rejected: {}", err));
                    return Err(err);
                }
                Err(err) => {
                    consecutive_failures += 1;
                    if consecutive_failures > self.options.max_consecutive_failures {
                        ctx.error(
                            STAGE,
                            format!(
                                "Status check failed {} times in a row: {}",
                                consecutive_failures, err
                            ),
                        );
                        return Err(ForgeError::StatusCheckFailed {
                            failures: consecutive_failures,
                            last: Box::new(err),
                        });
                    }
                    let delay = calc_exp_backoff(&failure_backoff, consecutive_failures);
                    ctx.warn(
                        STAGE,
                        format!(
                            "Status check failed ({}/{}): {}, next poll in {}ms",
                            consecutive_failures,
                            self.options.max_consecutive_failures,
                            err,
                            delay.as_millis()
                        ),
                    );
                    delay
                }
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(delay.min(remaining)).await;
        }
    }

    fn timed_out(&self, ctx: &OpContext, server_id: &str, polls: u32) -> ForgeError {
        ctx.error(
            STAGE,
            format!("Installation of {} timed out after {} polls", server_id, polls),
        );
        ForgeError::InstallationTimeout {
            server_id: server_id.to_string(),
            timeout: self.options.timeout,
        }
    }
}
