//! Bounded retries over a single outbound HTTP exchange
//!
//! Retriable status codes back off exponentially, transport errors and
//! timeouts back off linearly. The operation is re-created for every attempt
//! and each attempt runs under its own deadline; an expired deadline drops the
//! in-flight request.

use std::future::Future;
use std::time::Duration;

use crate::context::OpContext;
use crate::errors::ForgeError;
use crate::http::response::RawResponse;
use crate::utils::{calc_exp_backoff, calc_linear_backoff, BackoffOptions};

/// Attempt ceiling used throughout
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Gateway failures treated as transient by the hosting panel
pub const GATEWAY_STATUSES: [u16; 3] = [502, 503, 504];

/// Gateway failures plus the CDN origin timeouts seen in front of the AI vendor
pub const EXTENDED_GATEWAY_STATUSES: [u16; 5] = [502, 503, 504, 522, 524];

/// Anything carrying an HTTP status
pub trait HttpStatus {
    fn status_code(&self) -> u16;
}

impl HttpStatus for RawResponse {
    fn status_code(&self) -> u16 {
        self.status
    }
}

/// Retry configuration for one kind of call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff: BackoffOptions,
    pub retriable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: Duration::from_secs(15),
            backoff: BackoffOptions::default(),
            retriable_statuses: GATEWAY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Account and server creation
    pub fn provisioning() -> Self {
        Self::default()
    }

    /// One installation status poll
    pub fn status_poll() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(10),
            ..Self::default()
        }
    }

    /// One file write
    pub fn upload() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            backoff: BackoffOptions {
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(10),
            },
            ..Self::default()
        }
    }

    /// Chat completion
    pub fn chat() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            backoff: BackoffOptions {
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(10),
            },
            retriable_statuses: EXTENDED_GATEWAY_STATUSES.to_vec(),
            ..Self::default()
        }
    }

    pub fn is_retriable(&self, status: u16) -> bool {
        self.retriable_statuses.contains(&status)
    }

    /// Delay after a retriable status on `attempt` (1-based)
    pub fn status_delay(&self, attempt: u32) -> Duration {
        calc_exp_backoff(&self.backoff, attempt.saturating_sub(1))
    }

    /// Delay after a transport error or timeout on `attempt` (1-based)
    pub fn error_delay(&self, attempt: u32) -> Duration {
        calc_linear_backoff(&self.backoff, attempt)
    }
}

/// Progress of one logical call
#[derive(Debug)]
pub struct RetryState {
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_error: Option<ForgeError>,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 1,
            max_attempts: max_attempts.max(1),
            last_error: None,
        }
    }

    pub fn has_remaining(&self) -> bool {
        self.attempt < self.max_attempts
    }

    fn advance(&mut self) {
        self.attempt += 1;
    }

    /// Aggregate error carrying the last recorded cause
    fn exhausted(&mut self) -> ForgeError {
        let last = self
            .last_error
            .take()
            .unwrap_or_else(|| ForgeError::Internal("no attempt recorded".to_string()));
        ForgeError::ExhaustedRetries {
            attempts: self.attempt,
            last: Box::new(last),
        }
    }
}

/// Run `make_request` until it yields a non-retriable response or attempts run out
///
/// A retriable status on the final attempt is returned as-is so the caller can
/// classify it. Errors that are not transient are returned immediately.
pub async fn send_with_retry<R, F, Fut>(
    ctx: &OpContext,
    policy: &RetryPolicy,
    action: &str,
    mut make_request: F,
) -> Result<R, ForgeError>
where
    R: HttpStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, ForgeError>>,
{
    let mut state = RetryState::new(policy.max_attempts);

    loop {
        let attempt = state.attempt;
        let outcome = match tokio::time::timeout(policy.attempt_timeout, make_request()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ForgeError::Timeout {
                action: action.to_string(),
                after: policy.attempt_timeout,
            }),
        };

        match outcome {
            Ok(response) => {
                let status = response.status_code();
                if policy.is_retriable(status) && state.has_remaining() {
                    let delay = policy.status_delay(attempt);
                    ctx.warn(
                        "retry",
                        format!(
                            "{} returned {} (attempt {}/{}), retrying in {}ms",
                            action,
                            status,
                            attempt,
                            state.max_attempts,
                            delay.as_millis()
                        ),
                    );
                    tokio::time::sleep(delay).await;
                    state.advance();
                    continue;
                }
                if attempt > 1 {
                    ctx.debug(
                        "retry",
                        format!("{} finished with {} on attempt {}", action, status, attempt),
                    );
                }
                return Ok(response);
            }
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                let message = err.to_string();
                state.last_error = Some(err);
                if state.has_remaining() {
                    let delay = policy.error_delay(attempt);
                    ctx.warn(
                        "retry",
                        format!(
                            "{} failed (attempt {}/{}): {}, retrying in {}ms",
                            action, attempt, state.max_attempts, message, delay.as_millis()
                        ),
                    );
                    tokio::time::sleep(delay).await;
                    state.advance();
                    continue;
                }
                ctx.error(
                    "retry",
                    format!("{} failed after {} attempts: {}", action, attempt, message),
                );
                return Err(state.exhausted());
            }
        }
    }
}
