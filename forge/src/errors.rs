//! Error types for botforge

use std::time::Duration;

use thiserror::Error;

/// Main error type for botforge
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("{action} timed out after {after:?}")]
    Timeout { action: String, after: Duration },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Service unavailable ({status}): {message}")]
    ServiceUnavailable { status: u16, message: String },

    #[error("Malformed {kind} response: {excerpt}")]
    MalformedResponse { kind: &'static str, excerpt: String },

    #[error("Server {server_id} reached terminal state '{state}'")]
    TerminalRemoteState { server_id: String, state: String },

    #[error("Validation failed: {}", .messages.join("; "))]
    RemoteValidation { messages: Vec<String> },

    #[error("Provisioning failed: {0}")]
    ProvisioningFailed(String),

    #[error("Request failed with status {status}: {message}")]
    NonRetriableHttp { status: u16, message: String },

    #[error("Gave up after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: Box<ForgeError> },

    #[error("Status check failed repeatedly ({failures} consecutive failures): {last}")]
    StatusCheckFailed { failures: u32, last: Box<ForgeError> },

    #[error("Server {server_id} did not finish installing within {timeout:?}")]
    InstallationTimeout { server_id: String, timeout: Duration },

    #[error("The conversation is too long for the model. Start a new chat or remove older messages.")]
    ContextTooLong,

    #[error("Too many requests to the AI service. Wait a moment and try again.")]
    RateLimited,

    #[error("The AI service rejected the request: {0}. Rephrase your message and try again.")]
    InvalidRequest(String),

    #[error("Chat completion failed: {0}")]
    ChatFailed(String),

    #[error("Not enough tokens: balance {balance}, cost {cost}")]
    QuotaExceeded { balance: u64, cost: u64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForgeError {
    /// Stable code used in relay envelopes
    pub fn code(&self) -> &'static str {
        match self {
            ForgeError::IoError(_) => "io_error",
            ForgeError::JsonError(_) => "invalid_json",
            ForgeError::Validation(_) => "validation_error",
            ForgeError::Authentication(_) => "authentication_failed",
            ForgeError::Timeout { .. } => "timeout",
            ForgeError::Transport(_) => "network_error",
            ForgeError::ServiceUnavailable { .. } => "service_unavailable",
            ForgeError::MalformedResponse { .. } => "malformed_response",
            ForgeError::TerminalRemoteState { .. } => "terminal_remote_state",
            ForgeError::RemoteValidation { .. } => "remote_validation_failed",
            ForgeError::ProvisioningFailed(_) => "provisioning_failed",
            ForgeError::NonRetriableHttp { .. } => "http_error",
            ForgeError::ExhaustedRetries { .. } => "exhausted_retries",
            ForgeError::StatusCheckFailed { .. } => "status_check_failed",
            ForgeError::InstallationTimeout { .. } => "installation_timeout",
            ForgeError::ContextTooLong => "context_too_long",
            ForgeError::RateLimited => "rate_limited",
            ForgeError::InvalidRequest(_) => "invalid_request",
            ForgeError::ChatFailed(_) => "chat_failed",
            ForgeError::QuotaExceeded { .. } => "quota_exceeded",
            ForgeError::ConfigError(_) => "configuration_error",
            ForgeError::ServerError(_) => "server_error",
            ForgeError::ShutdownError(_) => "shutdown_error",
            ForgeError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status the relay answers with
    pub fn status_code(&self) -> u16 {
        match self {
            ForgeError::Validation(_) | ForgeError::JsonError(_) => 400,
            ForgeError::InvalidRequest(_) | ForgeError::ContextTooLong => 400,
            ForgeError::Authentication(_) => 401,
            ForgeError::QuotaExceeded { .. } => 402,
            ForgeError::TerminalRemoteState { .. } => 409,
            ForgeError::RemoteValidation { .. } => 422,
            ForgeError::RateLimited => 429,
            ForgeError::Transport(_)
            | ForgeError::MalformedResponse { .. }
            | ForgeError::ProvisioningFailed(_)
            | ForgeError::NonRetriableHttp { .. }
            | ForgeError::StatusCheckFailed { .. }
            | ForgeError::ChatFailed(_) => 502,
            ForgeError::ServiceUnavailable { .. } => 503,
            ForgeError::Timeout { .. } | ForgeError::InstallationTimeout { .. } => 504,
            ForgeError::ExhaustedRetries { last, .. } => last.status_code(),
            _ => 500,
        }
    }

    /// Transient failures the retry client may try again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ForgeError::Timeout { .. }
                | ForgeError::Transport(_)
                | ForgeError::ServiceUnavailable { .. }
        )
    }

    /// Innermost cause of a retry or polling aggregate
    pub fn root_cause(&self) -> &ForgeError {
        match self {
            ForgeError::ExhaustedRetries { last, .. } | ForgeError::StatusCheckFailed { last, .. } => {
                last.root_cause()
            }
            other => other,
        }
    }
}

impl From<anyhow::Error> for ForgeError {
    fn from(err: anyhow::Error) -> Self {
        ForgeError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for ForgeError {
    fn from(err: reqwest::Error) -> Self {
        // Drop the URL so query-string credentials never leak into messages
        ForgeError::Transport(err.without_url().to_string())
    }
}
