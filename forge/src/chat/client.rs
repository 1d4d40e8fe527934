//! Chat-completion client

use std::sync::Arc;

use async_trait::async_trait;
use relay_models::{ChatMessage, ChatRole};
use serde::Serialize;

use crate::chat::cost::estimate_cost;
use crate::chat::extract::extract_code_block;
use crate::chat::models::{CompletionRequest, CompletionResponse, VendorErrorEnvelope};
use crate::chat::prompt::SYSTEM_PROMPT;
use crate::context::OpContext;
use crate::errors::ForgeError;
use crate::http::client::HttpClient;
use crate::http::response::{RawResponse, ResponseBody};
use crate::http::retry::{send_with_retry, RetryPolicy};
use crate::redact::Redactor;

const STAGE: &str = "chat";

/// One chat-completion HTTP exchange
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, body: &CompletionRequest) -> Result<RawResponse, ForgeError>;
}

/// Chat transport over HTTP
pub struct HttpChatTransport {
    client: HttpClient,
}

impl HttpChatTransport {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn complete(&self, body: &CompletionRequest) -> Result<RawResponse, ForgeError> {
        self.client.post("/chat/completions", body).await
    }
}

/// A completion with its extracted code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    /// Full reply text
    pub content: String,
    /// First fenced code block, if the reply had one
    pub code: Option<String>,
    pub estimated_cost: u64,
}

/// Turns a conversation into bot source code
pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
    policy: RetryPolicy,
    default_model: String,
}

impl ChatClient {
    pub fn new(transport: Arc<dyn ChatTransport>, policy: RetryPolicy, default_model: String) -> Self {
        Self {
            transport,
            policy,
            default_model,
        }
    }

    pub async fn get_completion(
        &self,
        ctx: &OpContext,
        history: &[ChatMessage],
        model: Option<&str>,
    ) -> Result<Completion, ForgeError> {
        if !history.iter().any(|m| m.role == ChatRole::User && !m.content.trim().is_empty()) {
            return Err(ForgeError::Validation(
                "the conversation needs at least one user message".to_string(),
            ));
        }

        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string();
        let body = build_request(&model, history);

        ctx.info(
            STAGE,
            format!("Requesting completion from {} ({} messages)", model, body.messages.len()),
        );
        let response = send_with_retry(ctx, &self.policy, "chat completion", || {
            self.transport.complete(&body)
        })
        .await?;

        if !response.is_success() {
            let err = classify_chat_failure(&response, ctx.redactor());
            ctx.error(STAGE, format!("Completion failed: {}", err));
            return Err(err);
        }

        let parsed: CompletionResponse = response.parse_json(ctx.redactor())?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ForgeError::ChatFailed("the model returned no message".to_string()))?;

        let code = extract_code_block(&content);
        let estimated_cost = code.as_deref().map(estimate_cost).unwrap_or(0);
        match &code {
            Some(code) => ctx.info(
                STAGE,
                format!("Received {} lines of code, cost {}", code.lines().count(), estimated_cost),
            ),
            None => ctx.info(STAGE, "Received an explanation without code"),
        }

        Ok(Completion {
            content,
            code,
            estimated_cost,
        })
    }
}

/// The fixed system instructions followed by the user's transcript
///
/// Client-supplied system messages are dropped so the instructions stay authoritative.
pub fn build_request(model: &str, history: &[ChatMessage]) -> CompletionRequest {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage {
        role: ChatRole::System,
        content: SYSTEM_PROMPT.to_string(),
    });
    messages.extend(
        history
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .cloned(),
    );
    CompletionRequest {
        model: model.to_string(),
        messages,
    }
}

/// Domain error for a non-2xx chat response
pub fn classify_chat_failure(response: &RawResponse, redactor: &Redactor) -> ForgeError {
    let status = response.status;
    let body = response.classify(redactor);
    let vendor = match &body {
        ResponseBody::Json(value) => serde_json::from_value::<VendorErrorEnvelope>(value.clone())
            .unwrap_or_default()
            .error
            .unwrap_or_default(),
        ResponseBody::HtmlErrorPage { excerpt } if !(502..=524).contains(&status) => {
            return ForgeError::MalformedResponse {
                kind: "HTML",
                excerpt: excerpt.clone(),
            };
        }
        _ => Default::default(),
    };

    let code = vendor.code.as_deref().unwrap_or("");
    let error_type = vendor.error_type.as_deref().unwrap_or("");
    let message = vendor
        .message
        .as_deref()
        .map(|m| redactor.redact(m))
        .unwrap_or_else(|| format!("HTTP {}", status));

    if code == "context_length_exceeded" || message.contains("maximum context length") {
        return ForgeError::ContextTooLong;
    }
    if code == "insufficient_quota" {
        return ForgeError::ChatFailed("the AI provider quota is exhausted".to_string());
    }
    if status == 429 || code == "rate_limit_exceeded" {
        return ForgeError::RateLimited;
    }
    match status {
        401 | 403 => ForgeError::Authentication(message),
        502..=504 | 522 | 524 => ForgeError::ServiceUnavailable { status, message },
        400 => ForgeError::InvalidRequest(message),
        _ if error_type == "invalid_request_error" => ForgeError::InvalidRequest(message),
        _ => ForgeError::ChatFailed(message),
    }
}
