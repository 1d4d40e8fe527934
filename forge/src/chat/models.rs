//! Chat-completion wire models

use relay_models::ChatMessage;
use serde::{Deserialize, Serialize};

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Vendor error envelope: `{ "error": { "code", "message", "type" } }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorErrorEnvelope {
    #[serde(default)]
    pub error: Option<VendorError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}
