//! Raw upstream responses and body classification

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ForgeError;
use crate::redact::Redactor;

/// One fully-read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// What an upstream body turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    /// A gateway or proxy error page instead of an API response
    HtmlErrorPage { excerpt: String },
    Unknown { excerpt: String },
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// Response with an `application/json` content type
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Classify the body by content type first, then by structure
    pub fn classify(&self, redactor: &Redactor) -> ResponseBody {
        let text = self.body.trim_start();
        let is_html_type = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
        if is_html_type || looks_like_html(text) {
            return ResponseBody::HtmlErrorPage {
                excerpt: redactor.excerpt(&self.body),
            };
        }

        match serde_json::from_str::<Value>(text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Unknown {
                excerpt: redactor.excerpt(&self.body),
            },
        }
    }

    /// Parse the body as `T`, reporting anything else as a malformed response
    pub fn parse_json<T: DeserializeOwned>(&self, redactor: &Redactor) -> Result<T, ForgeError> {
        match self.classify(redactor) {
            ResponseBody::Json(value) => {
                serde_json::from_value(value).map_err(|e| ForgeError::MalformedResponse {
                    kind: "unexpected JSON",
                    excerpt: format!("{} ({})", redactor.excerpt(&self.body), e),
                })
            }
            ResponseBody::HtmlErrorPage { excerpt } => Err(ForgeError::MalformedResponse {
                kind: "HTML",
                excerpt,
            }),
            ResponseBody::Unknown { excerpt } => Err(ForgeError::MalformedResponse {
                kind: "non-JSON",
                excerpt,
            }),
        }
    }
}

fn looks_like_html(text: &str) -> bool {
    let head: String = text.chars().take(16).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}
