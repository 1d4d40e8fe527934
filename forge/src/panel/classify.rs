//! Mapping of panel error responses onto `ForgeError`

use panel_models::PanelError;

use crate::errors::ForgeError;
use crate::http::response::{RawResponse, ResponseBody};
use crate::redact::Redactor;

/// Which panel call produced the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCall {
    Provisioning,
    StatusCheck,
    Upload,
}

/// Domain error for a non-2xx panel response
pub fn classify_failure(response: &RawResponse, redactor: &Redactor, call: PanelCall) -> ForgeError {
    let status = response.status;
    let body = response.classify(redactor);
    let envelope: PanelError = match &body {
        ResponseBody::Json(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
        _ => PanelError::default(),
    };
    let message = envelope
        .summary()
        .map(|m| redactor.redact(&m))
        .or_else(|| match &body {
            ResponseBody::HtmlErrorPage { .. } => Some("gateway returned an HTML error page".to_string()),
            ResponseBody::Unknown { excerpt } if !excerpt.is_empty() => Some(excerpt.clone()),
            _ => None,
        })
        .unwrap_or_else(|| format!("HTTP {}", status));

    let html_excerpt = match body {
        ResponseBody::HtmlErrorPage { excerpt } => Some(excerpt),
        _ => None,
    };

    match status {
        401 | 403 => ForgeError::Authentication(message),
        422 => {
            let mut messages: Vec<String> = envelope
                .messages()
                .into_iter()
                .map(|m| redactor.redact(&m))
                .collect();
            if messages.is_empty() {
                messages.push(message);
            }
            ForgeError::RemoteValidation { messages }
        }
        502..=504 => ForgeError::ServiceUnavailable { status, message },
        _ if html_excerpt.is_some() => ForgeError::MalformedResponse {
            kind: "HTML",
            excerpt: html_excerpt.unwrap_or_default(),
        },
        404 if call == PanelCall::Upload => ForgeError::NonRetriableHttp {
            status,
            message: format!("server or path not found: {}", message),
        },
        409 if call == PanelCall::Upload => ForgeError::NonRetriableHttp {
            status,
            message: format!("server is not ready yet: {}", message),
        },
        413 if call == PanelCall::Upload => ForgeError::NonRetriableHttp {
            status,
            message: format!("file is too large: {}", message),
        },
        _ if call == PanelCall::Provisioning => ForgeError::ProvisioningFailed(message),
        _ => ForgeError::NonRetriableHttp { status, message },
    }
}
