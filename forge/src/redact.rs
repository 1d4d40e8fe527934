//! Secret redaction for diagnostics and error envelopes

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

const REDACTED: &str = "[REDACTED]";

/// Maximum characters kept from an upstream payload
pub const EXCERPT_LEN: usize = 200;

/// Scrubs known secrets and bearer tokens from text
#[derive(Clone, Default)]
pub struct Redactor {
    secrets: Arc<Vec<SecretString>>,
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

impl Redactor {
    pub fn new(secrets: impl IntoIterator<Item = String>) -> Self {
        let secrets = secrets
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(SecretString::from)
            .collect();
        Self {
            secrets: Arc::new(secrets),
        }
    }

    pub fn from_secrets<'a>(secrets: impl IntoIterator<Item = &'a SecretString>) -> Self {
        Self::new(secrets.into_iter().map(|s| s.expose_secret().to_string()))
    }

    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for secret in self.secrets.iter() {
            let secret = secret.expose_secret();
            if out.contains(secret) {
                out = out.replace(secret, REDACTED);
            }
        }
        scrub_bearer_tokens(&out)
    }

    /// Redacted, length-bounded excerpt of an upstream payload
    pub fn excerpt(&self, text: &str) -> String {
        let redacted = self.redact(text.trim());
        if redacted.chars().count() <= EXCERPT_LEN {
            return redacted;
        }
        let cut: String = redacted.chars().take(EXCERPT_LEN).collect();
        format!("{}…", cut)
    }
}

fn scrub_bearer_tokens(text: &str) -> String {
    const MARKER: &str = "Bearer ";
    if !text.contains(MARKER) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(MARKER) {
        out.push_str(&rest[..pos + MARKER.len()]);
        rest = &rest[pos + MARKER.len()..];
        let token_len = rest
            .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == ',')
            .unwrap_or(rest.len());
        if token_len > 0 {
            out.push_str(REDACTED);
        }
        rest = &rest[token_len..];
    }
    out.push_str(rest);
    out
}
