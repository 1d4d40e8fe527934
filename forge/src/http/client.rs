//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use crate::errors::ForgeError;
use crate::http::response::RawResponse;

/// Upper bound for one request; per-attempt deadlines are tighter
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for one upstream service, injecting its credentials
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, ForgeError> {
        let base = url::Url::parse(base_url)
            .map_err(|e| ForgeError::ConfigError(format!("invalid base url {}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .user_agent(concat!("botforge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header(header::ACCEPT, "application/json")
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<RawResponse, ForgeError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let request = self.authorize(self.client.get(&url));
        read_response(request.send().await?).await
    }

    /// Make a POST request with a JSON body
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, ForgeError> {
        let url = self.url(path);
        debug!("POST {}", url);
        let request = self.authorize(self.client.post(&url)).json(body);
        read_response(request.send().await?).await
    }
}

/// Read status, content type and the body as text
async fn read_response(response: reqwest::Response) -> Result<RawResponse, ForgeError> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response.text().await?;

    Ok(RawResponse {
        status,
        content_type,
        body,
    })
}
