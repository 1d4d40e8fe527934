//! Hosting panel transport

use async_trait::async_trait;
use panel_models::{CreateServerRequest, CreateUserRequest, WriteFileRequest};

use crate::errors::ForgeError;
use crate::http::client::HttpClient;
use crate::http::response::RawResponse;

/// One HTTP exchange per method; retries and classification live above this seam
#[async_trait]
pub trait PanelTransport: Send + Sync {
    async fn create_user(&self, body: &CreateUserRequest) -> Result<RawResponse, ForgeError>;

    async fn create_server(&self, body: &CreateServerRequest) -> Result<RawResponse, ForgeError>;

    async fn server_status(&self, server_id: &str) -> Result<RawResponse, ForgeError>;

    async fn server_resources(&self, server_id: &str) -> Result<RawResponse, ForgeError>;

    async fn write_file(
        &self,
        server_id: &str,
        body: &WriteFileRequest,
    ) -> Result<RawResponse, ForgeError>;
}

/// Panel transport over HTTP
pub struct HttpPanelTransport {
    client: HttpClient,
}

impl HttpPanelTransport {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PanelTransport for HttpPanelTransport {
    async fn create_user(&self, body: &CreateUserRequest) -> Result<RawResponse, ForgeError> {
        self.client.post("/users", body).await
    }

    async fn create_server(&self, body: &CreateServerRequest) -> Result<RawResponse, ForgeError> {
        self.client.post("/servers", body).await
    }

    async fn server_status(&self, server_id: &str) -> Result<RawResponse, ForgeError> {
        validate_server_id(server_id)?;
        self.client.get(&format!("/servers/{}", server_id)).await
    }

    async fn server_resources(&self, server_id: &str) -> Result<RawResponse, ForgeError> {
        validate_server_id(server_id)?;
        self.client
            .get(&format!("/servers/{}/resources", server_id))
            .await
    }

    async fn write_file(
        &self,
        server_id: &str,
        body: &WriteFileRequest,
    ) -> Result<RawResponse, ForgeError> {
        validate_server_id(server_id)?;
        self.client
            .post(&format!("/servers/{}/files/write", server_id), body)
            .await
    }
}

/// Server ids are interpolated into paths, so only URL-safe characters are accepted
pub fn validate_server_id(server_id: &str) -> Result<(), ForgeError> {
    if server_id.trim().is_empty() {
        return Err(ForgeError::Validation("server id is required".to_string()));
    }
    let safe = server_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !safe || server_id.chars().all(|c| c == '.') {
        return Err(ForgeError::Validation(format!(
            "server id contains unsupported characters: {}",
            server_id
        )));
    }
    Ok(())
}
