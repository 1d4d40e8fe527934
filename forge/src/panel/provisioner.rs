//! Account and server provisioning on the hosting panel

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use panel_models::{CreateServerRequest, CreateUserRequest, Envelope, ServerAttributes, UserAttributes};

use crate::context::OpContext;
use crate::errors::ForgeError;
use crate::http::retry::{send_with_retry, RetryPolicy};
use crate::models::server::{HostingAccount, ProvisionedServer, ServerStatus};
use crate::panel::api::{validate_server_id, PanelTransport};
use crate::panel::classify::{classify_failure, PanelCall};

const STAGE: &str = "provision";

/// Creates hosting accounts and servers
pub struct Provisioner {
    transport: Arc<dyn PanelTransport>,
    policy: RetryPolicy,
}

impl Provisioner {
    pub fn new(transport: Arc<dyn PanelTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Create one server owned by `owner_account_id`
    ///
    /// Every successful call creates a remote server; call it once per deployment.
    pub async fn provision_server(
        &self,
        ctx: &OpContext,
        name: &str,
        description: &str,
        owner_account_id: &str,
    ) -> Result<ProvisionedServer, ForgeError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ForgeError::Validation("server name is required".to_string()));
        }
        if owner_account_id.trim().is_empty() {
            return Err(ForgeError::Validation("owner account id is required".to_string()));
        }

        let body = CreateServerRequest {
            name: name.to_string(),
            description: description.to_string(),
            user: owner_account_id.to_string(),
        };

        ctx.info(
            STAGE,
            format!("Creating server '{}' for account {}", name, owner_account_id),
        );

        // No idempotency key upstream: a timed-out attempt may still have created a server
        let attempts = AtomicU32::new(0);
        let response = send_with_retry(ctx, &self.policy, "create server", || {
            if attempts.fetch_add(1, Ordering::SeqCst) > 0 {
                ctx.warn(
                    STAGE,
                    "Retrying server creation; an earlier attempt may already have created a server",
                );
            }
            self.transport.create_server(&body)
        })
        .await?;

        if !response.is_success() {
            let err = classify_failure(&response, ctx.redactor(), PanelCall::Provisioning);
            ctx.error(STAGE, format!("Server creation failed: {}", err));
            return Err(err);
        }

        let envelope: Envelope<ServerAttributes> = response.parse_json(ctx.redactor())?;
        let attributes = envelope.into_attributes().unwrap_or_default();
        let id = attributes.server_id().ok_or_else(|| {
            ForgeError::ProvisioningFailed("identifier missing in success response".to_string())
        })?;
        if validate_server_id(&id).is_err() {
            ctx.error(STAGE, format!("Panel returned an unusable server id: {}", id));
            return Err(ForgeError::ProvisioningFailed(format!(
                "panel returned a server id that cannot be addressed: {}",
                id
            )));
        }

        let server = ProvisionedServer {
            id,
            name: attributes.name.clone().unwrap_or_else(|| name.to_string()),
            owner_account_id: attributes
                .user
                .as_ref()
                .map(|user| user.to_string())
                .unwrap_or_else(|| owner_account_id.to_string()),
            status: ServerStatus::Installing,
        };

        ctx.info(STAGE, format!("Server {} created", server.id));
        Ok(server)
    }

    /// Create a hosting account for a user without one
    pub async fn create_account(
        &self,
        ctx: &OpContext,
        email: &str,
        username: &str,
    ) -> Result<HostingAccount, ForgeError> {
        let email = email.trim();
        let username = username.trim();
        if !email.contains('@') {
            return Err(ForgeError::Validation(format!("invalid email address: {}", email)));
        }
        if username.is_empty() {
            return Err(ForgeError::Validation("username is required".to_string()));
        }

        let body = CreateUserRequest {
            email: email.to_string(),
            username: username.to_string(),
        };

        ctx.info(STAGE, format!("Creating hosting account '{}'", username));
        let response = send_with_retry(ctx, &self.policy, "create account", || {
            self.transport.create_user(&body)
        })
        .await?;

        if !response.is_success() {
            let err = classify_failure(&response, ctx.redactor(), PanelCall::Provisioning);
            ctx.error(STAGE, format!("Account creation failed: {}", err));
            return Err(err);
        }

        let envelope: Envelope<UserAttributes> = response.parse_json(ctx.redactor())?;
        let attributes = envelope.into_attributes().unwrap_or_default();
        let id = attributes
            .id
            .as_ref()
            .or(attributes.uuid.as_ref())
            .filter(|id| !id.is_blank())
            .map(|id| id.to_string())
            .ok_or_else(|| {
                ForgeError::ProvisioningFailed("identifier missing in success response".to_string())
            })?;

        Ok(HostingAccount {
            id,
            username: attributes.username.unwrap_or_else(|| username.to_string()),
            email: attributes.email.unwrap_or_else(|| email.to_string()),
        })
    }
}
