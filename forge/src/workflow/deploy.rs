//! End-to-end bot deployment: provision, wait for installation, upload

use serde::Serialize;

use crate::context::OpContext;
use crate::errors::ForgeError;
use crate::models::server::{DeploymentRequest, InstallationReport, ProvisionedServer, ServerStatus};
use crate::models::upload::UploadSummary;
use crate::panel::files::FileDeployer;
use crate::panel::installer::InstallationPoller;
use crate::panel::provisioner::Provisioner;
use crate::workflow::bundle::bot_bundle;

const STAGE: &str = "deploy";

/// Result of a completed deployment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOutcome {
    pub server: ProvisionedServer,
    pub installation: InstallationReport,
    pub ready_before_upload: bool,
    pub upload: UploadSummary,
}

/// Wires the three panel stages together
pub struct BotDeployer<'a> {
    pub provisioner: &'a Provisioner,
    pub poller: &'a InstallationPoller,
    pub files: &'a FileDeployer,
}

impl BotDeployer<'_> {
    /// Deploy `code` as a new bot server
    ///
    /// The server is provisioned exactly once. When a later stage fails the
    /// error is returned and the created server is left in place; its id is
    /// in the context's log.
    pub async fn deploy_bot(
        &self,
        ctx: &OpContext,
        request: &DeploymentRequest,
        code: &str,
    ) -> Result<DeploymentOutcome, ForgeError> {
        let files = bot_bundle(&request.desired_name, &request.description, code)?;

        ctx.info(STAGE, format!("Deploying bot '{}'", request.desired_name));
        let mut server = self
            .provisioner
            .provision_server(
                ctx,
                &request.desired_name,
                &request.description,
                &request.owner_account_id,
            )
            .await?;

        let installation = self.poller.wait_for_installation(ctx, &server.id).await?;
        server.status = ServerStatus::Running;

        let ready_before_upload = self.files.wait_until_ready(ctx, &server.id).await;
        let upload = self.files.upload_files(ctx, &server.id, &files).await?;

        if upload.success {
            ctx.info(STAGE, format!("Bot '{}' deployed to {}", server.name, server.id));
        } else {
            ctx.error(STAGE, format!("No files could be written to {}", server.id));
        }

        Ok(DeploymentOutcome {
            server,
            installation,
            ready_before_upload,
            upload,
        })
    }
}
