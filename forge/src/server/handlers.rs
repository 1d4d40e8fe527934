//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use relay_models::{
    ChatRequest, ChatResponse, CreateAccountRequest, CreateServerRequest, DeployRequest,
    HealthResponse, UploadFilesRequest, VersionResponse,
};
use serde::Serialize;

use crate::chat::prompt::{code_preserves, removed_lines};
use crate::context::OpContext;
use crate::errors::ForgeError;
use crate::models::server::{DeploymentRequest, ServerStatus};
use crate::models::upload::FileUploadJob;
use crate::panel::api::validate_server_id;
use crate::server::envelope::{body, Reply};
use crate::server::state::ServerState;
use crate::utils::version_info;

const STAGE: &str = "relay";

/// Health check handler
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "botforge".to_string(),
        version: version_info().version,
    })
}

/// Version handler
pub async fn version_handler() -> Json<VersionResponse> {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Create a hosting account
pub async fn create_account_handler(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Reply {
    let ctx = state.new_context();
    let result = async {
        let request = body(payload)?;
        state
            .provisioner
            .create_account(&ctx, &request.email, &request.username)
            .await
    }
    .await;
    Reply::created(&ctx, result)
}

/// Provision a server
pub async fn create_server_handler(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<CreateServerRequest>, JsonRejection>,
) -> Reply {
    let ctx = state.new_context();
    let result = async {
        let request = body(payload)?;
        state
            .provisioner
            .provision_server(
                &ctx,
                &request.name,
                &request.description,
                &request.owner_account_id,
            )
            .await
    }
    .await;
    Reply::created(&ctx, result)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
    server_id: String,
    status: ServerStatus,
}

/// Read a server's status once
pub async fn server_status_handler(
    State(state): State<Arc<ServerState>>,
    Path(server_id): Path<String>,
) -> Reply {
    let ctx = state.new_context();
    let result = async {
        validate_server_id(&server_id)?;
        let status = state.poller.check_status(&ctx, &server_id).await?;
        ctx.info(STAGE, format!("Server {} is {}", server_id, status.as_str()));
        Ok::<_, ForgeError>(StatusPayload {
            server_id: server_id.clone(),
            status,
        })
    }
    .await;
    Reply::ok(&ctx, result)
}

/// Block until a server has finished installing
pub async fn wait_handler(
    State(state): State<Arc<ServerState>>,
    Path(server_id): Path<String>,
) -> Reply {
    let ctx = state.new_context();
    let result = state.poller.wait_for_installation(&ctx, &server_id).await;
    Reply::ok(&ctx, result)
}

/// Write files into a server
pub async fn upload_files_handler(
    State(state): State<Arc<ServerState>>,
    Path(server_id): Path<String>,
    payload: Result<Json<UploadFilesRequest>, JsonRejection>,
) -> Reply {
    let ctx = state.new_context();
    let result = async {
        let request = body(payload)?;
        let jobs: Vec<FileUploadJob> = request
            .files
            .into_iter()
            .map(|file| FileUploadJob::new(file.path, file.content))
            .collect();
        crate::panel::files::validate_batch(&server_id, &jobs)?;
        if request.check_ready {
            state.files.wait_until_ready(&ctx, &server_id).await;
        }
        state.files.upload_files(&ctx, &server_id, &jobs).await
    }
    .await;
    Reply::ok(&ctx, result)
}

/// Generate or extend bot code
pub async fn chat_handler(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Reply {
    let ctx = state.new_context();
    let result = async {
        let request = body(payload)?;
        state.ledger.ensure_available(&request.account_id).await?;

        let completion = state
            .chat
            .get_completion(&ctx, &request.history, request.model.as_deref())
            .await?;

        let balance = state
            .ledger
            .debit(&request.account_id, completion.estimated_cost)
            .await?;

        let mut removed = Vec::new();
        let preserves_existing = match (&request.previous_code, &completion.code) {
            (Some(previous), Some(code)) => {
                let preserved = code_preserves(previous, code);
                if !preserved {
                    removed = removed_lines(previous, code)
                        .into_iter()
                        .map(str::to_string)
                        .collect();
                    ctx.warn(
                        STAGE,
                        format!("Generated code drops {} lines of the previous script", removed.len()),
                    );
                }
                Some(preserved)
            }
            _ => None,
        };

        Ok::<_, ForgeError>(ChatResponse {
            content: completion.content,
            code: completion.code,
            estimated_cost: completion.estimated_cost,
            remaining_balance: balance.remaining(),
            preserves_existing,
            removed_lines: removed,
        })
    }
    .await;
    Reply::ok(&ctx, result)
}

/// Provision, wait and upload in one call
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> Reply {
    let ctx = state.new_context();
    let result = async {
        let request = body(payload)?;
        let owner_account_id = resolve_owner(&state, &ctx, &request).await?;
        let deployment = DeploymentRequest {
            desired_name: request.desired_name,
            description: request.description,
            owner_account_id,
        };
        state.deployer().deploy_bot(&ctx, &deployment, &request.code).await
    }
    .await;
    Reply::ok(&ctx, result)
}

/// Existing owner account, or a new one created from the owner's email
async fn resolve_owner(
    state: &ServerState,
    ctx: &OpContext,
    request: &DeployRequest,
) -> Result<String, ForgeError> {
    if let Some(owner) = request.owner_account_id.as_deref().filter(|o| !o.trim().is_empty()) {
        return Ok(owner.to_string());
    }
    let Some(email) = request.owner_email.as_deref() else {
        return Err(ForgeError::Validation(
            "ownerAccountId or ownerEmail is required".to_string(),
        ));
    };
    let username = email.split('@').next().unwrap_or_default();
    let account = state.provisioner.create_account(ctx, email, username).await?;
    Ok(account.id)
}

/// Unknown path
pub async fn not_found_handler() -> Reply {
    Reply::not_found()
}
