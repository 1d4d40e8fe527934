//! Main application run loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::chat::client::HttpChatTransport;
use crate::errors::ForgeError;
use crate::http::client::HttpClient;
use crate::panel::api::HttpPanelTransport;
use crate::redact::Redactor;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::storage::settings::Credentials;
use crate::usage::ledger::{InMemoryBalanceStore, UsageLedger};
use crate::usage::roles::{Role, StaticRoleDirectory};

/// Run the botforge relay until `shutdown_signal` resolves
pub async fn run(
    options: AppOptions,
    credentials: Credentials,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ForgeError> {
    info!("Initializing botforge...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.max_shutdown_delay);

    if let Err(e) = init(&options, credentials, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start botforge: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    credentials: Credentials,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), ForgeError> {
    let state = init_server_state(options, credentials).await?;

    info!("Initializing local HTTP server...");
    let mut shutdown_rx = shutdown_tx.subscribe();
    let server_handle = serve(&options.server, Arc::new(state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;
    shutdown_manager.with_socket_server_handle(server_handle)
}

async fn init_server_state(
    options: &AppOptions,
    credentials: Credentials,
) -> Result<ServerState, ForgeError> {
    let redactor = Redactor::from_secrets([&credentials.panel_api_key, &credentials.chat_api_key]);

    let panel = HttpPanelTransport::new(HttpClient::new(
        &options.panel_base_url,
        credentials.panel_api_key,
    )?);
    let chat = HttpChatTransport::new(HttpClient::new(
        &options.chat_base_url,
        credentials.chat_api_key,
    )?);

    let roles = StaticRoleDirectory::new(options.default_role);
    for account in &options.admin_accounts {
        roles.assign(account, Role::Admin).await;
    }
    let ledger = UsageLedger::new(
        Arc::new(InMemoryBalanceStore::new()),
        Arc::new(roles),
        options.role_limits,
    );

    Ok(ServerState::new(
        Arc::new(panel),
        Arc::new(chat),
        Arc::new(ledger),
        redactor,
        options.services.clone(),
    ))
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    max_shutdown_delay: Duration,
    socket_server_handle: Option<JoinHandle<Result<(), ForgeError>>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, max_shutdown_delay: Duration) -> Self {
        Self {
            shutdown_tx,
            max_shutdown_delay,
            socket_server_handle: None,
        }
    }

    pub fn with_socket_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), ForgeError>>,
    ) -> Result<(), ForgeError> {
        if self.socket_server_handle.is_some() {
            return Err(ForgeError::ShutdownError("server_handle already set".to_string()));
        }
        self.socket_server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), ForgeError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(self.max_shutdown_delay, self.shutdown_impl()).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, aborting in-flight requests",
                    self.max_shutdown_delay
                );
                if let Some(handle) = self.socket_server_handle.take() {
                    handle.abort();
                }
                Err(ForgeError::ShutdownError(format!(
                    "graceful shutdown exceeded {:?}",
                    self.max_shutdown_delay
                )))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), ForgeError> {
        info!("Shutting down botforge...");

        // In-flight requests finish before the server task returns
        if let Some(handle) = self.socket_server_handle.as_mut() {
            handle
                .await
                .map_err(|e| ForgeError::ShutdownError(e.to_string()))??;
            self.socket_server_handle = None;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
