//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::ForgeError;
use crate::server::cors::cors;
use crate::server::envelope::Reply;
use crate::server::handlers::{
    chat_handler, create_account_handler, create_server_handler, deploy_handler, health_handler,
    not_found_handler, server_status_handler, upload_files_handler, version_handler, wait_handler,
};
use crate::server::state::ServerState;

/// Answer methods outside `allowed` with a 405 envelope
fn only(
    methods: MethodRouter<Arc<ServerState>>,
    allowed: &'static [&'static str],
) -> MethodRouter<Arc<ServerState>> {
    methods.fallback(move || async move { Reply::method_not_allowed(allowed) })
}

/// The relay's routes and middleware
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", only(get(health_handler), &["GET"]))
        .route("/version", only(get(version_handler), &["GET"]))
        // Hosting panel
        .route("/api/accounts", only(post(create_account_handler), &["POST"]))
        .route("/api/servers", only(post(create_server_handler), &["POST"]))
        .route(
            "/api/servers/{id}/status",
            only(get(server_status_handler), &["GET"]),
        )
        .route("/api/servers/{id}/wait", only(post(wait_handler), &["POST"]))
        .route(
            "/api/servers/{id}/files",
            only(post(upload_files_handler), &["POST"]),
        )
        // AI and workflow
        .route("/api/chat", only(post(chat_handler), &["POST"]))
        .route("/api/deploy", only(post(deploy_handler), &["POST"]))
        .fallback(not_found_handler)
        // State and middleware
        .with_state(state)
        .layer(middleware::from_fn(cors))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), ForgeError>>, ForgeError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ForgeError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ForgeError::ServerError(e.to_string()))
    });

    Ok(handle)
}
