//! botforge - Entry Point
//!
//! Relay between a Discord-bot builder UI, a hosting panel and an AI
//! chat-completion vendor.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::Context;
use botforge::app::options::AppOptions;
use botforge::app::run::run;
use botforge::logs::init_logging;
use botforge::storage::settings::{load_settings, Credentials, DEFAULT_SETTINGS_PATH};
use botforge::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = start().await {
        eprintln!("botforge: {:#}", e);
        std::process::exit(1);
    }
}

async fn start() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version)?);
        return Ok(());
    }

    // Retrieve the settings file
    let settings_path = cli_args
        .get("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
    let settings = load_settings(&settings_path)
        .await
        .with_context(|| format!("unable to read settings from {}", settings_path.display()))?;

    if cli_args.contains_key("print-config") {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    // Initialize logging
    let _log_guard = init_logging(settings.log_options()).context("failed to initialize logging")?;

    let credentials = Credentials::from_env()?;

    // Run the server
    let options = AppOptions::from(settings);
    info!("Running botforge {} with options: {:?}", version.version, options);
    if let Err(e) = run(options, credentials, await_shutdown_signal()).await {
        error!("Failed to run botforge: {e}");
        return Err(e.into());
    }
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Unable to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
