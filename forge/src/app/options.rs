//! Application configuration options

use std::time::Duration;

use crate::server::state::StateOptions;
use crate::storage::settings::Settings;
use crate::usage::roles::{Role, RoleLimits};

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Hosting panel API base URL
    pub panel_base_url: String,

    /// AI chat-completion API base URL
    pub chat_base_url: String,

    /// Server configuration
    pub server: ServerOptions,

    /// Service tunables
    pub services: StateOptions,

    /// Starting balances per role
    pub role_limits: RoleLimits,

    /// Role of unassigned accounts
    pub default_role: Role,

    /// Accounts with unmetered usage
    pub admin_accounts: Vec<String>,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Settings::default().into()
    }
}

impl From<Settings> for AppOptions {
    fn from(settings: Settings) -> Self {
        let max_shutdown_delay = settings.max_shutdown_delay();
        Self {
            services: StateOptions {
                installation: settings.installation.to_options(),
                upload: settings.upload.to_options(),
                default_model: settings.chat.default_model,
                ..Default::default()
            },
            panel_base_url: settings.panel.base_url,
            chat_base_url: settings.chat.base_url,
            server: ServerOptions {
                host: settings.server.host,
                port: settings.server.port,
            },
            role_limits: settings.role_limits,
            default_role: settings.default_role,
            admin_accounts: settings.admin_accounts,
            max_shutdown_delay,
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
