//! Settings file management

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ForgeError;
use crate::logs::{LogLevel, LogOptions};
use crate::panel::{files, installer};
use crate::usage::roles::{Role, RoleLimits};

pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";
pub const PANEL_API_KEY_VAR: &str = "BOTFORGE_PANEL_API_KEY";
pub const CHAT_API_KEY_VAR: &str = "BOTFORGE_CHAT_API_KEY";

/// Relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Local HTTP server
    #[serde(default)]
    pub server: ServerSettings,

    /// Hosting panel API
    #[serde(default)]
    pub panel: PanelSettings,

    /// AI chat-completion API
    #[serde(default)]
    pub chat: ChatSettings,

    /// Installation polling
    #[serde(default)]
    pub installation: InstallationSettings,

    /// File uploads
    #[serde(default)]
    pub upload: UploadSettings,

    /// Starting balances per role
    #[serde(default)]
    pub role_limits: RoleLimits,

    /// Role of accounts without an explicit assignment
    #[serde(default)]
    pub default_role: Role,

    /// Accounts with unmetered usage
    #[serde(default)]
    pub admin_accounts: Vec<String>,

    /// Maximum delay for graceful shutdown in seconds
    #[serde(default = "default_max_shutdown_delay")]
    pub max_shutdown_delay_secs: u64,
}

fn default_max_shutdown_delay() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            panel: PanelSettings::default(),
            chat: ChatSettings::default(),
            installation: InstallationSettings::default(),
            upload: UploadSettings::default(),
            role_limits: RoleLimits::default(),
            default_role: Role::Free,
            admin_accounts: Vec::new(),
            max_shutdown_delay_secs: default_max_shutdown_delay(),
        }
    }
}

impl Settings {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level,
            json_format: self.log_json,
            log_dir: self.log_dir.clone(),
            ..Default::default()
        }
    }

    pub fn max_shutdown_delay(&self) -> Duration {
        Duration::from_secs(self.max_shutdown_delay_secs)
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Hosting panel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSettings {
    /// Base URL of the panel's application API
    #[serde(default = "default_panel_url")]
    pub base_url: String,
}

fn default_panel_url() -> String {
    "http://localhost:8000/api/application".to_string()
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            base_url: default_panel_url(),
        }
    }
}

/// AI vendor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_chat_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_chat_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            base_url: default_chat_url(),
            default_model: default_model(),
        }
    }
}

/// Installation poller settings, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_failure_interval")]
    pub max_failure_interval_ms: u64,

    #[serde(default = "default_install_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

fn default_poll_interval() -> u64 {
    5_000
}

fn default_max_failure_interval() -> u64 {
    10_000
}

fn default_install_timeout() -> u64 {
    300_000
}

fn default_max_consecutive_failures() -> u32 {
    10
}

impl Default for InstallationSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_failure_interval_ms: default_max_failure_interval(),
            timeout_ms: default_install_timeout(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

impl InstallationSettings {
    pub fn to_options(&self) -> installer::Options {
        installer::Options {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_failure_interval: Duration::from_millis(self.max_failure_interval_ms),
            timeout: Duration::from_millis(self.timeout_ms),
            max_consecutive_failures: self.max_consecutive_failures,
            ..Default::default()
        }
    }
}

/// Upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Readiness checks before uploading anyway
    #[serde(default = "default_readiness_checks")]
    pub readiness_checks: u32,

    #[serde(default = "default_readiness_pause")]
    pub readiness_pause_ms: u64,
}

fn default_readiness_checks() -> u32 {
    3
}

fn default_readiness_pause() -> u64 {
    30_000
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            readiness_checks: default_readiness_checks(),
            readiness_pause_ms: default_readiness_pause(),
        }
    }
}

impl UploadSettings {
    pub fn to_options(&self) -> files::Options {
        files::Options {
            readiness_checks: self.readiness_checks,
            readiness_pause: Duration::from_millis(self.readiness_pause_ms),
            ..Default::default()
        }
    }
}

/// Read the settings file; a missing file yields the defaults
pub async fn load_settings(path: &Path) -> Result<Settings, ForgeError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No settings file at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&raw)
        .map_err(|e| ForgeError::ConfigError(format!("invalid {}: {}", path.display(), e)))
}

/// Upstream API keys, never written to the settings file
pub struct Credentials {
    pub panel_api_key: SecretString,
    pub chat_api_key: SecretString,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ForgeError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ForgeError> {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(SecretString::from)
                .ok_or_else(|| ForgeError::ConfigError(format!("{} is not set", name)))
        };
        Ok(Self {
            panel_api_key: read(PANEL_API_KEY_VAR)?,
            chat_api_key: read(CHAT_API_KEY_VAR)?,
        })
    }
}
