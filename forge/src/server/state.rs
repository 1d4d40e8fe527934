//! Server state

use std::sync::Arc;

use crate::chat::client::{ChatClient, ChatTransport};
use crate::context::OpContext;
use crate::http::retry::RetryPolicy;
use crate::panel::api::PanelTransport;
use crate::panel::files::{self, FileDeployer};
use crate::panel::installer::{self, InstallationPoller};
use crate::panel::provisioner::Provisioner;
use crate::redact::Redactor;
use crate::usage::ledger::UsageLedger;
use crate::workflow::deploy::BotDeployer;

/// Tunables for the services behind the relay
#[derive(Debug, Clone)]
pub struct StateOptions {
    pub provisioning_policy: RetryPolicy,
    pub installation: installer::Options,
    pub upload: files::Options,
    pub chat_policy: RetryPolicy,
    pub default_model: String,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            provisioning_policy: RetryPolicy::provisioning(),
            installation: installer::Options::default(),
            upload: files::Options::default(),
            chat_policy: RetryPolicy::chat(),
            default_model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Server state shared across handlers
pub struct ServerState {
    pub provisioner: Provisioner,
    pub poller: InstallationPoller,
    pub files: FileDeployer,
    pub chat: ChatClient,
    pub ledger: Arc<UsageLedger>,
    pub redactor: Redactor,
}

impl ServerState {
    pub fn new(
        panel: Arc<dyn PanelTransport>,
        chat: Arc<dyn ChatTransport>,
        ledger: Arc<UsageLedger>,
        redactor: Redactor,
        options: StateOptions,
    ) -> Self {
        Self {
            provisioner: Provisioner::new(panel.clone(), options.provisioning_policy),
            poller: InstallationPoller::new(panel.clone(), options.installation),
            files: FileDeployer::new(panel, options.upload),
            chat: ChatClient::new(chat, options.chat_policy, options.default_model),
            ledger,
            redactor,
        }
    }

    /// Fresh diagnostic context for one request
    pub fn new_context(&self) -> OpContext {
        OpContext::new(self.redactor.clone())
    }

    pub fn deployer(&self) -> BotDeployer<'_> {
        BotDeployer {
            provisioner: &self.provisioner,
            poller: &self.poller,
            files: &self.files,
        }
    }
}
