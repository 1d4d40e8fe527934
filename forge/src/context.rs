//! Per-operation diagnostic context
//!
//! An [`OpContext`] is created by whoever starts a top-level workflow (a relay
//! handler, a CLI command) and passed by reference to every stage. Entries go
//! to a bounded ring buffer that is returned to the caller, and are mirrored
//! to `tracing` with the correlation id attached.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Utc;
use relay_models::{DiagnosticEntry, DiagnosticLevel};
use tracing::{debug, error, info, warn};

use crate::redact::Redactor;

/// Default number of diagnostic entries kept per operation
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Diagnostic context threaded through one logical operation
pub struct OpContext {
    correlation_id: String,
    capacity: usize,
    entries: Mutex<VecDeque<DiagnosticEntry>>,
    redactor: Redactor,
}

impl OpContext {
    pub fn new(redactor: Redactor) -> Self {
        Self::with_capacity(redactor, DEFAULT_LOG_CAPACITY)
    }

    pub fn with_capacity(redactor: Redactor, capacity: usize) -> Self {
        Self {
            correlation_id: crate::utils::generate_uuid(),
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            redactor,
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub fn debug(&self, stage: &str, message: impl Into<String>) {
        self.record(stage, DiagnosticLevel::Debug, message.into());
    }

    pub fn info(&self, stage: &str, message: impl Into<String>) {
        self.record(stage, DiagnosticLevel::Info, message.into());
    }

    pub fn warn(&self, stage: &str, message: impl Into<String>) {
        self.record(stage, DiagnosticLevel::Warn, message.into());
    }

    pub fn error(&self, stage: &str, message: impl Into<String>) {
        self.record(stage, DiagnosticLevel::Error, message.into());
    }

    fn record(&self, stage: &str, level: DiagnosticLevel, message: String) {
        let message = self.redactor.redact(&message);
        let id = self.correlation_id.as_str();
        match level {
            DiagnosticLevel::Debug => debug!(request_id = id, stage, "{}", message),
            DiagnosticLevel::Info => info!(request_id = id, stage, "{}", message),
            DiagnosticLevel::Warn => warn!(request_id = id, stage, "{}", message),
            DiagnosticLevel::Error => error!(request_id = id, stage, "{}", message),
        }

        let entry = DiagnosticEntry {
            stage: stage.to_string(),
            level,
            message,
            timestamp: Utc::now(),
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Copy of the buffered entries, oldest first
    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }
}
