//! File upload models

use serde::{Deserialize, Serialize};

/// One file to write into a server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUploadJob {
    pub path: String,
    pub content: String,
}

impl FileUploadJob {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Outcome of one file upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadResult {
    pub path: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
    /// Content size in bytes
    pub size: usize,
}

/// Settled outcome of a batch upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    /// True when at least one file was written
    pub success: bool,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<FileUploadResult>,
}

impl UploadSummary {
    pub fn from_results(results: Vec<FileUploadResult>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let total = results.len();
        Self {
            success: successful > 0,
            total,
            successful,
            failed: total - successful,
            results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileUploadResult> {
        self.results.iter().filter(|r| !r.success)
    }
}
