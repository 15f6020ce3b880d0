//! Knowledge base entity and related types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a remote knowledge base.
///
/// Owned and advanced by the managed service; this process only observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KnowledgeBaseStatus {
    Creating,
    Active,
    Deleting,
    Failed,
    Unknown,
}

impl KnowledgeBaseStatus {
    /// Map a status string reported by the managed service
    pub fn from_remote(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "CREATING" => Self::Creating,
            "ACTIVE" => Self::Active,
            "DELETING" => Self::Deleting,
            "FAILED" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "CREATING",
            Self::Active => "ACTIVE",
            Self::Deleting => "DELETING",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for KnowledgeBaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A knowledge base as seen by one remote call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeBaseHandle {
    pub name: String,
    pub id: String,
    pub data_source_id: Option<String>,
    pub status: KnowledgeBaseStatus,
}

/// One entry of the knowledge base listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeBaseSummary {
    pub name: String,
    pub id: String,
    pub status: KnowledgeBaseStatus,
}

impl KnowledgeBaseSummary {
    pub fn new(name: impl Into<String>, id: impl Into<String>, status: KnowledgeBaseStatus) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            status,
        }
    }
}

/// Descriptive fields returned by a knowledge base lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeBaseDetails {
    pub id: String,
    pub name: String,
    pub status: KnowledgeBaseStatus,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl KnowledgeBaseDetails {
    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or("No description")
    }

    pub fn created_display(&self) -> String {
        display_timestamp(self.created_at)
    }

    pub fn updated_display(&self) -> String {
        display_timestamp(self.updated_at)
    }
}

fn display_timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Status of a remote ingestion job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IngestionJobStatus {
    Starting,
    InProgress,
    Complete,
    Failed,
    Stopping,
    Stopped,
    Unknown,
}

impl IngestionJobStatus {
    pub fn from_remote(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "STARTING" => Self::Starting,
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETE" => Self::Complete,
            "FAILED" => Self::Failed,
            "STOPPING" => Self::Stopping,
            "STOPPED" => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    /// No further transitions will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Stopped)
    }
}

/// Snapshot of an ingestion job
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionJob {
    pub id: String,
    pub status: IngestionJobStatus,
    pub failure_reasons: Vec<String>,
}

impl IngestionJob {
    pub fn new(id: impl Into<String>, status: IngestionJobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            failure_reasons: Vec::new(),
        }
    }

    pub fn with_failure_reasons(mut self, reasons: Vec<String>) -> Self {
        self.failure_reasons = reasons;
        self
    }
}

/// Which provisioned resources a delete also removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    pub delete_bucket: bool,
    pub delete_iam_roles_and_policies: bool,
    pub delete_search_index_store: bool,
}

impl Default for DeleteOptions {
    /// Keeps the document bucket, removes access roles and the search store
    fn default() -> Self {
        Self {
            delete_bucket: false,
            delete_iam_roles_and_policies: true,
            delete_search_index_store: true,
        }
    }
}

impl DeleteOptions {
    /// Remove every resource provisioned for the knowledge base
    pub fn everything() -> Self {
        Self {
            delete_bucket: true,
            delete_iam_roles_and_policies: true,
            delete_search_index_store: true,
        }
    }
}

/// Outcome of uploading a document directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReport {
    pub uploaded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
