pub mod api_client;
pub mod pin_client;
pub mod status;
pub mod workflow;

use crate::services::pinning::PinnedContent;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub use api_client::ApiRecordClient;
pub use pin_client::PinClient;
pub use workflow::{UploadStage, UploadState, UploadWorkflow};

/// A file the user selected for upload
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Progress observer: called with percentages from 0 to 100, never decreasing
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, Error)]
pub enum PinClientError {
    #[error("upload cancelled")]
    Cancelled,

    #[error("upload rejected by server ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("no response from server")]
    NoResponse,

    #[error("malformed response from server: {0}")]
    Malformed(String),

    #[error("invalid file: {0}")]
    InvalidFile(String),
}

/// Seam between the orchestrator and whatever pins content for it
#[async_trait::async_trait]
pub trait ContentPinner: Send + Sync {
    async fn pin(
        &self,
        file: &FileHandle,
        on_progress: Option<ProgressFn>,
    ) -> Result<PinnedContent, PinClientError>;
}

/// Payload persisted after a confirmed transaction
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUploadRecord {
    pub cid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Error)]
pub enum RecordSinkError {
    #[error("record already exists")]
    Duplicate,

    #[error("record rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Seam between the orchestrator and the metadata store
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    async fn save(&self, record: &NewUploadRecord) -> Result<(), RecordSinkError>;
}
