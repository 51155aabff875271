use super::{ContentPinner, FileHandle, PinClientError, ProgressFn};
use crate::services::pinning::PinnedContent;
use anyhow::Context;
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Uploads files to the backend pinning gateway with progress reporting,
/// cancellation, and a bounded timeout
pub struct PinClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
    cancel: CancellationToken,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayPinData {
    #[serde(default)]
    content_id: String,
    #[serde(default)]
    pin_size_bytes: i64,
    #[serde(default)]
    pinned_at: String,
}

#[derive(Deserialize)]
struct GatewayPinResponse {
    #[serde(default)]
    success: bool,
    data: Option<GatewayPinData>,
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    message: String,
}

impl PinClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, DEFAULT_UPLOAD_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base: Url = base_url.parse().context("invalid server URL")?;
        let endpoint = base
            .join("/api/upload/ipfs")
            .context("invalid server URL")?;

        Ok(Self {
            http: reqwest::Client::builder()
                .build()
                .context("failed to build HTTP client")?,
            endpoint,
            timeout,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that aborts an in-flight upload when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Sends the file to the gateway. `on_progress` observes monotonically
    /// non-decreasing percentages as chunks are handed to the transport.
    pub async fn upload(
        &self,
        file: &FileHandle,
        on_progress: Option<ProgressFn>,
    ) -> Result<PinnedContent, PinClientError> {
        if self.cancel.is_cancelled() {
            return Err(PinClientError::Cancelled);
        }

        let total = file.bytes.len() as u64;
        let data = file.bytes.clone();
        let token = self.cancel.clone();
        let progress = on_progress.clone();

        let body_stream = async_stream::stream! {
            let mut sent: u64 = 0;
            for chunk in data.chunks(UPLOAD_CHUNK_SIZE) {
                if token.is_cancelled() {
                    yield Err(std::io::Error::new(
                        std::io::ErrorKind::Interrupted,
                        "upload cancelled",
                    ));
                    return;
                }
                sent += chunk.len() as u64;
                if let Some(callback) = progress.as_ref() {
                    let percent = (sent.saturating_mul(100) / total.max(1)).min(100) as u8;
                    callback(percent);
                }
                yield Ok(Bytes::copy_from_slice(chunk));
            }
        };

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(body_stream.boxed()),
            total,
        )
        .file_name(file.name.clone())
        .mime_str(&file.mime)
        .map_err(|e| PinClientError::InvalidFile(format!("invalid content type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let request = self
            .http
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .multipart(form);

        let result = tokio::select! {
            _ = self.cancel.cancelled() => return Err(PinClientError::Cancelled),
            result = request.send() => result,
        };

        let response = match result {
            Ok(response) => response,
            Err(_) if self.cancel.is_cancelled() => return Err(PinClientError::Cancelled),
            Err(e) => {
                tracing::warn!("pin upload transport failure: {}", e);
                return Err(PinClientError::NoResponse);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<GatewayErrorBody>()
                .await
                .map(|body| body.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| status.to_string());
            return Err(PinClientError::ServerRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: GatewayPinResponse = response
            .json()
            .await
            .map_err(|e| PinClientError::Malformed(e.to_string()))?;

        match body.data {
            Some(data) if body.success && !data.content_id.is_empty() => Ok(PinnedContent {
                cid: data.content_id,
                pin_size_bytes: data.pin_size_bytes,
                pinned_at: data.pinned_at,
            }),
            _ => Err(PinClientError::Malformed(
                "response missing content identifier".to_string(),
            )),
        }
    }
}

#[async_trait::async_trait]
impl ContentPinner for PinClient {
    async fn pin(
        &self,
        file: &FileHandle,
        on_progress: Option<ProgressFn>,
    ) -> Result<PinnedContent, PinClientError> {
        self.upload(file, on_progress).await
    }
}
