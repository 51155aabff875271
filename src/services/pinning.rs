use crate::config::AppConfig;
use anyhow::Context;
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result of a successful pin: the CID plus what the service reported about it
#[derive(Debug, Clone)]
pub struct PinnedContent {
    pub cid: String,
    pub pin_size_bytes: i64,
    pub pinned_at: String,
}

#[derive(Debug, Error)]
pub enum PinError {
    /// Service credentials were never configured. Not retryable.
    #[error("pinning service credentials are not configured")]
    MissingCredentials,

    /// The service refused the upload (4xx). Not retryable.
    #[error("pinning service rejected the upload: {0}")]
    Rejected(String),

    /// Transport failure or 5xx from the service. Retryable.
    #[error("pinning service unavailable: {0}")]
    Upstream(String),

    /// 2xx response that did not carry a CID
    #[error("unexpected response from pinning service: {0}")]
    Malformed(String),
}

impl PinError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PinError::Upstream(_))
    }
}

/// A pinning backend: stores a file on the content network and returns its CID
#[async_trait::async_trait]
pub trait PinningService: Send + Sync {
    async fn pin_file(
        &self,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<PinnedContent, PinError>;
}

/// Pinata client. Each call is one independent upload attempt; retries are
/// the caller's concern.
pub struct PinataService {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    secret_key: String,
}

impl PinataService {
    pub fn new(
        api_url: String,
        api_key: String,
        secret_key: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build pinning HTTP client")?;

        Ok(Self {
            http,
            api_url,
            api_key,
            secret_key,
        })
    }
}

#[derive(Deserialize)]
struct PinataResponse {
    #[serde(rename = "IpfsHash", default)]
    ipfs_hash: String,
    #[serde(rename = "PinSize", default)]
    pin_size: i64,
    #[serde(rename = "Timestamp", default)]
    timestamp: String,
}

#[async_trait::async_trait]
impl PinningService for PinataService {
    async fn pin_file(
        &self,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<PinnedContent, PinError> {
        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| PinError::Rejected(format!("invalid content type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&self.api_url)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PinError::Upstream(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(PinError::Upstream(format!(
                "pinning service returned {}",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PinError::Rejected(format!("{}: {}", status, body)));
        }

        let body: PinataResponse = response
            .json()
            .await
            .map_err(|e| PinError::Malformed(e.to_string()))?;

        if body.ipfs_hash.is_empty() {
            return Err(PinError::Malformed("response missing IpfsHash".to_string()));
        }

        Ok(PinnedContent {
            cid: body.ipfs_hash,
            pin_size_bytes: body.pin_size,
            pinned_at: body.timestamp,
        })
    }
}

/// Installed when credentials are missing so every gateway request fails with
/// a configuration error instead of reaching the network
pub struct UnconfiguredPinning;

#[async_trait::async_trait]
impl PinningService for UnconfiguredPinning {
    async fn pin_file(
        &self,
        _filename: &str,
        _content_type: &str,
        _data: Bytes,
    ) -> Result<PinnedContent, PinError> {
        Err(PinError::MissingCredentials)
    }
}

/// Builds the pinning backend from config
pub fn create_pinning_service(config: &AppConfig) -> anyhow::Result<Arc<dyn PinningService>> {
    match (&config.pinata_api_key, &config.pinata_secret_key) {
        (Some(api_key), Some(secret_key)) => Ok(Arc::new(PinataService::new(
            config.pinata_api_url.clone(),
            api_key.clone(),
            secret_key.clone(),
            config.pin_timeout,
        )?)),
        _ => {
            tracing::error!(
                "PINATA_API_KEY / PINATA_SECRET_KEY not set; pin requests will fail"
            );
            Ok(Arc::new(UnconfiguredPinning))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_pinning_always_fails() {
        let service = UnconfiguredPinning;
        let err = service
            .pin_file("test.pdf", "application/pdf", Bytes::from_static(b"%PDF-"))
            .await
            .unwrap_err();
        assert!(matches!(err, PinError::MissingCredentials));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PinError::Upstream("503".to_string()).is_retryable());
        assert!(!PinError::Rejected("401".to_string()).is_retryable());
        assert!(!PinError::Malformed("no hash".to_string()).is_retryable());
        assert!(!PinError::MissingCredentials.is_retryable());
    }

    #[test]
    fn test_create_pinning_service_without_credentials() {
        let config = AppConfig::development();
        // Builds the fallback service rather than erroring out
        assert!(create_pinning_service(&config).is_ok());
    }
}
