use super::{NewUploadRecord, RecordSink, RecordSinkError};
use anyhow::Context;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

/// Persists upload records through the backend REST API
pub struct ApiRecordClient {
    http: reqwest::Client,
    endpoint: Url,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

impl ApiRecordClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base: Url = base_url.parse().context("invalid server URL")?;
        let endpoint = base.join("/api/upload").context("invalid server URL")?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }
}

#[async_trait::async_trait]
impl RecordSink for ApiRecordClient {
    async fn save(&self, record: &NewUploadRecord) -> Result<(), RecordSinkError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(record)
            .send()
            .await
            .map_err(|e| RecordSinkError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::CONFLICT {
            return Err(RecordSinkError::Duplicate);
        }

        let message = response
            .json::<ApiErrorBody>()
            .await
            .map(|body| body.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.to_string());
        Err(RecordSinkError::Rejected(message))
    }
}
