use crate::AppState;
use crate::api::error::AppError;
use crate::services::pinning::{PinError, PinnedContent};
use crate::utils::retry::{BackoffStrategy, retry_with_backoff};
use crate::utils::validation::{is_accepted_mime, sanitize_filename, verify_magic_bytes};
use axum::{Json, extract::Multipart, extract::State};
use bytes::Bytes;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PinData {
    pub content_id: String,
    pub pin_size_bytes: i64,
    pub pinned_at: String,
}

impl From<PinnedContent> for PinData {
    fn from(pinned: PinnedContent) -> Self {
        Self {
            content_id: pinned.cid,
            pin_size_bytes: pinned.pin_size_bytes,
            pinned_at: pinned.pinned_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PinResponse {
    pub success: bool,
    pub message: String,
    pub data: PinData,
}

#[utoipa::path(
    post,
    path = "/api/upload/ipfs",
    request_body(content = Multipart, description = "Multipart upload with a single 'file' field"),
    responses(
        (status = 200, description = "File pinned", body = PinResponse),
        (status = 400, description = "Missing file, bad type, or too large"),
        (status = 500, description = "Pinning credentials not configured"),
        (status = 502, description = "Pinning service unavailable")
    ),
    tag = "pinning"
)]
pub async fn pin_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PinResponse>, AppError> {
    let mut file: Option<(String, String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        let msg = e.to_string();
        if msg.contains("length limit exceeded") {
            AppError::BadRequest(format!(
                "File size exceeds the {} MB limit",
                state.config.max_file_size / 1024 / 1024
            ))
        } else {
            AppError::BadRequest(msg)
        }
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = sanitize_filename(field.file_name().unwrap_or("file"));
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        file = Some((filename, content_type, data));
    }

    let Some((filename, content_type, data)) = file else {
        return Err(AppError::BadRequest("No file provided".to_string()));
    };

    if !is_accepted_mime(&content_type) {
        return Err(AppError::BadRequest(
            "Invalid file type. Only PDF, PNG, and JPEG files are allowed.".to_string(),
        ));
    }
    if data.len() > state.config.max_file_size {
        return Err(AppError::BadRequest(format!(
            "File size exceeds the {} MB limit",
            state.config.max_file_size / 1024 / 1024
        )));
    }
    if !verify_magic_bytes(&data, &content_type) {
        return Err(AppError::BadRequest(
            "File content does not match its declared type".to_string(),
        ));
    }

    let attempts = state.config.pin_max_retries + 1;
    let pinned = retry_with_backoff(
        attempts,
        BackoffStrategy::Linear(state.config.pin_retry_delay),
        PinError::is_retryable,
        |attempt| {
            let data = data.clone();
            let filename = filename.clone();
            let content_type = content_type.clone();
            let pinning = state.pinning.clone();
            async move {
                if attempt > 1 {
                    tracing::warn!(attempt, file = %filename, "retrying pin upload");
                }
                pinning.pin_file(&filename, &content_type, data).await
            }
        },
    )
    .await
    .map_err(|e| match e {
        PinError::MissingCredentials => {
            AppError::Configuration("pinning service credentials not set".to_string())
        }
        err => {
            tracing::error!(file = %filename, "pin upload failed: {}", err);
            AppError::UpstreamUnavailable("Failed to upload file to IPFS".to_string())
        }
    })?;

    tracing::info!(cid = %pinned.cid, file = %filename, "file pinned");

    Ok(Json(PinResponse {
        success: true,
        message: "File uploaded to IPFS successfully".to_string(),
        data: pinned.into(),
    }))
}
