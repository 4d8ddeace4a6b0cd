use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::context::RequestContext;
use crate::files::{FileError, UploadRequest, UploadedFile};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: u64,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub url: String,
    pub file_type: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<JSend<UploadResponse>>, ApiError> {
    // A body that is not multipart at all carries no file.
    let mut multipart =
        multipart.map_err(|_| ApiError::bad_request(FileError::MissingFile.to_string()))?;

    let mut req = UploadRequest::default();
    let mut part_content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, e, "Invalid multipart data"))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                req.file_name = field.file_name().unwrap_or("").to_string();
                part_content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(&state, e, "Failed to read file"))?;
                req.data = Some(data);
            }
            "fileType" => {
                req.category = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid fileType: {e}")))?
                    .trim()
                    .to_string();
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    // Content type: from the multipart part, or guessed from the filename
    req.content_type = part_content_type
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .or_else(|| {
            mime_guess::from_path(&req.file_name)
                .first()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let uploaded = state.files.upload(&ctx, req).await?;

    tracing::info!(
        file_id = uploaded.record.id,
        file_type = %uploaded.category,
        size = uploaded.record.size,
        "Created file"
    );

    Ok(JSend::success(upload_to_response(uploaded)))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<JSend<MessageResponse>>, ApiError> {
    let record = state.files.delete(&ctx, &id).await?;

    tracing::info!(file_id = record.id, key = %record.key, "Deleted file");

    Ok(JSend::success(MessageResponse {
        message: "file deleted successfully".to_string(),
    }))
}

// ============================================================================
// Helpers
// ============================================================================

/// A body cut off by the request size limit is reported as an oversized file.
fn multipart_error(state: &AppState, err: MultipartError, context: &str) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return FileError::FileTooLarge {
            max: state.config.uploads.max_file_size,
        }
        .into();
    }
    ApiError::bad_request(format!("{context}: {err}"))
}

fn upload_to_response(uploaded: UploadedFile) -> UploadResponse {
    UploadResponse {
        id: uploaded.record.id,
        file_name: uploaded.record.display_name,
        file_size: uploaded.record.size,
        mime_type: uploaded.record.mime_type,
        url: uploaded.url,
        file_type: uploaded.category.as_str().to_string(),
    }
}
