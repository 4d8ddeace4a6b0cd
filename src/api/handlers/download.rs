use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ApiError, AppQuery};
use crate::context::RequestContext;
use crate::encoding::attachment_disposition;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    /// Where the download was triggered from (e.g. "admin-web"); audit only.
    #[serde(default)]
    pub source: Option<String>,
}

/// Stream file content by category and key.
/// Route: GET /files/:category/*key
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path((category, key)): Path<(String, String)>,
    AppQuery(params): AppQuery<DownloadParams>,
) -> Result<Response, ApiError> {
    let source = params.source.filter(|s| !s.is_empty());
    let download = state.files.download(&ctx, &category, &key, source).await?;

    let content_type = HeaderValue::from_str(&download.info.content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&attachment_disposition(
        &download.record.display_name,
    ))
    .map_err(|e| ApiError::internal(format!("Failed to build Content-Disposition: {e}")))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, download.info.size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Body::from_stream(download.body))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {e}")))
}
