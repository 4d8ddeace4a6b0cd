use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::files::{ErrorKind, FileError};

// ============================================================================
// JSend status enum
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JSendStatus {
    Error,
    Fail,
    Success,
}

// ============================================================================
// JSend success envelope
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JSend<T: Serialize> {
    pub data: T,
    pub status: JSendStatus,
}

impl<T: Serialize> JSend<T> {
    pub fn success(data: T) -> Json<JSend<T>> {
        Json(JSend {
            data,
            status: JSendStatus::Success,
        })
    }
}

// ============================================================================
// JSend fail envelope (client errors, 4xx)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JSendFail {
    pub data: FailData,
    pub status: JSendStatus,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FailData {
    pub message: String,
    /// Resource a permission check failed on (403 only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Level the permission check required (403 only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
}

impl JSendFail {
    pub fn response(status_code: StatusCode, data: FailData) -> (StatusCode, Json<JSendFail>) {
        (
            status_code,
            Json(JSendFail {
                data,
                status: JSendStatus::Fail,
            }),
        )
    }
}

// ============================================================================
// JSend error envelope (server errors, 5xx)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JSendError {
    pub message: String,
    pub status: JSendStatus,
}

impl JSendError {
    pub fn response(
        status_code: StatusCode,
        message: impl Into<String>,
    ) -> (StatusCode, Json<JSendError>) {
        (
            status_code,
            Json(JSendError {
                message: message.into(),
                status: JSendStatus::Error,
            }),
        )
    }
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// A JSend-compatible error that can be either a fail (4xx) or error (5xx).
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, FailData),
    Error(StatusCode, String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Fail(code, data) => {
                let (status, json) = JSendFail::response(code, data);
                (status, json).into_response()
            }
            ApiError::Error(code, msg) => {
                let (status, json) = JSendError::response(code, msg);
                (status, json).into_response()
            }
        }
    }
}

impl ApiError {
    fn fail(code: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Fail(
            code,
            FailData {
                message: message.into(),
                ..Default::default()
            },
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::fail(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::fail(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(resource: &str, required: &str) -> Self {
        ApiError::Fail(
            StatusCode::FORBIDDEN,
            FailData {
                message: "insufficient permissions".to_string(),
                resource: Some(resource.to_string()),
                required: Some(required.to_string()),
            },
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::fail(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }
}

impl From<FileError> for ApiError {
    fn from(e: FileError) -> Self {
        match e.kind() {
            ErrorKind::Validation => ApiError::bad_request(e.to_string()),
            ErrorKind::NotFound => ApiError::not_found(e.to_string()),
            ErrorKind::Store => {
                match std::error::Error::source(&e) {
                    Some(source) => tracing::error!(error = %e, cause = %source, "Store operation failed"),
                    None => tracing::error!(error = %e, "Store operation failed"),
                }
                ApiError::internal(e.to_string())
            }
        }
    }
}

// ============================================================================
// Custom extractors (reject with JSend-formatted ApiError)
// ============================================================================

/// Drop-in replacement for `axum::extract::Query` that rejects with JSend errors.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(format!("Invalid query parameter: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_file_error_status_mapping() {
        let cases = [
            (FileError::MissingFile, StatusCode::BAD_REQUEST),
            (FileError::FileTooLarge { max: 10 }, StatusCode::BAD_REQUEST),
            (FileError::InvalidId("x".into()), StatusCode::BAD_REQUEST),
            (FileError::RecordNotFound, StatusCode::NOT_FOUND),
            (FileError::ObjectNotFound, StatusCode::NOT_FOUND),
            (
                FileError::InvalidStoredCategory("legacy".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_forbidden_body_fields() {
        let body = serde_json::to_value(FailData {
            message: "insufficient permissions".into(),
            resource: Some("files".into()),
            required: Some("delete".into()),
        })
        .unwrap();
        assert_eq!(body["resource"], "files");
        assert_eq!(body["required"], "delete");

        let plain = serde_json::to_value(FailData {
            message: "nope".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(plain.get("resource").is_none());
    }
}
