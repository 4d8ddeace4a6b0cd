//! Bearer-token authentication and per-resource permission checks.
//!
//! Tokens are validated by an external service; this module only asks it for the
//! caller's scopes and gates routes on them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::response::ApiError;
use crate::AppState;

pub const FILES_RESOURCE: &str = "files";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth service request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Ordered access levels; a higher level grants every lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    None,
    Read,
    Edit,
    Delete,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::Read => "read",
            PermissionLevel::Edit => "edit",
            PermissionLevel::Delete => "delete",
        }
    }

    /// Unknown level names grant nothing.
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "read" => PermissionLevel::Read,
            "edit" => PermissionLevel::Edit,
            "delete" => PermissionLevel::Delete,
            _ => PermissionLevel::None,
        }
    }
}

/// Resource -> granted level, injected into request extensions once authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scopes(HashMap<String, PermissionLevel>);

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, resource: impl Into<String>, level: PermissionLevel) -> Self {
        self.0.insert(resource.into(), level);
        self
    }

    pub fn level_for(&self, resource: &str) -> PermissionLevel {
        self.0
            .get(resource)
            .copied()
            .unwrap_or(PermissionLevel::None)
    }

    pub fn allows(&self, resource: &str, required: PermissionLevel) -> bool {
        self.level_for(resource) >= required
    }
}

impl FromIterator<(String, PermissionLevel)> for Scopes {
    fn from_iter<I: IntoIterator<Item = (String, PermissionLevel)>>(iter: I) -> Self {
        Scopes(iter.into_iter().collect())
    }
}

/// Resolves a bearer token to the caller's scopes. `Ok(None)` means the token was rejected.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Option<Scopes>, AuthError>;
}

#[derive(Deserialize)]
struct ValidateResponse {
    valid: bool,
    #[serde(default)]
    scopes: HashMap<String, String>,
}

/// Validates tokens with `POST <base>/auth/validate`.
pub struct RemoteAuthenticator {
    client: reqwest::Client,
    validate_url: String,
}

impl RemoteAuthenticator {
    pub fn new(service_url: &str) -> Result<Self, AuthError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            validate_url: format!("{}/auth/validate", service_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Authenticator for RemoteAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Option<Scopes>, AuthError> {
        let resp = self
            .client
            .post(&self.validate_url)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        let body: ValidateResponse = resp.json().await?;
        if !body.valid {
            return Ok(None);
        }

        Ok(Some(
            body.scopes
                .into_iter()
                .map(|(resource, level)| {
                    let level = PermissionLevel::parse_lenient(&level);
                    (resource, level)
                })
                .collect(),
        ))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token.to_string()),
        _ => None,
    }
}

/// Reject requests without a valid bearer token; attach [`Scopes`] to the rest.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::unauthorized("authorization header required"))?;

    match state.authenticator.authenticate(&token).await {
        Ok(Some(scopes)) => {
            req.extensions_mut().insert(scopes);
            Ok(next.run(req).await)
        }
        Ok(None) => Err(ApiError::unauthorized("invalid or expired token")),
        Err(e) => {
            tracing::warn!(error = %e, "Token validation failed");
            Err(ApiError::unauthorized("invalid or expired token"))
        }
    }
}

async fn check_permission(
    resource: &'static str,
    required: PermissionLevel,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let allowed = req
        .extensions()
        .get::<Scopes>()
        .ok_or_else(|| ApiError::unauthorized("authentication required"))?
        .allows(resource, required);

    if !allowed {
        return Err(ApiError::forbidden(resource, required.as_str()));
    }

    Ok(next.run(req).await)
}

/// Middleware for `axum::middleware::from_fn` requiring `required` on `resource`.
/// Must run after [`authenticate`]; a request with no scopes is a 401.
pub fn require_permission(
    resource: &'static str,
    required: PermissionLevel,
) -> impl Fn(Request, Next) -> BoxFuture<'static, Result<Response, ApiError>> + Clone + Send + Sync + 'static
{
    move |req, next| Box::pin(check_permission(resource, required, req, next))
}
