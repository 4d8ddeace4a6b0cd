use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::context::RequestContext;
use crate::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builds the per-request context: caller-supplied request id (or a fresh one)
/// and the configured deadline.
#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ctx = match parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            Some(id) => RequestContext::new(id),
            None => RequestContext::background(),
        };

        Ok(match state.config.server.request_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        })
    }
}
