//! Request-scoped handle passed into every store call.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// The deadline carried by a [`RequestContext`] passed before the call finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded;

/// Identifies a request and carries its deadline down to the store adapters.
///
/// The orchestrators never inspect the deadline; adapters wrap their I/O in
/// [`RequestContext::run`] so the transport layer decides how long a request may take.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            deadline: None,
        }
    }

    /// A context with a fresh random request id and no deadline.
    pub fn background() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `fut` to completion, giving up once the deadline passes.
    /// `fut` is never polled if the deadline has already passed.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        match self.deadline {
            Some(_) if self.is_expired() => Err(DeadlineExceeded),
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| DeadlineExceeded),
            None => Ok(fut.await),
        }
    }
}
