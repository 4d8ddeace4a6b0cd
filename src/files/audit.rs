//! Download audit trail. Sinks are best-effort: the download path logs and
//! discards their failures.

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::{Database, DatabaseError, DownloadEvent};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("Audit backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_download(&self, event: DownloadEvent) -> Result<(), AuditError>;
}

/// Persists events to the download log table next to the file records.
#[async_trait]
impl AuditSink for Database {
    async fn record_download(&self, event: DownloadEvent) -> Result<(), AuditError> {
        self.append_download_event(&event)?;
        Ok(())
    }
}

/// Emits events as structured log lines only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record_download(&self, event: DownloadEvent) -> Result<(), AuditError> {
        tracing::info!(
            action = "file_download",
            file_id = event.file_id,
            category = %event.category,
            size = event.size,
            mime_type = %event.mime_type,
            source = event.source.as_deref().unwrap_or(""),
            "File downloaded"
        );
        Ok(())
    }
}
