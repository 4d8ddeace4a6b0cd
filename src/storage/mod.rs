pub mod db;
mod files;
pub mod models;
mod tables;

pub use db::{Database, DatabaseError};
pub use models::{DownloadEvent, FileRecord, NewFileRecord};
pub use tables::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{DeadlineExceeded, RequestContext};

#[derive(Debug, Error)]
pub enum MetadataStoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("Deadline exceeded")]
    DeadlineExceeded,
    #[error("Metadata backend error: {0}")]
    Backend(String),
}

impl From<DeadlineExceeded> for MetadataStoreError {
    fn from(_: DeadlineExceeded) -> Self {
        MetadataStoreError::DeadlineExceeded
    }
}

/// Persistence for file records. Absence is `Ok(None)`, never an error.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn create(
        &self,
        ctx: &RequestContext,
        new: NewFileRecord,
    ) -> Result<FileRecord, MetadataStoreError>;

    async fn get_by_id(
        &self,
        ctx: &RequestContext,
        id: u64,
    ) -> Result<Option<FileRecord>, MetadataStoreError>;

    async fn get_by_key(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<Option<FileRecord>, MetadataStoreError>;

    /// Returns whether a record was removed; a missing record is not an error.
    async fn delete(&self, ctx: &RequestContext, id: u64) -> Result<bool, MetadataStoreError>;
}

/// Run a redb call on the blocking pool, bounded by the request deadline.
/// Nothing is started once the deadline has passed.
async fn blocking<T, F>(ctx: &RequestContext, f: F) -> Result<T, MetadataStoreError>
where
    F: FnOnce() -> Result<T, DatabaseError> + Send + 'static,
    T: Send + 'static,
{
    let result = ctx
        .run(async move { tokio::task::spawn_blocking(f).await })
        .await?
        .map_err(|e| MetadataStoreError::Backend(format!("metadata task failed: {e}")))?;
    Ok(result?)
}

#[async_trait]
impl MetadataStore for Database {
    async fn create(
        &self,
        ctx: &RequestContext,
        new: NewFileRecord,
    ) -> Result<FileRecord, MetadataStoreError> {
        let db = self.clone();
        blocking(ctx, move || db.create_file(new)).await
    }

    async fn get_by_id(
        &self,
        ctx: &RequestContext,
        id: u64,
    ) -> Result<Option<FileRecord>, MetadataStoreError> {
        let db = self.clone();
        blocking(ctx, move || db.get_file(id)).await
    }

    async fn get_by_key(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<Option<FileRecord>, MetadataStoreError> {
        let db = self.clone();
        let (bucket, key) = (bucket.to_string(), key.to_string());
        blocking(ctx, move || db.get_file_by_key(&bucket, &key)).await
    }

    async fn delete(&self, ctx: &RequestContext, id: u64) -> Result<bool, MetadataStoreError> {
        let db = self.clone();
        blocking(ctx, move || db.delete_file(id)).await
    }
}
