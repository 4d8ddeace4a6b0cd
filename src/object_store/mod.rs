mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::context::{DeadlineExceeded, RequestContext};

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("Invalid object location: {0}")]
    InvalidKey(String),
    #[error("Deadline exceeded")]
    DeadlineExceeded,
    #[error("Backend error: {0}")]
    Backend(String),
}

impl ObjectStoreError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        ObjectStoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectStoreError::NotFound { .. })
    }
}

impl From<DeadlineExceeded> for ObjectStoreError {
    fn from(_: DeadlineExceeded) -> Self {
        ObjectStoreError::DeadlineExceeded
    }
}

/// Forward-only stream of object bytes
pub type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// What the store itself reports about an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub size: u64,
    pub content_type: String,
}

/// A fetched object: its stat plus a one-shot body.
pub struct StoredObject {
    pub info: ObjectInfo,
    pub body: ByteStream,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Byte-oriented object storage addressed by (bucket, key).
/// The store knows nothing about file records; keys are meaningless without the metadata DB.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    async fn get(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject, ObjectStoreError>;

    async fn stat(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectInfo, ObjectStoreError>;

    /// Removing a missing object succeeds.
    async fn delete(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<(), ObjectStoreError>;
}
