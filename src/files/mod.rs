//! Dual-write coordination between the object store and the metadata store.
//!
//! Each operation is stateless and talks to the stores only through their ports:
//! - upload writes the object first, then the record, deleting the object if the
//!   record cannot be written
//! - download resolves the record by (bucket, key) and reports what the object
//!   store actually holds
//! - delete removes the object first, then the record, so a partial failure never
//!   leaves an object without a record pointing at it
//!
//! Nothing here retries. A crash between the object write and the record write
//! leaves an orphaned object; no sweep exists to reclaim it.

mod audit;
mod delete;
mod download;
mod error;
mod upload;

pub use audit::{AuditError, AuditSink, TracingAuditSink};
pub use download::Download;
pub use error::{ErrorKind, FileError};
pub use upload::{generate_key, UploadRequest, UploadedFile};

use std::sync::Arc;

use crate::category::BucketClassifier;
use crate::config::{BucketConfig, UploadConfig};
use crate::object_store::ObjectStore;
use crate::storage::MetadataStore;

/// Upload, download and delete over a pair of stores.
#[derive(Clone)]
pub struct FileService {
    classifier: BucketClassifier,
    uploads: UploadConfig,
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    audit: Arc<dyn AuditSink>,
}

impl FileService {
    pub fn new(
        buckets: BucketConfig,
        uploads: UploadConfig,
        objects: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            classifier: BucketClassifier::new(buckets),
            uploads,
            objects,
            metadata,
            audit,
        }
    }

    fn is_allowed_content_type(&self, content_type: &str) -> bool {
        self.uploads
            .allowed_mime_types
            .iter()
            .any(|allowed| content_type.starts_with(allowed.as_str()))
    }
}
