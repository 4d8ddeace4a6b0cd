use tracing::{debug, warn};

use super::{FileError, FileService};
use crate::category::FileCategory;
use crate::context::RequestContext;
use crate::storage::FileRecord;

impl FileService {
    /// Delete the object, then the record.
    ///
    /// If the object delete fails the record is left in place, so the object can
    /// still be found and cleaned up later. If the record delete fails the object is
    /// already gone; repeating the call finishes the job because object deletes are
    /// idempotent.
    pub async fn delete(&self, ctx: &RequestContext, raw_id: &str) -> Result<FileRecord, FileError> {
        let id: u64 = raw_id
            .parse()
            .map_err(|_| FileError::InvalidId(raw_id.to_string()))?;

        let record = self
            .metadata
            .get_by_id(ctx, id)
            .await
            .map_err(FileError::MetadataUnavailable)?
            .ok_or(FileError::RecordNotFound)?;

        // Same mapping the upload used; the stored bucket is not trusted on its own.
        let bucket = match record.category.parse::<FileCategory>() {
            Ok(category) => self.classifier.bucket_for(category).to_string(),
            Err(_) => return Err(FileError::InvalidStoredCategory(record.category)),
        };
        if bucket != record.bucket {
            warn!(
                file_id = id,
                stored = %record.bucket,
                resolved = %bucket,
                "Stored bucket differs from category mapping"
            );
        }

        // Phase 1: object
        self.objects
            .delete(ctx, &bucket, &record.key)
            .await
            .map_err(FileError::StorageDeleteFailed)?;

        // Phase 2: record
        let removed = self
            .metadata
            .delete(ctx, id)
            .await
            .map_err(FileError::MetadataDeleteFailed)?;

        debug!(
            request_id = %ctx.request_id(),
            file_id = id,
            removed,
            "Deleted file"
        );
        Ok(record)
    }
}
