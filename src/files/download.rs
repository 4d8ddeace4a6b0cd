use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::{FileError, FileService};
use crate::context::RequestContext;
use crate::object_store::{ByteStream, ObjectInfo};
use crate::storage::{DownloadEvent, FileRecord};

/// A resolved download. `info` comes from the object store, not the record,
/// so the reported size and type always describe the bytes in `body`.
pub struct Download {
    pub record: FileRecord,
    pub info: ObjectInfo,
    pub body: ByteStream,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("record", &self.record)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl FileService {
    /// Resolve `category`/`key` to a record and open its object.
    ///
    /// At most one leading `/` is stripped from `key`; nothing else is normalised.
    /// An object missing behind an existing record is [`FileError::ObjectNotFound`].
    pub async fn download(
        &self,
        ctx: &RequestContext,
        category: &str,
        key: &str,
        source: Option<String>,
    ) -> Result<Download, FileError> {
        let key = key.strip_prefix('/').unwrap_or(key);

        let classification = self
            .classifier
            .classify(category)
            .map_err(|_| FileError::InvalidCategory(category.to_string()))?;
        let bucket = classification.bucket;

        let record = self
            .metadata
            .get_by_key(ctx, &bucket, key)
            .await
            .map_err(FileError::MetadataUnavailable)?
            .ok_or(FileError::RecordNotFound)?;

        let object = self
            .objects
            .get(ctx, &bucket, key)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    warn!(
                        request_id = %ctx.request_id(),
                        file_id = record.id,
                        bucket = %bucket,
                        key = %key,
                        "File record exists but its object is missing"
                    );
                    FileError::ObjectNotFound
                } else {
                    FileError::StorageReadFailed(e)
                }
            })?;

        self.emit_download_event(
            ctx,
            DownloadEvent {
                file_id: record.id,
                category: classification.category.as_str().to_string(),
                file_name: record.display_name.clone(),
                size: object.info.size,
                mime_type: object.info.content_type.clone(),
                source,
                occurred_at: Utc::now(),
            },
        );

        debug!(
            request_id = %ctx.request_id(),
            file_id = record.id,
            size = object.info.size,
            "Serving file"
        );

        Ok(Download {
            record,
            info: object.info,
            body: object.body,
        })
    }

    /// Fire-and-forget; the response never waits on or fails because of the sink.
    fn emit_download_event(&self, ctx: &RequestContext, event: DownloadEvent) {
        let sink = Arc::clone(&self.audit);
        let request_id = ctx.request_id().to_string();
        tokio::spawn(async move {
            let file_id = event.file_id;
            if let Err(e) = sink.record_download(event).await {
                warn!(request_id = %request_id, file_id, error = %e, "Failed to record download event");
            }
        });
    }
}
