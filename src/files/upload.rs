use bytes::Bytes;
use tracing::{debug, error};

use super::{FileError, FileService};
use crate::category::{CategoryError, FileCategory};
use crate::context::RequestContext;
use crate::storage::{FileRecord, NewFileRecord};

/// Longest extension carried over from the client filename into a key
const MAX_EXTENSION_LEN: usize = 16;

/// An upload as received from the client. Every field is a client claim.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub data: Option<Bytes>,
    pub file_name: String,
    pub content_type: String,
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub record: FileRecord,
    pub category: FileCategory,
    /// Download path for the new file: `<prefix>/files/<category>/<key>`
    pub url: String,
}

/// A fresh object key: a random UUID plus the client's extension when it is plain
/// alphanumeric. Nothing else from the filename reaches the key, so it can never
/// contain a separator or a `..` segment.
pub fn generate_key(file_name: &str) -> String {
    let id = uuid::Uuid::new_v4();
    match extension(file_name) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

fn extension(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext)
}

impl FileService {
    /// Validate, write the object, then write its record.
    ///
    /// If the record write fails the object is deleted before returning
    /// [`FileError::MetadataWriteFailed`]; a failure of that delete is logged and
    /// does not change the returned error.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        req: UploadRequest,
    ) -> Result<UploadedFile, FileError> {
        let data = req.data.ok_or(FileError::MissingFile)?;

        if req.category.is_empty() {
            return Err(FileError::MissingCategory);
        }

        let max = self.uploads.max_file_size;
        if data.len() as u64 > max {
            return Err(FileError::FileTooLarge { max });
        }

        if !self.is_allowed_content_type(&req.content_type) {
            return Err(FileError::UnsupportedMimeType(req.content_type));
        }

        let classification = self
            .classifier
            .classify(&req.category)
            .map_err(|_| FileError::InvalidCategory(req.category.clone()))?;
        self.classifier
            .validate_mime(&req.category, &req.content_type)
            .map_err(|e| match e {
                CategoryError::MimeMismatch {
                    category,
                    mime_type,
                } => FileError::CategoryMimeMismatch {
                    category,
                    mime_type,
                },
                CategoryError::UnknownCategory(c) => FileError::InvalidCategory(c),
            })?;

        let bucket = classification.bucket;
        let key = generate_key(&req.file_name);
        let size = data.len() as u64;

        // Phase 1: object bytes
        self.objects
            .put(ctx, &bucket, &key, data, &req.content_type)
            .await
            .map_err(FileError::StorageWriteFailed)?;

        // Phase 2: metadata record
        let new = NewFileRecord {
            bucket: bucket.clone(),
            key: key.clone(),
            display_name: req.file_name,
            size,
            mime_type: req.content_type,
            category: classification.category.as_str().to_string(),
        };

        let record = match self.metadata.create(ctx, new).await {
            Ok(record) => record,
            Err(e) => {
                // The request deadline may be what failed the write; cleanup gets its own.
                let cleanup_ctx = RequestContext::new(ctx.request_id());
                if let Err(cleanup) = self.objects.delete(&cleanup_ctx, &bucket, &key).await {
                    error!(
                        request_id = %ctx.request_id(),
                        bucket = %bucket,
                        key = %key,
                        error = %cleanup,
                        "Failed to remove orphaned object after metadata write failure"
                    );
                }
                return Err(FileError::MetadataWriteFailed(e));
            }
        };

        let url = format!(
            "{}/files/{}/{}",
            self.uploads.public_url_prefix, classification.category, record.key
        );

        debug!(
            request_id = %ctx.request_id(),
            file_id = record.id,
            bucket = %record.bucket,
            key = %record.key,
            "Uploaded file"
        );

        Ok(UploadedFile {
            record,
            category: classification.category,
            url,
        })
    }
}
