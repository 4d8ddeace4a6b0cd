use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

use super::{ObjectInfo, ObjectStore, ObjectStoreError, StoredObject};
use crate::context::RequestContext;

/// Sidecar written next to every payload; the filesystem has nowhere else to keep a content type.
#[derive(Debug, Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
}

/// Local filesystem object store for development and testing.
///
/// Payloads live at `<base>/objects/<bucket>/<key>`, content types at
/// `<base>/meta/<bucket>/<key>.json`.
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(base_path.join("objects"))?;
        std::fs::create_dir_all(base_path.join("meta"))?;
        Ok(Self { base_path })
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_segment(bucket)?;
        validate_key(key)?;
        Ok(self.base_path.join("objects").join(bucket).join(key))
    }

    fn meta_path(&self, bucket: &str, key: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_segment(bucket)?;
        validate_key(key)?;
        Ok(self
            .base_path
            .join("meta")
            .join(bucket)
            .join(format!("{key}.json")))
    }

    async fn read_info(&self, bucket: &str, key: &str) -> Result<ObjectInfo, ObjectStoreError> {
        let path = self.object_path(bucket, key)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(ObjectStoreError::not_found(bucket, key)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ObjectStoreError::not_found(bucket, key))
            }
            Err(e) => return Err(e.into()),
        };

        let content_type = match tokio::fs::read(self.meta_path(bucket, key)?).await {
            Ok(raw) => serde_json::from_slice::<ObjectMeta>(&raw)
                .map(|m| m.content_type)
                .map_err(|e| ObjectStoreError::Backend(format!("corrupt object metadata: {e}")))?,
            Err(e) if e.kind() == ErrorKind::NotFound => "application/octet-stream".to_string(),
            Err(e) => return Err(e.into()),
        };

        Ok(ObjectInfo {
            size: metadata.len(),
            content_type,
        })
    }
}

/// Buckets are a single path segment.
fn validate_segment(segment: &str) -> Result<(), ObjectStoreError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(ObjectStoreError::InvalidKey(segment.to_string()));
    }
    Ok(())
}

/// Keys may span several segments but must stay beneath their bucket directory.
fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    if key.is_empty() || key.starts_with('/') || key.contains('\\') {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    for segment in key.split('/') {
        validate_segment(segment).map_err(|_| ObjectStoreError::InvalidKey(key.to_string()))?;
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(bucket, key)?;
        let meta_path = self.meta_path(bucket, key)?;
        let meta = serde_json::to_vec(&ObjectMeta {
            content_type: content_type.to_string(),
        })
        .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        ctx.run(async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if let Some(parent) = meta_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&meta_path, &meta).await?;
            tokio::fs::write(&path, &data).await?;
            Ok::<_, std::io::Error>(())
        })
        .await??;
        Ok(())
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        let path = self.object_path(bucket, key)?;
        let info = ctx.run(self.read_info(bucket, key)).await??;

        let file = match ctx.run(tokio::fs::File::open(&path)).await? {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ObjectStoreError::not_found(bucket, key))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(StoredObject {
            info,
            body: ReaderStream::new(file).boxed(),
        })
    }

    async fn stat(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectInfo, ObjectStoreError> {
        ctx.run(self.read_info(bucket, key)).await?
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(bucket, key)?;
        let meta_path = self.meta_path(bucket, key)?;

        ctx.run(async {
            for p in [&path, &meta_path] {
                match tokio::fs::remove_file(p).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        })
        .await??;
        Ok(())
    }
}
