//! In-memory stores that record every call, with switchable failures.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;

use files_api::config::{BucketConfig, UploadConfig};
use files_api::context::RequestContext;
use files_api::files::{AuditError, AuditSink, FileService, UploadRequest};
use files_api::object_store::{ObjectInfo, ObjectStore, ObjectStoreError, StoredObject};
use files_api::storage::{
    DownloadEvent, FileRecord, MetadataStore, MetadataStoreError, NewFileRecord,
};

pub const MAX_FILE_SIZE: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Put { bucket: String, key: String },
    Get { bucket: String, key: String },
    Stat { bucket: String, key: String },
    DeleteObject { bucket: String, key: String },
    Create { bucket: String, key: String },
    GetById(u64),
    GetByKey { bucket: String, key: String },
    DeleteRecord(u64),
}

impl Call {
    pub fn is_object_call(&self) -> bool {
        matches!(
            self,
            Call::Put { .. } | Call::Get { .. } | Call::Stat { .. } | Call::DeleteObject { .. }
        )
    }
}

/// Calls across both stores, in the order they happened.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn object_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_object_call).collect()
    }
}

fn injected() -> String {
    "injected failure".to_string()
}

// ============================================================================
// Object store
// ============================================================================

#[derive(Default)]
pub struct MockObjectStore {
    log: CallLog,
    objects: Mutex<HashMap<(String, String), (Bytes, String)>>,
    pub fail_put: AtomicBool,
    pub fail_get: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MockObjectStore {
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Place an object directly, bypassing the call log.
    pub fn seed(&self, bucket: &str, key: &str, data: &[u8], content_type: &str) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (Bytes::copy_from_slice(data), content_type.to_string()),
        );
    }

    /// Drop an object directly, bypassing the call log.
    pub fn remove(&self, bucket: &str, key: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.log.push(Call::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend(injected()));
        }
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (data, content_type.to_string()),
        );
        Ok(())
    }

    async fn get(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        self.log.push(Call::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend(injected()));
        }
        let (data, content_type) = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ObjectStoreError::not_found(bucket, key))?;
        Ok(StoredObject {
            info: ObjectInfo {
                size: data.len() as u64,
                content_type,
            },
            body: futures::stream::once(async move { Ok(data) }).boxed(),
        })
    }

    async fn stat(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectInfo, ObjectStoreError> {
        self.log.push(Call::Stat {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(data, content_type)| ObjectInfo {
                size: data.len() as u64,
                content_type: content_type.clone(),
            })
            .ok_or_else(|| ObjectStoreError::not_found(bucket, key))
    }

    async fn delete(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<(), ObjectStoreError> {
        self.log.push(Call::DeleteObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend(injected()));
        }
        self.remove(bucket, key);
        Ok(())
    }
}

// ============================================================================
// Metadata store
// ============================================================================

#[derive(Default)]
pub struct MockMetadataStore {
    log: CallLog,
    records: Mutex<BTreeMap<u64, FileRecord>>,
    next_id: AtomicU64,
    pub fail_create: AtomicBool,
    pub fail_get_by_id: AtomicBool,
    pub fail_get_by_key: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MockMetadataStore {
    pub fn records(&self) -> Vec<FileRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    /// Insert a record directly, bypassing the call log.
    pub fn seed(&self, new: NewFileRecord) -> FileRecord {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = new.into_record(id, Utc::now());
        self.records.lock().unwrap().insert(id, record.clone());
        record
    }
}

#[async_trait]
impl MetadataStore for MockMetadataStore {
    async fn create(
        &self,
        _ctx: &RequestContext,
        new: NewFileRecord,
    ) -> Result<FileRecord, MetadataStoreError> {
        self.log.push(Call::Create {
            bucket: new.bucket.clone(),
            key: new.key.clone(),
        });
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(MetadataStoreError::Backend(injected()));
        }
        Ok(self.seed(new))
    }

    async fn get_by_id(
        &self,
        _ctx: &RequestContext,
        id: u64,
    ) -> Result<Option<FileRecord>, MetadataStoreError> {
        self.log.push(Call::GetById(id));
        if self.fail_get_by_id.load(Ordering::SeqCst) {
            return Err(MetadataStoreError::Backend(injected()));
        }
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_key(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<Option<FileRecord>, MetadataStoreError> {
        self.log.push(Call::GetByKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        if self.fail_get_by_key.load(Ordering::SeqCst) {
            return Err(MetadataStoreError::Backend(injected()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.bucket == bucket && r.key == key)
            .cloned())
    }

    async fn delete(&self, _ctx: &RequestContext, id: u64) -> Result<bool, MetadataStoreError> {
        self.log.push(Call::DeleteRecord(id));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(MetadataStoreError::Backend(injected()));
        }
        Ok(self.records.lock().unwrap().remove(&id).is_some())
    }
}

// ============================================================================
// Audit sink
// ============================================================================

#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<DownloadEvent>>,
    pub fail: AtomicBool,
}

impl RecordingAuditSink {
    pub fn events(&self) -> Vec<DownloadEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record_download(&self, event: DownloadEvent) -> Result<(), AuditError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuditError::Backend(injected()));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub service: FileService,
    pub objects: Arc<MockObjectStore>,
    pub metadata: Arc<MockMetadataStore>,
    pub audit: Arc<RecordingAuditSink>,
    pub log: CallLog,
    pub ctx: RequestContext,
}

pub fn harness() -> Harness {
    let log = CallLog::default();
    let objects = Arc::new(MockObjectStore {
        log: log.clone(),
        ..Default::default()
    });
    let metadata = Arc::new(MockMetadataStore {
        log: log.clone(),
        ..Default::default()
    });
    let audit = Arc::new(RecordingAuditSink::default());

    let uploads = UploadConfig {
        max_file_size: MAX_FILE_SIZE,
        allowed_mime_types: vec![
            "image/".to_string(),
            "application/pdf".to_string(),
            "application/msword".to_string(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
        ],
        public_url_prefix: "https://cdn.example.com".to_string(),
    };

    let service = FileService::new(
        BucketConfig::default(),
        uploads,
        objects.clone(),
        metadata.clone(),
        audit.clone(),
    );

    Harness {
        service,
        objects,
        metadata,
        audit,
        log,
        ctx: RequestContext::new("test-request"),
    }
}

pub fn upload(file_name: &str, content_type: &str, category: &str, data: &[u8]) -> UploadRequest {
    UploadRequest {
        data: Some(Bytes::copy_from_slice(data)),
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
        category: category.to_string(),
    }
}

pub fn image_upload() -> UploadRequest {
    upload("photo.png", "image/png", "portfolio-image", b"0123456789")
}

/// Let spawned audit tasks run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}
