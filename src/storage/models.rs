use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file record stored in redb.
///
/// Records are immutable once created; the only other transition is deletion.
/// `category` is kept in its string form so a record written under a category
/// that has since been retired still decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: u64,
    pub bucket: String,
    pub key: String,
    /// Original client filename. Only ever used for response headers and bodies.
    pub display_name: String,
    pub size: u64,
    pub mime_type: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to create a [`FileRecord`]; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileRecord {
    pub bucket: String,
    pub key: String,
    pub display_name: String,
    pub size: u64,
    pub mime_type: String,
    pub category: String,
}

impl NewFileRecord {
    pub fn into_record(self, id: u64, created_at: DateTime<Utc>) -> FileRecord {
        FileRecord {
            id,
            bucket: self.bucket,
            key: self.key,
            display_name: self.display_name,
            size: self.size,
            mime_type: self.mime_type,
            category: self.category,
            created_at,
        }
    }
}

/// A persisted download audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadEvent {
    pub file_id: u64,
    pub category: String,
    pub file_name: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(default)]
    pub source: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
