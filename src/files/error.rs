use thiserror::Error;

use crate::category::FileCategory;
use crate::object_store::ObjectStoreError;
use crate::storage::MetadataStoreError;

/// How a [`FileError`] surfaces to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client input malformed or outside policy
    Validation,
    /// Id, key or category does not resolve to a file
    NotFound,
    /// A store call failed
    Store,
}

/// Failures of the upload, download and delete operations.
///
/// Store failures carry the underlying error as their source for logging; their
/// `Display` text is safe to hand to clients and never mentions cleanup.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("file is required")]
    MissingFile,
    #[error("fileType is required (portfolio-image, miniature-image, document)")]
    MissingCategory,
    #[error("file too large (max {max} bytes)")]
    FileTooLarge { max: u64 },
    #[error("invalid file type")]
    UnsupportedMimeType(String),
    #[error("invalid fileType: must be portfolio-image, miniature-image, or document")]
    InvalidCategory(String),
    #[error("{} requires {} content type", .category, category_family(.category))]
    CategoryMimeMismatch {
        category: FileCategory,
        mime_type: String,
    },
    #[error("invalid file ID")]
    InvalidId(String),

    #[error("file not found")]
    RecordNotFound,
    #[error("file not found in storage")]
    ObjectNotFound,

    #[error("failed to upload file")]
    StorageWriteFailed(#[source] ObjectStoreError),
    #[error("failed to create file record")]
    MetadataWriteFailed(#[source] MetadataStoreError),
    #[error("failed to fetch file record")]
    MetadataUnavailable(#[source] MetadataStoreError),
    #[error("failed to read file from storage")]
    StorageReadFailed(#[source] ObjectStoreError),
    #[error("invalid file type in database")]
    InvalidStoredCategory(String),
    #[error("failed to delete file from storage")]
    StorageDeleteFailed(#[source] ObjectStoreError),
    #[error("failed to delete file record")]
    MetadataDeleteFailed(#[source] MetadataStoreError),
}

fn category_family(category: &FileCategory) -> &'static str {
    match category {
        FileCategory::Document => "PDF or Word document",
        FileCategory::MiniatureImage | FileCategory::PortfolioImage => "image",
    }
}

impl FileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileError::MissingFile
            | FileError::MissingCategory
            | FileError::FileTooLarge { .. }
            | FileError::UnsupportedMimeType(_)
            | FileError::InvalidCategory(_)
            | FileError::CategoryMimeMismatch { .. }
            | FileError::InvalidId(_) => ErrorKind::Validation,
            FileError::RecordNotFound | FileError::ObjectNotFound => ErrorKind::NotFound,
            FileError::StorageWriteFailed(_)
            | FileError::MetadataWriteFailed(_)
            | FileError::MetadataUnavailable(_)
            | FileError::StorageReadFailed(_)
            | FileError::InvalidStoredCategory(_)
            | FileError::StorageDeleteFailed(_)
            | FileError::MetadataDeleteFailed(_) => ErrorKind::Store,
        }
    }
}
