//! Maps logical file categories onto physical buckets and acceptable content types.
//!
//! Upload, download and delete all resolve buckets through the same
//! [`BucketClassifier`], so a category can never map to one bucket at write time
//! and another at read or delete time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BucketConfig;

const IMAGE_MIME_PREFIXES: &[&str] = &["image/"];

const DOCUMENT_MIME_PREFIXES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("invalid fileType: must be portfolio-image, miniature-image, or document")]
    UnknownCategory(String),
    #[error("{category} does not accept content type {mime_type}")]
    MimeMismatch {
        category: FileCategory,
        mime_type: String,
    },
}

/// Closed set of logical file categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileCategory {
    Document,
    MiniatureImage,
    PortfolioImage,
}

impl FileCategory {
    pub const ALL: [FileCategory; 3] = [
        FileCategory::Document,
        FileCategory::MiniatureImage,
        FileCategory::PortfolioImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Document => "document",
            FileCategory::MiniatureImage => "miniature-image",
            FileCategory::PortfolioImage => "portfolio-image",
        }
    }

    /// Content-type prefixes this category accepts. Any single match is enough.
    pub fn accepted_mime_prefixes(&self) -> &'static [&'static str] {
        match self {
            FileCategory::Document => DOCUMENT_MIME_PREFIXES,
            FileCategory::MiniatureImage | FileCategory::PortfolioImage => IMAGE_MIME_PREFIXES,
        }
    }

    pub fn accepts_mime(&self, mime_type: &str) -> bool {
        self.accepted_mime_prefixes()
            .iter()
            .any(|prefix| mime_type.starts_with(prefix))
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CategoryError::UnknownCategory(s.to_string()))
    }
}

/// Result of classifying a category name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: FileCategory,
    pub bucket: String,
    pub accepted_mime_prefixes: &'static [&'static str],
}

/// Pure, total mapping from category to bucket.
#[derive(Debug, Clone)]
pub struct BucketClassifier {
    buckets: BucketConfig,
}

impl BucketClassifier {
    pub fn new(buckets: BucketConfig) -> Self {
        Self { buckets }
    }

    pub fn bucket_for(&self, category: FileCategory) -> &str {
        match category {
            FileCategory::Document => &self.buckets.documents,
            FileCategory::MiniatureImage => &self.buckets.miniatures,
            FileCategory::PortfolioImage => &self.buckets.images,
        }
    }

    pub fn classify(&self, category: &str) -> Result<Classification, CategoryError> {
        let category: FileCategory = category.parse()?;
        Ok(Classification {
            category,
            bucket: self.bucket_for(category).to_string(),
            accepted_mime_prefixes: category.accepted_mime_prefixes(),
        })
    }

    pub fn validate_mime(&self, category: &str, mime_type: &str) -> Result<(), CategoryError> {
        let category: FileCategory = category.parse()?;
        if category.accepts_mime(mime_type) {
            Ok(())
        } else {
            Err(CategoryError::MimeMismatch {
                category,
                mime_type: mime_type.to_string(),
            })
        }
    }
}
