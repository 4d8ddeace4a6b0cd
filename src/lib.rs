//! files-api - A file storage facade over an object store and a metadata store
//!
//! This crate provides upload, download and delete of categorized files with:
//! - Swappable object storage backends (local filesystem, GCS)
//! - redb embedded database for file records and the download audit log
//! - A bucket classifier mapping each file category to its bucket and content types
//! - REST API with multipart upload and streaming downloads behind bearer-token auth

pub mod api;
pub mod category;
pub mod config;
pub mod context;
pub mod encoding;
pub mod files;
pub mod object_store;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use api::auth::Authenticator;
use config::Config;
use files::FileService;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub files: FileService,
    pub authenticator: Arc<dyn Authenticator>,
}
