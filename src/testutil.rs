//! Shared test helpers for files-api router tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::api::auth::{AuthError, Authenticator, PermissionLevel, Scopes, FILES_RESOURCE};
use crate::config::{
    AuditBackend, AuthConfig, MetricsExporter, BucketConfig, Config, ServerConfig, StorageConfig, UploadConfig,
};
use crate::files::FileService;
use crate::object_store::LocalStore;
use crate::storage::Database;
use crate::AppState;

pub const READ_TOKEN: &str = "reader-token";
pub const EDIT_TOKEN: &str = "editor-token";
pub const DELETE_TOKEN: &str = "admin-token";

/// Fixed token table standing in for the auth service.
pub struct StaticAuthenticator {
    tokens: HashMap<String, Scopes>,
}

impl StaticAuthenticator {
    pub fn with_default_tokens() -> Self {
        let tokens = [
            (READ_TOKEN, PermissionLevel::Read),
            (EDIT_TOKEN, PermissionLevel::Edit),
            (DELETE_TOKEN, PermissionLevel::Delete),
        ]
        .into_iter()
        .map(|(token, level)| (token.to_string(), Scopes::new().grant(FILES_RESOURCE, level)))
        .collect();
        Self { tokens }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Option<Scopes>, AuthError> {
        Ok(self.tokens.get(token).cloned())
    }
}

/// Create a test AppState with a temporary database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        auth: AuthConfig {
            service_url: "http://auth.invalid".to_string(),
        },
        buckets: BucketConfig::default(),
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            request_timeout: None,
            audit_sink: AuditBackend::Database,
            metrics_exporter: MetricsExporter::None,
        },
        storage: StorageConfig::default(),
        uploads: UploadConfig {
            max_file_size: 1024,
            ..UploadConfig::default()
        },
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let object_store = LocalStore::new(&files_dir).expect("Failed to create test object store");

    let files = FileService::new(
        config.buckets.clone(),
        config.uploads.clone(),
        Arc::new(object_store),
        Arc::new(db.clone()),
        Arc::new(db),
    );

    Arc::new(AppState {
        config,
        files,
        authenticator: Arc::new(StaticAuthenticator::with_default_tokens()),
    })
}
