use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub buckets: BucketConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Deadline attached to every request context. `None` leaves store calls unbounded.
    pub request_timeout: Option<Duration>,
    pub audit_sink: AuditBackend,
    pub metrics_exporter: MetricsExporter,
}

/// Where request metrics are exported. `None` leaves the instruments as no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsExporter {
    None,
    Stdout,
}

/// Where download audit events go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditBackend {
    /// Persisted in the download log table
    Database,
    /// Structured log lines only
    Log,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL of the token validation service
    pub service_url: String,
}

/// Physical bucket names for each file category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketConfig {
    pub documents: String,
    pub images: String,
    pub miniatures: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Content-type prefixes accepted regardless of category
    pub allowed_mime_types: Vec<String>,
    /// Maximum upload size in bytes
    pub max_file_size: u64,
    /// Prepended to the download URL returned from uploads
    pub public_url_prefix: String,
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// Path to GCS service account JSON (optional, defaults to ADC)
    pub gcs_credentials_file: Option<String>,
}

pub const DEFAULT_ALLOWED_MIME_TYPES: &str =
    "image/jpeg,image/jpg,image/png,image/gif,image/webp,application/pdf";

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            documents: "documents".to_string(),
            images: "images".to_string(),
            miniatures: "miniatures".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: parse_list(DEFAULT_ALLOWED_MIME_TYPES),
            max_file_size: 10 * 1024 * 1024, // 10MB
            public_url_prefix: String::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./files".to_string(),
            gcs_credentials_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8085".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let request_timeout = match std::env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("Invalid REQUEST_TIMEOUT_SECS value: {raw}"))
            })?)),
            Err(_) => None,
        };

        let audit_sink = match std::env::var("AUDIT_SINK") {
            Ok(raw) => parse_audit_backend(&raw)?,
            Err(_) => AuditBackend::Database,
        };

        let metrics_exporter = match std::env::var("METRICS_EXPORTER") {
            Ok(raw) => parse_metrics_exporter(&raw)?,
            Err(_) => MetricsExporter::None,
        };

        let max_file_size = match std::env::var("MAX_FILE_SIZE") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("Invalid MAX_FILE_SIZE value: {raw}"))
            })?,
            Err(_) => UploadConfig::default().max_file_size,
        };

        let allowed_mime_types = parse_list(
            &std::env::var("ALLOWED_FILE_TYPES")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_MIME_TYPES.to_string()),
        );

        let public_url_prefix = std::env::var("PUBLIC_URL_PREFIX")
            .map(|p| p.trim_end_matches('/').to_string())
            .unwrap_or_default();

        let defaults = BucketConfig::default();
        let buckets = BucketConfig {
            documents: std::env::var("DOCUMENTS_BUCKET").unwrap_or(defaults.documents),
            images: std::env::var("IMAGES_BUCKET").unwrap_or(defaults.images),
            miniatures: std::env::var("MINIATURES_BUCKET").unwrap_or(defaults.miniatures),
        };

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "gcs" => StorageBackend::Gcs,
            _ => StorageBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./files".to_string());

        let gcs_credentials_file = std::env::var("GCS_CREDENTIALS_FILE").ok();

        let auth_service_url = std::env::var("AUTH_SERVICE_URL").unwrap_or_default();

        let config = Config {
            auth: AuthConfig {
                service_url: auth_service_url.trim_end_matches('/').to_string(),
            },
            buckets,
            server: ServerConfig {
                bind_address,
                data_dir,
                request_timeout,
                audit_sink,
                metrics_exporter,
            },
            storage: StorageConfig {
                backend: storage_backend,
                local_storage_path,
                gcs_credentials_file,
            },
            uploads: UploadConfig {
                allowed_mime_types,
                max_file_size,
                public_url_prefix,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uploads.max_file_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_FILE_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.uploads.allowed_mime_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "ALLOWED_FILE_TYPES must list at least one content type".to_string(),
            ));
        }

        for (name, bucket) in [
            ("DOCUMENTS_BUCKET", &self.buckets.documents),
            ("IMAGES_BUCKET", &self.buckets.images),
            ("MINIATURES_BUCKET", &self.buckets.miniatures),
        ] {
            if bucket.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} cannot be empty"
                )));
            }
        }

        if self.auth.service_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "AUTH_SERVICE_URL is required".to_string(),
            ));
        }

        if self.server.request_timeout == Some(Duration::ZERO) {
            tracing::warn!("REQUEST_TIMEOUT_SECS is 0; every store call will time out immediately");
        }

        Ok(())
    }
}

fn parse_audit_backend(raw: &str) -> Result<AuditBackend, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "db" | "database" => Ok(AuditBackend::Database),
        "log" => Ok(AuditBackend::Log),
        _ => Err(ConfigError::ValidationError(format!(
            "Invalid AUDIT_SINK value: {raw} (expected db or log)"
        ))),
    }
}

fn parse_metrics_exporter(raw: &str) -> Result<MetricsExporter, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "" | "none" => Ok(MetricsExporter::None),
        "stdout" => Ok(MetricsExporter::Stdout),
        _ => Err(ConfigError::ValidationError(format!(
            "Invalid METRICS_EXPORTER value: {raw} (expected none or stdout)"
        ))),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
