use opentelemetry::global;
use opentelemetry_sdk::{metrics::SdkMeterProvider, Resource};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use files_api::{
    api::{self, auth::RemoteAuthenticator, metrics::METER_NAME},
    config::{AuditBackend, Config, MetricsExporter, StorageBackend},
    files::{AuditSink, FileService, TracingAuditSink},
    object_store as obj,
    storage::Database,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "files-api starting");

    let config = Config::load()?;

    let meter_provider = match config.server.metrics_exporter {
        MetricsExporter::Stdout => {
            let provider = SdkMeterProvider::builder()
                .with_periodic_exporter(opentelemetry_stdout::MetricExporter::default())
                .with_resource(Resource::builder().with_service_name(METER_NAME).build())
                .build();
            global::set_meter_provider(provider.clone());
            info!("Exporting request metrics to stdout");
            Some(provider)
        }
        MetricsExporter::None => None,
    };

    // Metadata store and download log share one redb file
    let db = Database::open(&config.server.data_dir)?;
    info!("Database opened at: {}", config.server.data_dir);

    let object_store: Arc<dyn obj::ObjectStore> = match config.storage.backend {
        StorageBackend::Local => {
            let store = obj::LocalStore::new(&config.storage.local_storage_path)?;
            info!(
                "Using local storage backend at: {}",
                config.storage.local_storage_path
            );
            Arc::new(store)
        }
        StorageBackend::Gcs => {
            let store = obj::GcsStore::new(config.storage.gcs_credentials_file.as_deref()).await?;
            info!("Using GCS storage backend");
            Arc::new(store)
        }
    };

    info!(
        documents = %config.buckets.documents,
        images = %config.buckets.images,
        miniatures = %config.buckets.miniatures,
        max_file_size = config.uploads.max_file_size,
        "Bucket layout"
    );

    let authenticator = RemoteAuthenticator::new(&config.auth.service_url)?;

    let audit: Arc<dyn AuditSink> = match config.server.audit_sink {
        AuditBackend::Database => Arc::new(db.clone()),
        AuditBackend::Log => Arc::new(TracingAuditSink),
    };
    info!(sink = ?config.server.audit_sink, "Download audit configured");

    let files = FileService::new(
        config.buckets.clone(),
        config.uploads.clone(),
        object_store,
        Arc::new(db),
        audit,
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        files,
        authenticator: Arc::new(authenticator),
    });

    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on: {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(provider) = meter_provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "Failed to flush metrics");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
