use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{self, require_permission, PermissionLevel, FILES_RESOURCE};
use super::handlers;
use super::metrics::{track_requests, RequestMetrics};
use crate::AppState;

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = usize::try_from(state.config.uploads.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    // Downloads are public. The first segment is the category here and the
    // file id on DELETE; both routes share the parameter name.
    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/files/:id/*key", get(handlers::download_file));

    let protected = Router::new()
        .route(
            "/files",
            post(handlers::upload_file)
                .layer(DefaultBodyLimit::max(upload_limit))
                .route_layer(from_fn(require_permission(
                    FILES_RESOURCE,
                    PermissionLevel::Edit,
                ))),
        )
        .route(
            "/files/:id",
            delete(handlers::delete_file).route_layer(from_fn(require_permission(
                FILES_RESOURCE,
                PermissionLevel::Delete,
            ))),
        )
        .route_layer(from_fn_with_state(state.clone(), auth::authenticate));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    public
        .merge(protected)
        .route_layer(from_fn_with_state(RequestMetrics::new(), track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
