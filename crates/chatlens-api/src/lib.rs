//! REST server for chatlens.

pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::config::Config;
use crate::middleware::logging;
use crate::openapi::ApiDoc;
use crate::routes::{analyze, export, health, rooms, settings, upload, validate_key, visualization};
use crate::state::AppState;

/// Room for multipart boundaries and the non-file fields
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.server.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let api_routes = Router::new()
        // Upload
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Rooms
        .route("/rooms", get(rooms::list_rooms))
        .route("/rooms/:room_id", get(rooms::get_room).delete(rooms::delete_room))
        .route("/rooms/:room_id/messages", get(rooms::search_messages))
        .route("/rooms/:room_id/analyses", get(rooms::list_analyses))
        // Analysis
        .route("/analyze", post(analyze::analyze))
        .route(
            "/analyze/:request_id",
            get(analyze::get_analysis).delete(analyze::cancel_analysis),
        )
        // Statistics
        .route("/visualization/:room_id", get(visualization::visualization))
        // Export
        .route("/export", get(export::export_all))
        .route(
            "/export/:room_id",
            get(export::export_room).post(export::export_room),
        )
        .route("/exports/:export_id", get(export::download_export))
        // Settings
        .route("/settings", get(settings::get_settings).post(settings::save_settings))
        .route("/validate-key", post(validate_key::validate_key))
        // Docs
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs.max(1));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .layer(axum_middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if !config.cors.enabled {
        return CorsLayer::new();
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors.origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors
            .origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}
