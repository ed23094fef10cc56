//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tubely_core::{constants::MULTIPART_OVERHEAD_BYTES, Config};
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Build the application router.
///
/// Each upload route carries its own body limit. The router-wide limit is the
/// largest of them so nothing else can send a bigger body.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    let video_body_limit = config
        .max_video_size_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let thumbnail_body_limit = config
        .max_thumbnail_size_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let upload_routes = Router::new()
        .route(
            "/api/video_upload/{video_id}",
            post(handlers::video_upload::upload_video)
                .layer(DefaultBodyLimit::max(video_body_limit)),
        )
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(handlers::thumbnail_upload::upload_thumbnail)
                .layer(DefaultBodyLimit::max(thumbnail_body_limit)),
        );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(upload_routes)
        .route("/health", get(handlers::health::health_check))
        .route(OPENAPI_JSON_PATH, get(|| async { Json(ApiDoc::openapi()) }))
        .merge(utoipa_rapidoc::RapiDoc::new(OPENAPI_JSON_PATH).path("/docs"))
        .layer(RequestBodyLimitLayer::new(
            video_body_limit.max(thumbnail_body_limit),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
