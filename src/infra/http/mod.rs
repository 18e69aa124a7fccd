//! HTTP surface: routes, body limits and the shared logging middleware.

mod handlers;
mod middleware;
mod multipart;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use crate::{application::batch::BatchService, config::UploadSettings};

use self::middleware::{log_responses, set_request_context};

pub const HEALTH_MESSAGE: &str = "batchgate is running";

#[derive(Clone)]
pub struct GatewayState {
    pub batches: BatchService,
    pub uploads: UploadSettings,
}

impl GatewayState {
    pub fn new(batches: BatchService, uploads: UploadSettings) -> Self {
        Self { batches, uploads }
    }
}

pub fn build_router(state: GatewayState) -> Router {
    let body_limit = state.uploads.body_limit_bytes();

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/health", get(handlers::health))
        .route(
            "/api/v1/process",
            post(handlers::process).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/v1/process-preview",
            post(handlers::process_preview).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
