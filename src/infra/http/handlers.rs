use axum::{
    Json,
    extract::{Multipart, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use batchgate_api_types::{HealthResponse, PreviewResponse};

use crate::application::error::GatewayError;

use super::{GatewayState, HEALTH_MESSAGE, multipart::read_batch};

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok(HEALTH_MESSAGE))
}

pub(super) async fn process(
    State(state): State<GatewayState>,
    mut multipart: Multipart,
) -> Result<Response, GatewayError> {
    let request = read_batch(&mut multipart, &state.uploads).await?;
    let download = state.batches.process(request).await?;

    let disposition = download.content_disposition();
    let mut response = download.body.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&download.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

pub(super) async fn process_preview(
    State(state): State<GatewayState>,
    mut multipart: Multipart,
) -> Result<Json<PreviewResponse>, GatewayError> {
    let request = read_batch(&mut multipart, &state.uploads).await?;
    let files = state.batches.preview(request).await?;
    Ok(Json(PreviewResponse { files }))
}
