//! Multipart batch parsing with per-file and per-request bounds.

use axum::{
    extract::{Multipart, multipart::MultipartError},
    http::StatusCode,
};
use bytes::BytesMut;
use tracing::debug;

use crate::{
    application::{batch::BatchRequest, error::GatewayError},
    config::UploadSettings,
    domain::uploads::UploadItem,
};

const FILE_FIELD: &str = "file";
const OPTIONS_FIELD: &str = "options";

/// Collect every `file` part, in order, plus the `options` text. Other fields are ignored.
pub(super) async fn read_batch(
    multipart: &mut Multipart,
    limits: &UploadSettings,
) -> Result<BatchRequest, GatewayError> {
    let max_files = limits.max_files.get() as usize;
    let max_file_bytes = limits.max_file_bytes.get();
    let mut items = Vec::new();
    let mut raw_options = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limits))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {}
            Some(OPTIONS_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| multipart_error(err, limits))?;
                raw_options = Some(text);
                continue;
            }
            other => {
                debug!(field = other.unwrap_or(""), "ignoring multipart field");
                continue;
            }
        }

        if items.len() >= max_files {
            return Err(GatewayError::TooManyFiles { limit: max_files });
        }

        let filename = field.file_name().map(str::to_string).unwrap_or_default();
        let content_type = field.content_type().map(str::to_string);

        let mut buffer = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| multipart_error(err, limits))?
        {
            if (buffer.len() + chunk.len()) as u64 > max_file_bytes {
                return Err(GatewayError::FileTooLarge {
                    filename,
                    limit_bytes: max_file_bytes,
                });
            }
            buffer.extend_from_slice(&chunk);
        }

        items.push(UploadItem::new(filename, content_type, buffer.freeze()));
    }

    Ok(BatchRequest::new(items, raw_options))
}

fn multipart_error(err: MultipartError, limits: &UploadSettings) -> GatewayError {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => GatewayError::RequestTooLarge {
            limit_bytes: limits.body_limit_bytes() as u64,
        },
        _ => GatewayError::multipart(err.body_text()),
    }
}
