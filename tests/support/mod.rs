#![allow(dead_code)]

use std::num::{NonZeroU32, NonZeroU64};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use batchgate::application::backend::{BackendError, TransformEngine};
use batchgate::application::batch::BatchService;
use batchgate::config::UploadSettings;
use batchgate::domain::uploads::{TransformResult, UploadItem};
use batchgate::infra::http::{GatewayState, build_router};
use bytes::Bytes;

pub const BOUNDARY: &str = "batchgate-test-boundary";

/// Prefixes the payload with `out:` and renames `x.jpg` to `x.png`; fails names containing `fail`.
#[derive(Default)]
pub struct StubEngine {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TransformEngine for StubEngine {
    async fn transform(
        &self,
        item: &UploadItem,
        _options: &str,
    ) -> Result<TransformResult, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if item.filename().contains("fail") {
            return Err(BackendError::Status {
                status: 500,
                excerpt: "engine exploded".into(),
            });
        }
        let mut payload = b"out:".to_vec();
        payload.extend_from_slice(item.bytes());
        let stem = item
            .filename()
            .rsplit_once('.')
            .map_or(item.filename(), |(stem, _)| stem);
        Ok(TransformResult::from_engine(
            Bytes::from(payload),
            Some("image/png".into()),
            Some(format!("{stem}.png")),
            item,
        ))
    }
}

pub fn limits(max_file_bytes: u64, max_files: u32) -> UploadSettings {
    UploadSettings {
        max_file_bytes: NonZeroU64::new(max_file_bytes).expect("non-zero"),
        max_files: NonZeroU32::new(max_files).expect("non-zero"),
    }
}

pub fn router_with(engine: Arc<StubEngine>, uploads: UploadSettings) -> axum::Router {
    build_router(GatewayState::new(BatchService::new(engine), uploads))
}

pub enum FormPart<'a> {
    File {
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn file<'a>(filename: &'a str, bytes: &'a [u8]) -> FormPart<'a> {
    FormPart::File {
        filename,
        content_type: "image/jpeg",
        bytes,
    }
}

pub fn options(value: &str) -> FormPart<'_> {
    FormPart::Text {
        name: "options",
        value,
    }
}

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            FormPart::File {
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            FormPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}
