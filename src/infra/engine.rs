//! reqwest-backed client for the remote processing engine.
//!
//! Protocol: `POST {base}/process` with a multipart body holding a `file` part and an `options`
//! text part. The transformed bytes come back as the body, described by `Content-Type` and
//! `X-Output-Filename`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{
    Client, Response, StatusCode,
    header::{CONTENT_TYPE, HeaderMap},
    multipart::{Form, Part},
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    application::backend::{BackendError, TransformEngine},
    config::EngineSettings,
    domain::uploads::{TransformResult, UploadItem},
};

use super::error::InfraError;

pub const METRIC_ENGINE_REQUESTS_TOTAL: &str = "batchgate_engine_requests_total";
pub const METRIC_ENGINE_REQUEST_MS: &str = "batchgate_engine_request_ms";

pub const OUTPUT_FILENAME_HEADER: &str = "x-output-filename";
const PROCESS_PATH: &str = "process";
const EXCERPT_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct HttpTransformEngine {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpTransformEngine {
    pub fn new(settings: &EngineSettings) -> Result<Self, InfraError> {
        let endpoint = process_endpoint(&settings.base_url)?;
        let client = Client::builder()
            .user_agent(concat!("batchgate/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::engine(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint,
            timeout: settings.timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            BackendError::transport(err.to_string())
        }
    }

    async fn send(&self, item: &UploadItem, options: &str) -> Result<TransformResult, BackendError> {
        let part = Part::bytes(item.bytes().to_vec())
            .file_name(item.filename().to_string())
            .mime_str(item.content_type())
            .map_err(|err| {
                BackendError::transport(format!(
                    "invalid media type `{}`: {err}",
                    item.content_type()
                ))
            })?;
        let form = Form::new()
            .part("file", part)
            .text("options", options.to_string());

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let media_type = header_text(response.headers(), CONTENT_TYPE.as_str())?;
        let filename = header_text(response.headers(), OUTPUT_FILENAME_HEADER)?;
        let payload = response.bytes().await.map_err(|err| {
            if err.is_timeout() {
                self.classify(err)
            } else {
                BackendError::malformed(format!("failed to read response body: {err}"))
            }
        })?;

        Ok(TransformResult::from_engine(payload, media_type, filename, item))
    }
}

#[async_trait]
impl TransformEngine for HttpTransformEngine {
    async fn transform(
        &self,
        item: &UploadItem,
        options: &str,
    ) -> Result<TransformResult, BackendError> {
        let started = Instant::now();
        let outcome = self.send(item, options).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        histogram!(METRIC_ENGINE_REQUEST_MS).record(elapsed_ms);
        let label = match &outcome {
            Ok(_) => "ok",
            Err(BackendError::Timeout { .. }) => "timeout",
            Err(BackendError::Status { .. }) => "status",
            Err(BackendError::Transport { .. }) => "transport",
            Err(BackendError::Malformed { .. }) => "malformed",
        };
        counter!(METRIC_ENGINE_REQUESTS_TOTAL, "outcome" => label).increment(1);

        match &outcome {
            Ok(result) => debug!(
                filename = %result.filename,
                media_type = %result.media_type,
                bytes = result.payload.len(),
                elapsed_ms,
                "engine call succeeded"
            ),
            Err(err) => warn!(
                filename = %item.filename(),
                error = %err,
                elapsed_ms,
                "engine call failed"
            ),
        }
        outcome
    }
}

/// `{base}/process`, keeping any path prefix on the base URL.
fn process_endpoint(base: &Url) -> Result<Url, InfraError> {
    let mut endpoint = base.clone();
    endpoint
        .path_segments_mut()
        .map_err(|()| InfraError::configuration(format!("`{base}` cannot be used as a base URL")))?
        .pop_if_empty()
        .push(PROCESS_PATH);
    endpoint.set_query(None);
    Ok(endpoint)
}

fn header_text(headers: &HeaderMap, name: &str) -> Result<Option<String>, BackendError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| BackendError::malformed(format!("`{name}` header is not valid text")))
        })
        .transpose()
}

async fn status_error(status: StatusCode, response: Response) -> BackendError {
    let body = response.text().await.unwrap_or_default();
    let mut excerpt: String = body.trim().chars().take(EXCERPT_CHARS).collect();
    if body.trim().chars().count() > EXCERPT_CHARS {
        excerpt.push('…');
    }
    BackendError::Status {
        status: status.as_u16(),
        excerpt,
    }
}
