use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use batchgate_api_types::ErrorBody;
use thiserror::Error;

use crate::{
    application::{assemble::AssemblyError, dispatch::DispatchError},
    config::LoadError,
    domain::{error::DomainError, options::OptionsError},
    infra::error::InfraError,
    util::bytes::format_bytes,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Every way a batch request can fail, from multipart parsing to archive assembly.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no file uploaded")]
    NoFiles,
    #[error("too many files: at most {limit} per request")]
    TooManyFiles { limit: usize },
    #[error("`{filename}` exceeds the per-file limit of {}", format_bytes(*limit_bytes))]
    FileTooLarge { filename: String, limit_bytes: u64 },
    #[error("request body exceeds the limit of {}", format_bytes(*limit_bytes))]
    RequestTooLarge { limit_bytes: u64 },
    #[error("invalid multipart payload: {0}")]
    Multipart(String),
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl GatewayError {
    pub fn multipart(message: impl Into<String>) -> Self {
        Self::Multipart(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NoFiles
            | GatewayError::TooManyFiles { .. }
            | GatewayError::Multipart(_)
            | GatewayError::Options(_)
            | GatewayError::Dispatch(DispatchError::Empty)
            | GatewayError::Domain(DomainError::Validation { .. }) => StatusCode::BAD_REQUEST,
            GatewayError::FileTooLarge { .. } | GatewayError::RequestTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            GatewayError::Dispatch(_)
            | GatewayError::Assembly(_)
            | GatewayError::Domain(DomainError::Invariant { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn presentation_message(&self) -> &'static str {
        match self {
            GatewayError::NoFiles | GatewayError::Dispatch(DispatchError::Empty) => {
                "No file uploaded"
            }
            GatewayError::TooManyFiles { .. } => "Too many files",
            GatewayError::FileTooLarge { .. } => "File too large",
            GatewayError::RequestTooLarge { .. } => "Request too large",
            GatewayError::Multipart(_) => "Invalid multipart payload",
            GatewayError::Options(_) => "Invalid JSON in options",
            GatewayError::Domain(DomainError::Validation { .. }) => {
                "Request could not be processed"
            }
            GatewayError::Dispatch(_)
            | GatewayError::Assembly(_)
            | GatewayError::Domain(DomainError::Invariant { .. }) => "Internal server error",
        }
    }

    /// Human-readable detail for the envelope; the empty-batch answer carries none.
    pub fn detail(&self) -> Option<String> {
        match self {
            GatewayError::NoFiles | GatewayError::Dispatch(DispatchError::Empty) => None,
            other => Some(other.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody::new(self.presentation_message(), self.detail());
        let report = ErrorReport::from_error("application::error::GatewayError", status, &self);
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

/// Startup and serving failures reported by the server binary before it exits.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("server error: {0}")]
    Server(String),
}

impl AppError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server(message.into())
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;
    use crate::application::backend::BackendError;

    async fn envelope(error: GatewayError) -> (StatusCode, serde_json::Value, ErrorReport) {
        let response = error.into_response();
        let status = response.status();
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .cloned()
            .expect("report attached");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap(), report)
    }

    #[tokio::test]
    async fn empty_batch_has_no_detail() {
        let (status, body, _) = envelope(GatewayError::NoFiles).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "No file uploaded"}));
    }

    #[tokio::test]
    async fn malformed_options_carry_parser_detail() {
        let err = crate::domain::options::ProcessingOptions::parse_strict(Some("{"))
            .map(|_| ())
            .unwrap_err();
        let (status, body, _) = envelope(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid JSON in options");
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .starts_with("options are not valid JSON")
        );
    }

    #[tokio::test]
    async fn backend_failure_is_internal_with_chain_in_report() {
        let err = GatewayError::from(DispatchError::Backend {
            index: 2,
            filename: "c.jpg".into(),
            source: BackendError::Status {
                status: 502,
                excerpt: "upstream down".into(),
            },
        });
        let (status, body, report) = envelope(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(body["detail"].as_str().unwrap().contains("c.jpg"));
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[1].contains("status 502"));
    }

    #[tokio::test]
    async fn oversized_file_is_payload_too_large() {
        let err = GatewayError::FileTooLarge {
            filename: "huge.png".into(),
            limit_bytes: 15 * 1024 * 1024,
        };
        let (status, body, _) = envelope(err).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body["detail"],
            "`huge.png` exceeds the per-file limit of 15 MiB"
        );
    }
}
