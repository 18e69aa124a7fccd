//! Wire types shared by the batchgate server and its clients.

use serde::{Deserialize, Serialize};

/// Liveness probe body returned by `GET /api/v1/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl HealthResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }
}

/// Uniform error envelope for every non-success response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            error: Some(error.into()),
            detail,
        }
    }

    /// The most specific human-readable message, preferring `error` over `detail`.
    pub fn message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .filter(|value| !value.is_empty())
            .or_else(|| self.detail.as_deref().filter(|value| !value.is_empty()))
    }
}

/// One processed file, inlined as a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFile {
    pub name: String,
    pub mime_type: String,
    pub data_url: String,
}

/// Body of `POST /api/v1/process-preview`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(default)]
    pub files: Vec<PreviewFile>,
}
