//! Seam between the dispatcher and the remote processing engine.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::uploads::{TransformResult, UploadItem};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("engine request failed: {message}")]
    Transport { message: String },
    #[error("engine did not answer within {seconds}s")]
    Timeout { seconds: u64 },
    #[error("engine responded with status {status}: {excerpt}")]
    Status { status: u16, excerpt: String },
    #[error("malformed engine response: {message}")]
    Malformed { message: String },
}

impl BackendError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// A remote `transform(bytes, options) -> (bytes, media type, filename)` function.
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait TransformEngine: Send + Sync {
    /// Transform one item. `options` is the serialized options object, passed through opaquely.
    async fn transform(
        &self,
        item: &UploadItem,
        options: &str,
    ) -> Result<TransformResult, BackendError>;
}
