//! Batch service behind both processing routes.
//!
//! Validation always runs before dispatch: an empty batch, an empty file or malformed options
//! never reach the engine.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, instrument};

use crate::{
    application::{
        assemble::{self, Download, PreviewItem},
        backend::TransformEngine,
        dispatch::Dispatcher,
        error::GatewayError,
    },
    domain::{error::DomainError, options::ProcessingOptions, uploads::UploadItem},
};

pub const METRIC_BATCHES_TOTAL: &str = "batchgate_batches_total";

/// What a processing route received: the files, in submission order, and the raw options field.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub items: Vec<UploadItem>,
    pub raw_options: Option<String>,
}

impl BatchRequest {
    pub fn new(items: Vec<UploadItem>, raw_options: Option<String>) -> Self {
        Self { items, raw_options }
    }

    fn validate(self) -> Result<(Vec<UploadItem>, ProcessingOptions), GatewayError> {
        if self.items.is_empty() {
            return Err(GatewayError::NoFiles);
        }
        if let Some(item) = self.items.iter().find(|item| item.is_empty()) {
            return Err(DomainError::validation(format!("`{}` is empty", item.filename())).into());
        }
        let options = ProcessingOptions::parse_strict(self.raw_options.as_deref())?;
        Ok((self.items, options))
    }
}

#[derive(Clone)]
pub struct BatchService {
    dispatcher: Dispatcher,
}

impl BatchService {
    pub fn new(engine: Arc<dyn TransformEngine>) -> Self {
        Self {
            dispatcher: Dispatcher::new(engine),
        }
    }

    /// Binary route: one raw file, or an archive of every result.
    #[instrument(skip_all, fields(files = request.items.len()))]
    pub async fn process(&self, request: BatchRequest) -> Result<Download, GatewayError> {
        let outcome = self.process_inner(request).await;
        record_batch("process", outcome.is_ok());
        outcome
    }

    /// Preview route: every result inlined as a data URL.
    #[instrument(skip_all, fields(files = request.items.len()))]
    pub async fn preview(&self, request: BatchRequest) -> Result<Vec<PreviewItem>, GatewayError> {
        let outcome = self.preview_inner(request).await;
        record_batch("preview", outcome.is_ok());
        outcome
    }

    async fn process_inner(&self, request: BatchRequest) -> Result<Download, GatewayError> {
        let (items, options) = request.validate()?;
        let batch = self.dispatcher.dispatch(items, &options).await?;
        let download = assemble::assemble_download(batch).await?;
        info!(
            filename = %download.filename,
            archive = download.is_archive(),
            bytes = download.body.len(),
            "batch assembled"
        );
        Ok(download)
    }

    async fn preview_inner(&self, request: BatchRequest) -> Result<Vec<PreviewItem>, GatewayError> {
        let (items, options) = request.validate()?;
        let batch = self.dispatcher.dispatch(items, &options).await?;
        let previews = assemble::assemble_previews(&batch)?;
        info!(count = previews.len(), "previews assembled");
        Ok(previews)
    }
}

fn record_batch(route: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!(METRIC_BATCHES_TOTAL, "route" => route, "outcome" => outcome).increment(1);
}
