//! Concurrent fan-out of a batch to the transform engine.
//!
//! Failure policy is all-or-nothing: the first failing item fails the whole batch and the
//! remaining in-flight calls are aborted. Results are collected into per-index slots so the
//! output order always matches the input order, whatever order the calls complete in.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info_span, warn};

use crate::application::backend::{BackendError, TransformEngine};
use crate::domain::options::ProcessingOptions;
use crate::domain::uploads::{BatchResult, TransformResult, UploadItem};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no files")]
    Empty,
    #[error("item {index} (`{filename}`) failed: {source}")]
    Backend {
        index: usize,
        filename: String,
        #[source]
        source: BackendError,
    },
    #[error("transform task aborted: {reason}")]
    Aborted { reason: String },
}

#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<dyn TransformEngine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn TransformEngine>) -> Self {
        Self { engine }
    }

    /// Transform every item concurrently and return the results in input order.
    ///
    /// Dropping the returned future aborts every call still in flight.
    pub async fn dispatch(
        &self,
        items: Vec<UploadItem>,
        options: &ProcessingOptions,
    ) -> Result<BatchResult, DispatchError> {
        if items.is_empty() {
            return Err(DispatchError::Empty);
        }

        let total = items.len();
        let wire_options: Arc<str> = Arc::from(options.to_wire());
        let mut slots: Vec<Option<TransformResult>> = (0..total).map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let engine = Arc::clone(&self.engine);
            let wire_options = Arc::clone(&wire_options);
            let span = info_span!(
                "engine.transform",
                index,
                filename = %item.filename(),
                bytes = item.len()
            );
            tasks.spawn(
                async move {
                    let outcome = engine.transform(&item, &wire_options).await;
                    (index, item, outcome)
                }
                .instrument(span),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, item, outcome) = joined.map_err(|err| DispatchError::Aborted {
                reason: err.to_string(),
            })?;

            match outcome {
                Ok(result) => {
                    debug!(index, filename = %result.filename, "item transformed");
                    slots[index] = Some(result);
                }
                Err(source) => {
                    warn!(
                        index,
                        filename = %item.filename(),
                        error = %source,
                        pending = tasks.len(),
                        "item failed, aborting batch"
                    );
                    tasks.abort_all();
                    return Err(DispatchError::Backend {
                        index,
                        filename: item.filename().to_string(),
                        source,
                    });
                }
            }
        }

        let results = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| DispatchError::Aborted {
                    reason: format!("item {index} produced no result"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BatchResult::new(results))
    }
}
