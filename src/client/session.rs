//! Interactive session: the submit state machine and the rendered gallery.
//!
//! The gallery is the "last batch": replaced on every successful submission and left untouched
//! by a failed one, so earlier results stay visible next to the error.

use batchgate_api_types::PreviewFile;
use tracing::{info, warn};
use url::Url;

use crate::domain::{options::ProcessingOptions, uploads::UploadItem};

use super::download::{ArchiveBundle, download_all};
use super::error::ClientError;
use super::gateway::BatchGateway;
use super::locator::{ResourceFetcher, ResourceLocator};

const DEFAULT_DOWNLOAD_NAME: &str = "image.png";
const NO_FILES_MESSAGE: &str = "Please choose at least one image.";
const SUBMITTING_MESSAGE: &str = "Processing, please wait...";
const RENDERED_MESSAGE: &str = "Done. Each image can be downloaded below.";
const IGNORED_OVERRIDE_MESSAGE: &str = "Options JSON is invalid; using the default settings.";
const CANCELLED_MESSAGE: &str = "Submission cancelled.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle { last_error: Option<String> },
    Submitting,
    Rendered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub message: String,
}

impl StatusLine {
    fn info(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }
}

/// One gallery entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedItem {
    position: usize,
    name: Option<String>,
    locator: ResourceLocator,
}

impl RenderedItem {
    pub fn new(position: usize, name: Option<String>, locator: ResourceLocator) -> Self {
        let name = name.filter(|value| !value.trim().is_empty());
        Self {
            position,
            name,
            locator,
        }
    }

    /// 1-based position in the preview list the item came from.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Image {}", self.position))
    }

    pub fn download_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_DOWNLOAD_NAME)
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    base: Url,
    state: SessionState,
    gallery: Vec<RenderedItem>,
    status: Option<StatusLine>,
    warnings: Vec<String>,
}

impl Session {
    /// `base` resolves relative locators in preview answers.
    pub fn new(base: Url) -> Self {
        Self {
            base,
            state: SessionState::Idle { last_error: None },
            gallery: Vec::new(),
            status: None,
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn gallery(&self) -> &[RenderedItem] {
        &self.gallery
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    /// Warnings raised by the last submission, in order.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Enter `Submitting`. Refuses an empty selection and a second concurrent submission
    /// without changing state.
    pub fn begin_submit(&mut self, file_count: usize) -> Result<(), ClientError> {
        if self.state == SessionState::Submitting {
            return Err(ClientError::Busy);
        }
        if file_count == 0 {
            self.status = Some(StatusLine::error(NO_FILES_MESSAGE));
            return Err(ClientError::NoFiles);
        }
        self.state = SessionState::Submitting;
        self.status = Some(StatusLine::info(SUBMITTING_MESSAGE));
        Ok(())
    }

    /// `Submitting` → `Rendered`: replace the gallery with the usable entries of `files`.
    pub fn complete(&mut self, files: Vec<PreviewFile>) {
        let mut gallery = Vec::with_capacity(files.len());
        for (index, file) in files.into_iter().enumerate() {
            let position = index + 1;
            match ResourceLocator::parse(&file.data_url, &self.base) {
                Ok(locator) => gallery.push(RenderedItem::new(position, Some(file.name), locator)),
                Err(err) => {
                    warn!(position, name = %file.name, error = %err, "skipping unusable preview");
                    self.warnings
                        .push(format!("Skipped result #{position}: {err}"));
                }
            }
        }
        info!(count = gallery.len(), "gallery rendered");
        self.gallery = gallery;
        self.state = SessionState::Rendered;
        self.status = Some(StatusLine::info(RENDERED_MESSAGE));
    }

    /// `Submitting` → `Idle` carrying the error; the previous gallery stays.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.status = Some(StatusLine::error(format!("Error: {message}")));
        self.state = SessionState::Idle {
            last_error: Some(message),
        };
    }

    /// Build options leniently, submit `files` to the preview route and render the answer.
    ///
    /// Dropping the returned future mid-flight puts the session back to `Idle`.
    pub async fn submit(
        &mut self,
        gateway: &dyn BatchGateway,
        files: &[UploadItem],
        shadow_enabled: bool,
        manual_options: Option<&str>,
    ) -> Result<(), ClientError> {
        self.begin_submit(files.len())?;
        let mut guard = SubmitGuard(self);
        guard.0.warnings.clear();

        let (options, ignored) = ProcessingOptions::interactive(shadow_enabled, manual_options);
        if let Some(ignored) = ignored {
            warn!(reason = %ignored.reason, "ignoring manual options override");
            guard.0.warnings.push(IGNORED_OVERRIDE_MESSAGE.to_string());
            guard.0.status = Some(StatusLine::warning(IGNORED_OVERRIDE_MESSAGE));
        }

        match gateway.process_preview(files, &options).await {
            Ok(previews) => {
                guard.0.complete(previews);
                Ok(())
            }
            Err(err) => {
                guard.0.fail(err.to_string());
                Err(err)
            }
        }
    }

    /// Bundle every gallery item into `results.zip`, skipping members that cannot be read.
    pub async fn download_all(
        &self,
        fetcher: &dyn ResourceFetcher,
    ) -> Result<ArchiveBundle, ClientError> {
        download_all(&self.gallery, fetcher).await
    }
}

/// Leaves `Submitting` when a submission is abandoned before it settles.
struct SubmitGuard<'a>(&'a mut Session);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if self.0.state == SessionState::Submitting {
            warn!("submission dropped before the gateway answered");
            self.0.state = SessionState::Idle { last_error: None };
            self.0.status = Some(StatusLine::info(CANCELLED_MESSAGE));
        }
    }
}
