//! Download-all: re-read every rendered resource and pack the readable ones into one archive.
//!
//! Failure policy is best-effort, the opposite of server-side dispatch: a member that cannot
//! be read is logged and left out, and the archive is built from the rest.

use bytes::Bytes;
use futures::future::join_all;
use tracing::warn;

use crate::application::assemble::build_archive;
use crate::domain::uploads::TransformResult;

use super::error::ClientError;
use super::locator::ResourceFetcher;
use super::session::RenderedItem;

pub const ARCHIVE_FILENAME: &str = "results.zip";
const FALLBACK_EXTENSION: &str = "png";

/// A gallery item left out of the archive.
///
/// `position` is the item's 1-based place in the preview answer, the same number the session
/// uses when it warns about an unusable preview. Member names count gallery entries instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMember {
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ArchiveBundle {
    pub filename: String,
    pub body: Bytes,
    pub members: Vec<String>,
    pub skipped: Vec<SkippedMember>,
}

/// `result_<NNN>.<ext>`, 1-based by gallery position.
pub fn member_name(gallery_position: usize, item: &RenderedItem) -> String {
    let ext = item
        .locator()
        .extension()
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
    format!("result_{gallery_position:03}.{ext}")
}

/// Read every item concurrently, wait for all of them, then archive the ones that succeeded.
pub async fn download_all(
    gallery: &[RenderedItem],
    fetcher: &dyn ResourceFetcher,
) -> Result<ArchiveBundle, ClientError> {
    if gallery.is_empty() {
        return Err(ClientError::EmptyGallery);
    }

    let reads = gallery.iter().map(|item| item.locator().read(fetcher));
    let outcomes = join_all(reads).await;

    let mut members = Vec::new();
    let mut names = Vec::new();
    let mut skipped = Vec::new();
    for (index, (item, outcome)) in gallery.iter().zip(outcomes).enumerate() {
        match outcome {
            Ok(payload) => {
                let name = member_name(index + 1, item);
                members.push(TransformResult {
                    payload,
                    media_type: String::new(),
                    filename: name.clone(),
                });
                names.push(name);
            }
            Err(err) => {
                let position = item.position();
                warn!(position, error = %err, "skipping unreadable result");
                skipped.push(SkippedMember {
                    position,
                    reason: err.to_string(),
                });
            }
        }
    }

    let archive_names = names.clone();
    let body = tokio::task::spawn_blocking(move || build_archive(&members, &archive_names))
        .await
        .map_err(|err| ClientError::Archive(err.to_string()))?
        .map_err(|err| ClientError::Archive(err.to_string()))?;

    Ok(ArchiveBundle {
        filename: ARCHIVE_FILENAME.to_string(),
        body,
        members: names,
        skipped,
    })
}
