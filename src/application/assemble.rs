//! Response assembly: single file, zip archive, or inline previews.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use batchgate_api_types::PreviewFile;
use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::uploads::{BatchResult, TransformResult};

pub const ARCHIVE_FILENAME: &str = "processed_images.zip";
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";
const ARCHIVE_COMPRESSION_LEVEL: i64 = 9;

/// RFC 5987 `attr-char`: everything outside it is percent-encoded in `filename*`.
const ATTR_CHAR_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// A preview entry as served on the preview route.
pub type PreviewItem = PreviewFile;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("nothing to assemble")]
    Empty,
    #[error("result {index} has no payload")]
    MissingPayload { index: usize },
    #[error("result {index} has no usable name")]
    MissingName { index: usize },
    #[error("failed to append `{name}` to the archive: {source}")]
    Append {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("archive error while handling `{name}`: {source}")]
    Archive {
        name: String,
        #[source]
        source: ZipError,
    },
    #[error("failed to finalize the archive: {0}")]
    Finalize(#[source] ZipError),
    #[error("archive task did not complete: {0}")]
    Aborted(String),
}

/// A fully assembled attachment for the binary route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub body: Bytes,
}

impl Download {
    pub fn is_archive(&self) -> bool {
        self.content_type == ARCHIVE_CONTENT_TYPE && self.filename == ARCHIVE_FILENAME
    }

    pub fn content_disposition(&self) -> String {
        attachment_disposition(&self.filename)
    }
}

/// Assemble the binary-route response: the raw file for one result, an archive otherwise.
///
/// Archive compression runs on the blocking pool.
pub async fn assemble_download(batch: BatchResult) -> Result<Download, AssemblyError> {
    let names = checked_names(&batch)?;
    let mut results = batch.into_inner();

    if results.len() == 1 {
        let result = results.remove(0);
        let filename = names.into_iter().next().ok_or(AssemblyError::Empty)?;
        return Ok(Download {
            filename,
            content_type: result.media_type,
            body: result.payload,
        });
    }

    let body = tokio::task::spawn_blocking(move || build_archive(&results, &names))
        .await
        .map_err(|err| AssemblyError::Aborted(err.to_string()))??;

    Ok(Download {
        filename: ARCHIVE_FILENAME.to_string(),
        content_type: ARCHIVE_CONTENT_TYPE.to_string(),
        body,
    })
}

/// Write every result as a deflated member, in order, and finalize only once all are in.
pub fn build_archive(
    results: &[TransformResult],
    names: &[String],
) -> Result<Bytes, AssemblyError> {
    let capacity = results.iter().map(|result| result.payload.len()).sum();
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(capacity)));

    for (result, name) in results.iter().zip(names) {
        writer
            .start_file(name.as_str(), member_options())
            .map_err(|source| AssemblyError::Archive {
                name: name.clone(),
                source,
            })?;
        writer
            .write_all(&result.payload)
            .map_err(|source| AssemblyError::Append {
                name: name.clone(),
                source,
            })?;
    }

    let cursor = writer.finish().map_err(AssemblyError::Finalize)?;
    Ok(Bytes::from(cursor.into_inner()))
}

fn member_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL))
}

/// Project every result into an inline preview, preserving order and the engine's names.
pub fn assemble_previews(batch: &BatchResult) -> Result<Vec<PreviewItem>, AssemblyError> {
    check_results(batch)?;
    batch
        .iter()
        .enumerate()
        .map(|(index, result)| {
            if result.filename.trim().is_empty() {
                return Err(AssemblyError::MissingName { index });
            }
            Ok(PreviewItem {
                name: result.filename.clone(),
                mime_type: result.media_type.clone(),
                data_url: data_url(&result.media_type, &result.payload),
            })
        })
        .collect()
}

/// Encode `payload` as a self-describing `data:` URL.
pub fn data_url(media_type: &str, payload: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(payload))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 name when needed.
pub fn attachment_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|ch| {
            if ch.is_ascii() && !ch.is_ascii_control() && ch != '"' && ch != '\\' {
                ch
            } else {
                '_'
            }
        })
        .collect();

    if fallback == filename {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            utf8_percent_encode(filename, ATTR_CHAR_SET)
        )
    }
}

fn check_results(batch: &BatchResult) -> Result<(), AssemblyError> {
    if batch.is_empty() {
        return Err(AssemblyError::Empty);
    }
    match batch.iter().position(|result| result.payload.is_empty()) {
        Some(index) => Err(AssemblyError::MissingPayload { index }),
        None => Ok(()),
    }
}

/// Derive attachment and member names; duplicates become `name (2).ext`.
fn checked_names(batch: &BatchResult) -> Result<Vec<String>, AssemblyError> {
    check_results(batch)?;

    let mut seen = HashSet::with_capacity(batch.len());
    let mut names = Vec::with_capacity(batch.len());
    for (index, result) in batch.iter().enumerate() {
        let base = base_name(&result.filename).ok_or(AssemblyError::MissingName { index })?;
        names.push(unique_name(base, &mut seen));
    }
    Ok(names)
}

fn base_name(filename: &str) -> Option<&str> {
    filename
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

fn unique_name(base: &str, seen: &mut HashSet<String>) -> String {
    if seen.insert(base.to_string()) {
        return base.to_string();
    }

    let (stem, ext) = match base.rfind('.') {
        Some(dot) if dot > 0 => base.split_at(dot),
        _ => (base, ""),
    };
    let mut counter = 2usize;
    loop {
        let candidate = format!("{stem} ({counter}){ext}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}
