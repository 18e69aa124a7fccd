//! Upload and transform-result value types.

use bytes::Bytes;

/// Filename assigned to a `file` part submitted without one.
pub const DEFAULT_UPLOAD_FILENAME: &str = "upload.bin";

/// Media type assigned when neither the client nor the filename suggests one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One submitted file. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    filename: String,
    content_type: String,
    bytes: Bytes,
}

impl UploadItem {
    /// Build an item, filling in a filename and media type when the client left them blank.
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let filename = if filename.trim().is_empty() {
            DEFAULT_UPLOAD_FILENAME.to_string()
        } else {
            filename
        };

        let content_type = content_type
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| guess_content_type(&filename));

        Self {
            filename,
            content_type,
            bytes: bytes.into(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

/// The engine's normalized output for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub payload: Bytes,
    pub media_type: String,
    pub filename: String,
}

impl TransformResult {
    /// Normalize engine-declared metadata, falling back to the originating upload.
    ///
    /// Blank values count as absent.
    pub fn from_engine(
        payload: Bytes,
        media_type: Option<String>,
        filename: Option<String>,
        origin: &UploadItem,
    ) -> Self {
        let media_type = non_blank(media_type).unwrap_or_else(|| origin.content_type().to_string());
        let filename = non_blank(filename).unwrap_or_else(|| origin.filename().to_string());
        Self {
            payload,
            media_type,
            filename,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Results index-aligned with the submitted items: `results[i]` answers `items[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    results: Vec<TransformResult>,
}

impl BatchResult {
    pub fn new(results: Vec<TransformResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransformResult> {
        self.results.iter()
    }

    pub fn into_inner(self) -> Vec<TransformResult> {
        self.results
    }
}

impl IntoIterator for BatchResult {
    type Item = TransformResult;
    type IntoIter = std::vec::IntoIter<TransformResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
