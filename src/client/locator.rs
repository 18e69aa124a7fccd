//! Where a rendered result lives: inline in the preview payload, or behind a URL.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use url::Url;

use super::error::ClientError;

/// Fetches remote resources for download-all.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocator {
    /// A decoded `data:<mime>;base64,<payload>` URL.
    Inline { media_type: String, payload: Bytes },
    Remote(Url),
}

impl ResourceLocator {
    /// Parse a data URL, or an absolute or `base`-relative URL.
    pub fn parse(raw: &str, base: &Url) -> Result<Self, ClientError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ClientError::locator("empty locator"));
        }
        if let Some(rest) = raw.strip_prefix("data:") {
            return parse_data_url(rest);
        }

        let url = base.join(raw)?;
        match url.scheme() {
            "http" | "https" => Ok(Self::Remote(url)),
            other => Err(ClientError::locator(format!("unsupported scheme `{other}`"))),
        }
    }

    /// Bytes of the resource; inline payloads never touch the network.
    pub async fn read(&self, fetcher: &dyn ResourceFetcher) -> Result<Bytes, ClientError> {
        match self {
            Self::Inline { payload, .. } => Ok(payload.clone()),
            Self::Remote(url) => fetcher.fetch(url).await,
        }
    }

    /// File extension implied by the locator: the URL path's, else the inline media type's.
    pub fn extension(&self) -> Option<String> {
        match self {
            Self::Remote(url) => {
                let last = url.path_segments()?.next_back()?;
                let (stem, ext) = last.rsplit_once('.')?;
                (!stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
                    .then(|| ext.to_string())
            }
            Self::Inline { media_type, .. } => extension_for(media_type),
        }
    }
}

fn parse_data_url(rest: &str) -> Result<ResourceLocator, ClientError> {
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| ClientError::locator("data URL has no payload separator"))?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| ClientError::locator("only base64 data URLs are supported"))?;
    let media_type = if media_type.is_empty() {
        "application/octet-stream"
    } else {
        media_type
    };
    let payload = STANDARD
        .decode(data)
        .map_err(|err| ClientError::locator(format!("invalid base64 payload: {err}")))?;
    Ok(ResourceLocator::Inline {
        media_type: media_type.to_string(),
        payload: Bytes::from(payload),
    })
}

fn extension_for(media_type: &str) -> Option<String> {
    let essence = media_type.split(';').next()?.trim();
    let subtype = essence.split('/').nth(1)?;
    let candidates = mime_guess::get_mime_extensions_str(essence)?;
    candidates
        .iter()
        .find(|ext| **ext == subtype)
        .or_else(|| candidates.first())
        .map(|ext| ext.to_string())
}
