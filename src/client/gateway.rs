//! HTTP client for the gateway's own routes.

use async_trait::async_trait;
use batchgate_api_types::{ErrorBody, HealthResponse, PreviewFile, PreviewResponse};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use reqwest::{
    Client, Response,
    header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    multipart::{Form, Part},
};
use url::Url;

use crate::domain::{options::ProcessingOptions, uploads::UploadItem};

use super::error::ClientError;
use super::locator::ResourceFetcher;

const HEALTH_PATH: &str = "api/v1/health";
const PROCESS_PATH: &str = "api/v1/process";
const PREVIEW_PATH: &str = "api/v1/process-preview";
const FALLBACK_DOWNLOAD_NAME: &str = "download.bin";

/// The preview route, as seen by the session.
#[async_trait]
pub trait BatchGateway: Send + Sync {
    async fn process_preview(
        &self,
        files: &[UploadItem],
        options: &ProcessingOptions,
    ) -> Result<Vec<PreviewFile>, ClientError>;
}

/// Body of a binary-route answer, named by its `Content-Disposition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayDownload {
    pub filename: String,
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Clone, Debug)]
pub struct GatewayClient {
    client: Client,
    base: Url,
}

impl GatewayClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base)?.join("/")?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("batchgate-client/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(ClientError::Url)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.client.get(self.url(HEALTH_PATH)?).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Binary route: one raw file or `processed_images.zip`.
    pub async fn process(
        &self,
        files: &[UploadItem],
        options: &ProcessingOptions,
    ) -> Result<GatewayDownload, ClientError> {
        let response = self
            .client
            .post(self.url(PROCESS_PATH)?)
            .multipart(batch_form(files, options)?)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let headers = response.headers();
        let filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_filename)
            .unwrap_or_else(|| FALLBACK_DOWNLOAD_NAME.to_string());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = response.bytes().await?;

        Ok(GatewayDownload {
            filename,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl BatchGateway for GatewayClient {
    async fn process_preview(
        &self,
        files: &[UploadItem],
        options: &ProcessingOptions,
    ) -> Result<Vec<PreviewFile>, ClientError> {
        let response = self
            .client
            .post(self.url(PREVIEW_PATH)?)
            .multipart(batch_form(files, options)?)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let preview: PreviewResponse = response.json().await?;
        Ok(preview.files)
    }
}

#[async_trait]
impl ResourceFetcher for GatewayClient {
    async fn fetch(&self, url: &Url) -> Result<Bytes, ClientError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?)
    }
}

fn batch_form(files: &[UploadItem], options: &ProcessingOptions) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for item in files {
        let part = Part::bytes(item.bytes().to_vec())
            .file_name(item.filename().to_string())
            .mime_str(item.content_type())?;
        form = form.part("file", part);
    }
    Ok(form.text("options", options.to_wire()))
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(ClientError::Gateway {
        status: status.as_u16(),
        message: failure_message(status.as_u16(), &body),
    })
}

/// `error`, else `detail`, else a generic status line.
pub fn failure_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|envelope| envelope.message().map(str::to_string))
        .unwrap_or_else(|| format!("Request failed with status {status}"))
}

/// Extract the attachment name, preferring the RFC 5987 `filename*` form.
pub fn disposition_filename(value: &str) -> Option<String> {
    let mut plain = None;
    for param in value.split(';').map(str::trim) {
        if let Some(encoded) = param.strip_prefix("filename*=") {
            let decoded = encoded
                .strip_prefix("UTF-8''")
                .or_else(|| encoded.strip_prefix("utf-8''"))
                .and_then(|encoded| percent_decode_str(encoded).decode_utf8().ok())
                .map(|decoded| decoded.into_owned());
            if let Some(decoded) = decoded {
                return Some(decoded);
            }
        } else if let Some(quoted) = param.strip_prefix("filename=") {
            plain = Some(quoted.trim_matches('"').to_string());
        }
    }
    plain.filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_prefers_error_then_detail() {
        assert_eq!(
            failure_message(400, br#"{"error":"No file uploaded"}"#),
            "No file uploaded"
        );
        assert_eq!(
            failure_message(500, br#"{"error":"","detail":"engine down"}"#),
            "engine down"
        );
        assert_eq!(
            failure_message(502, b"<html>bad gateway</html>"),
            "Request failed with status 502"
        );
        assert_eq!(failure_message(500, b"{}"), "Request failed with status 500");
    }

    #[test]
    fn disposition_prefers_extended_name() {
        assert_eq!(
            disposition_filename("attachment; filename=\"processed_images.zip\"").as_deref(),
            Some("processed_images.zip")
        );
        assert_eq!(
            disposition_filename(
                "attachment; filename=\"_nh 1.png\"; filename*=UTF-8''%E1%BA%A3nh%201.png"
            )
            .as_deref(),
            Some("ảnh 1.png")
        );
        assert_eq!(disposition_filename("inline"), None);
    }

    #[test]
    fn undecodable_extended_name_falls_back_to_plain() {
        assert_eq!(
            disposition_filename("attachment; filename=\"x.png\"; filename*=UTF-8''%FF.png")
                .as_deref(),
            Some("x.png")
        );
        let header = crate::application::assemble::attachment_disposition("ảnh 1.png");
        assert_eq!(disposition_filename(&header).as_deref(), Some("ảnh 1.png"));
    }

    #[test]
    fn base_url_is_normalized_to_root() {
        let client = GatewayClient::new("http://localhost:3000/some/page").unwrap();
        assert_eq!(
            client.url(PREVIEW_PATH).unwrap().as_str(),
            "http://localhost:3000/api/v1/process-preview"
        );
    }
}
