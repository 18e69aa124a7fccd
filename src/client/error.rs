use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Gateway { status: u16, message: String },
    #[error("invalid resource locator: {0}")]
    Locator(String),
    #[error("failed to fetch {url}: status {status}")]
    Fetch { url: String, status: u16 },
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no files selected")]
    NoFiles,
    #[error("a submission is already in progress")]
    Busy,
    #[error("no results to download")]
    EmptyGallery,
    #[error("failed to build archive: {0}")]
    Archive(String),
}

impl ClientError {
    pub fn locator(message: impl Into<String>) -> Self {
        Self::Locator(message.into())
    }
}
