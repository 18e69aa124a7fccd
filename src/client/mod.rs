//! Client-side aggregator: submits batches to the preview route, keeps the rendered gallery for
//! the session, and bundles every rendered resource into one archive on demand.

pub mod download;
pub mod error;
pub mod gateway;
pub mod locator;
pub mod session;

pub use download::{ARCHIVE_FILENAME, ArchiveBundle, SkippedMember, download_all};
pub use error::ClientError;
pub use gateway::{BatchGateway, GatewayClient, GatewayDownload};
pub use locator::{ResourceFetcher, ResourceLocator};
pub use session::{RenderedItem, Session, SessionState, StatusKind, StatusLine};
