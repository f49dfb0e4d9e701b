//! Byte transports for manifests and files.
//!
//! [`Transport`] is the seam between the sync logic and the network. The
//! manifest client and the download executor are generic over it, so tests
//! drive them with a scripted transport instead of a server.
//!
//! - [`HttpTransport`]: `http://` and `https://` via reqwest
//! - [`FileTransport`]: `file://` mirrors on the local filesystem
//! - [`DefaultTransport`]: dispatches on the URL scheme
//!
//! Transports do not apply timeouts or retries. Callers wrap each attempt
//! in `tokio::time::timeout` and decide what to retry.

pub mod endpoints;
pub mod file;
pub mod http;

pub use endpoints::{EndpointSet, join_url, normalize_endpoint};
pub use file::FileTransport;
pub use http::HttpTransport;

use anyhow::Result;
use std::future::Future;
use std::path::Path;

pub trait Transport: Send + Sync {
    /// Fetch the whole body at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Stream the body at `url` into `dest`, creating or truncating it.
    /// Returns the number of bytes written.
    fn download_to(&self, url: &str, dest: &Path) -> impl Future<Output = Result<u64>> + Send;
}

/// Transport used by the CLI: `file://` URLs are read locally, everything
/// else goes over HTTP.
#[derive(Debug, Clone)]
pub struct DefaultTransport {
    http: HttpTransport,
    file: FileTransport,
}

impl DefaultTransport {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: HttpTransport::new()?,
            file: FileTransport,
        })
    }
}

impl Transport for DefaultTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if FileTransport::handles(url) {
            self.file.fetch(url).await
        } else {
            self.http.fetch(url).await
        }
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        if FileTransport::handles(url) {
            self.file.download_to(url, dest).await
        } else {
            self.http.download_to(url, dest).await
        }
    }
}
