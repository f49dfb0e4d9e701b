//! `file://` transport for local mirrors.

use super::Transport;
use crate::core::SyncError;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

impl FileTransport {
    #[must_use]
    pub fn handles(url: &str) -> bool {
        url.starts_with("file://")
    }

    fn to_path(url: &str) -> Result<PathBuf> {
        let parsed = reqwest::Url::parse(url).with_context(|| format!("Invalid file URL: {url}"))?;
        parsed.to_file_path().map_err(|()| anyhow::anyhow!("Not a local file URL: {url}"))
    }

    fn read_error(url: &str, e: &std::io::Error) -> anyhow::Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            SyncError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }
            .into()
        } else {
            SyncError::FileSystemError {
                operation: "read".to_string(),
                path: url.to_string(),
                reason: e.to_string(),
            }
            .into()
        }
    }
}

impl Transport for FileTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = Self::to_path(url)?;
        tokio::fs::read(&path).await.map_err(|e| Self::read_error(url, &e))
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let path = Self::to_path(url)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        tokio::fs::copy(&path, dest).await.map_err(|e| Self::read_error(url, &e))
    }
}
