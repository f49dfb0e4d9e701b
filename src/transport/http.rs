//! HTTP transport.

use super::Transport;
use crate::core::SyncError;
use anyhow::{Context, Result};
use reqwest::header::{ACCEPT_ENCODING, HeaderValue};
use std::path::Path;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        // Digests cover the stored bytes; a transparently decoded body would not match
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let client = reqwest::Client::builder()
            .user_agent(concat!("modsync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await.map_err(|e| SyncError::NetworkError {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        Ok(response)
    }
}

impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {url}");
        let response = self.get(url).await?;
        let body = response.bytes().await.map_err(|e| SyncError::NetworkError {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(body.to_vec())
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        tracing::debug!("GET {url} -> {}", dest.display());
        let mut response = self.get(url).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| SyncError::NetworkError {
            url: url.to_string(),
            reason: e.to_string(),
        })? {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await.with_context(|| format!("Failed to sync {}", dest.display()))?;
        Ok(written)
    }
}
