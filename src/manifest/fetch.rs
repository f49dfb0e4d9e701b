//! Manifest retrieval with endpoint failover.
//!
//! Endpoints are tried in [`EndpointSet`] order. Against each endpoint the
//! client makes up to `attempts_per_endpoint` attempts, each bounded by
//! `attempt_timeout`, waiting `n * backoff_step` before the n-th retry.
//! Only transient failures (connection errors, timeouts, 5xx and 429) are
//! retried against the same endpoint. A body that does not parse or
//! validate moves straight on to the next endpoint.
//!
//! When every endpoint fails the result is
//! [`SyncError::ManifestUnavailable`] and no plan is produced.

use super::Manifest;
use crate::constants::{
    DEFAULT_MANIFEST_PATH, MANIFEST_ATTEMPTS_PER_ENDPOINT, MANIFEST_BACKOFF_STEP_MS,
    default_attempt_timeout,
};
use crate::core::SyncError;
use crate::transport::{EndpointSet, Transport, join_url};
use crate::utils::linear_backoff;
use anyhow::Result;
use std::time::Duration;
use tokio_retry::RetryIf;

#[derive(Debug, Clone)]
pub struct ManifestFetchOptions {
    /// Manifest location relative to an endpoint
    pub manifest_path: String,
    pub attempts_per_endpoint: usize,
    /// Linear backoff step between attempts against one endpoint
    pub backoff_step: Duration,
    pub attempt_timeout: Duration,
}

impl Default for ManifestFetchOptions {
    fn default() -> Self {
        Self {
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            attempts_per_endpoint: MANIFEST_ATTEMPTS_PER_ENDPOINT,
            backoff_step: Duration::from_millis(MANIFEST_BACKOFF_STEP_MS),
            attempt_timeout: default_attempt_timeout(),
        }
    }
}

/// A manifest together with the endpoint that served it.
#[derive(Debug, Clone)]
pub struct FetchedManifest {
    pub manifest: Manifest,
    pub endpoint_index: usize,
    pub endpoint: String,
}

pub struct ManifestClient<T: Transport> {
    transport: T,
    options: ManifestFetchOptions,
}

impl<T: Transport> ManifestClient<T> {
    pub fn new(transport: T, options: ManifestFetchOptions) -> Self {
        Self {
            transport,
            options,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the manifest, marking the endpoint that answered as preferred.
    pub async fn fetch(&self, endpoints: &mut EndpointSet) -> Result<FetchedManifest> {
        let order: Vec<(usize, String)> =
            endpoints.ordered().map(|(index, endpoint)| (index, endpoint.to_string())).collect();

        let mut last_error: Option<anyhow::Error> = None;
        for (index, endpoint) in order {
            let url = join_url(&endpoint, &self.options.manifest_path);
            match self.fetch_from(&url).await {
                Ok(manifest) => {
                    tracing::info!(
                        target: "manifest::fetch",
                        "Manifest {} ({} entries) from {endpoint}",
                        manifest.format_version,
                        manifest.len()
                    );
                    endpoints.set_preferred(index);
                    return Ok(FetchedManifest {
                        manifest,
                        endpoint_index: index,
                        endpoint,
                    });
                }
                Err(e) => {
                    tracing::warn!(target: "manifest::fetch", "Endpoint {endpoint} failed: {e:#}");
                    last_error = Some(e);
                }
            }
        }

        Err(SyncError::ManifestUnavailable {
            endpoints: endpoints.describe(),
            reason: last_error.map_or_else(|| "no endpoints tried".to_string(), |e| format!("{e:#}")),
        }
        .into())
    }

    /// All attempts against a single manifest URL.
    async fn fetch_from(&self, url: &str) -> Result<Manifest> {
        let retries = self.options.attempts_per_endpoint.saturating_sub(1);
        let strategy = linear_backoff(self.options.backoff_step, retries);
        let transport = &self.transport;
        let timeout = self.options.attempt_timeout;
        let mut attempt = 0usize;

        RetryIf::start(
            strategy,
            || {
                attempt += 1;
                let current = attempt;
                async move {
                    tracing::debug!(target: "manifest::fetch", "Attempt {current} for {url}");
                    let bytes = match tokio::time::timeout(timeout, transport.fetch(url)).await {
                        Ok(result) => result?,
                        Err(_) => {
                            return Err(SyncError::Timeout {
                                url: url.to_string(),
                                seconds: timeout.as_secs(),
                            }
                            .into());
                        }
                    };
                    Manifest::from_json(&bytes, url)
                }
            },
            |e: &anyhow::Error| e.downcast_ref::<SyncError>().is_some_and(SyncError::is_transient),
        )
        .await
    }
}
