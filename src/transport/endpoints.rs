//! Ordered endpoint list with a preferred entry.
//!
//! Endpoints are tried in priority order. Once a manifest fetch succeeds
//! against one of them, that endpoint is marked preferred and file
//! downloads try it first, followed by the rest in their original order.

use crate::core::SyncError;
use anyhow::Result;

/// Normalize a configured endpoint: add `http://` when no scheme is given
/// and drop trailing slashes.
#[must_use]
pub fn normalize_endpoint(raw: &str) -> String {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let stripped = with_scheme.trim_end_matches('/');
    // Keep `file:///` from collapsing into a bare scheme
    if stripped.ends_with(':') || stripped.ends_with(":/") {
        with_scheme
    } else {
        stripped.to_string()
    }
}

/// Resolve `locator` against `endpoint`. Absolute URLs are returned as is.
#[must_use]
pub fn join_url(endpoint: &str, locator: &str) -> String {
    if locator.contains("://") {
        return locator.to_string();
    }
    format!("{}/{}", endpoint.trim_end_matches('/'), locator.trim_start_matches('/'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSet {
    endpoints: Vec<String>,
    preferred: usize,
}

impl EndpointSet {
    /// Build from configured endpoints, in priority order. Duplicates after
    /// normalization are dropped.
    pub fn new<I, S>(endpoints: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for raw in endpoints {
            if raw.as_ref().trim().is_empty() {
                continue;
            }
            let endpoint = normalize_endpoint(raw.as_ref());
            if !normalized.contains(&endpoint) {
                normalized.push(endpoint);
            }
        }
        if normalized.is_empty() {
            return Err(SyncError::ConfigError {
                message: "no endpoints configured".to_string(),
            }
            .into());
        }
        Ok(Self {
            endpoints: normalized,
            preferred: 0,
        })
    }

    /// Endpoints in try order: the preferred one, then the rest by priority.
    pub fn ordered(&self) -> impl Iterator<Item = (usize, &str)> {
        std::iter::once(self.preferred)
            .chain((0..self.endpoints.len()).filter(move |&i| i != self.preferred))
            .map(|i| (i, self.endpoints[i].as_str()))
    }

    /// Mark the endpoint at `index` as preferred. Out-of-range indices are ignored.
    pub fn set_preferred(&mut self, index: usize) {
        if index < self.endpoints.len() {
            self.preferred = index;
        }
    }

    #[must_use]
    pub const fn preferred(&self) -> usize {
        self.preferred
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.endpoints.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Comma-separated list for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        self.endpoints.join(", ")
    }
}
