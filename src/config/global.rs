//! User-wide sync configuration (`~/.modsync/config.toml`).
//!
//! ```toml
//! endpoints = ["http://148.251.176.5:8000", "http://188.225.24.31:8000"]
//! manifest_path = "launcher/manifest"
//! ignore = ["options.txt", "saves/", "screenshots/"]
//! concurrency = 4
//! attempt_timeout_secs = 60
//! manifest_attempts = 3
//! manifest_backoff_ms = 1000
//! download_attempts_per_endpoint = 1
//! cache_path = "~/.modsync/hash-cache.json"
//! notify_url = "http://148.251.176.5:8000/launcher/synced"
//! ```
//!
//! Every field is optional. The file location is, in order of precedence,
//! the `--config` flag, the `MODSYNC_CONFIG` environment variable, then the
//! default path. Paths may start with `~`.

use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_FALLBACK_ENDPOINT, DEFAULT_MANIFEST_PATH, DEFAULT_PRIMARY_ENDPOINT,
    DOWNLOAD_ATTEMPTS_PER_ENDPOINT, MANIFEST_ATTEMPTS_PER_ENDPOINT, MANIFEST_BACKOFF_STEP_MS,
};
use crate::core::SyncError;
use crate::executor::ExecutorOptions;
use crate::manifest::ManifestFetchOptions;
use crate::transport::EndpointSet;
use crate::utils::fs::atomic_write_async;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "MODSYNC_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Manifest and file endpoints in priority order
    pub endpoints: Vec<String>,
    pub manifest_path: String,
    /// Glob patterns for paths the sync never touches
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    pub concurrency: usize,
    pub attempt_timeout_secs: u64,
    /// Manifest attempts per endpoint before falling back
    pub manifest_attempts: usize,
    pub manifest_backoff_ms: u64,
    pub download_attempts_per_endpoint: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,
    /// Receives a JSON notice after a clean sync
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_url: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![DEFAULT_PRIMARY_ENDPOINT.to_string(), DEFAULT_FALLBACK_ENDPOINT.to_string()],
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            ignore: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            attempt_timeout_secs: 60,
            manifest_attempts: MANIFEST_ATTEMPTS_PER_ENDPOINT,
            manifest_backoff_ms: MANIFEST_BACKOFF_STEP_MS,
            download_attempts_per_endpoint: DOWNLOAD_ATTEMPTS_PER_ENDPOINT,
            cache_path: None,
            notify_url: None,
        }
    }
}

/// Expand a leading `~` in a configured path.
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn config_dir() -> Result<PathBuf> {
    if cfg!(target_os = "windows") {
        Ok(dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
            .join("modsync"))
    } else {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".modsync"))
    }
}

impl SyncConfig {
    /// `~/.modsync/config.toml`, or `%LOCALAPPDATA%\modsync\config.toml` on Windows.
    pub fn default_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Config file location given an explicit path and the value of
    /// [`CONFIG_ENV`].
    pub fn resolve_path(explicit: Option<&Path>, env_value: Option<&str>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
            return Ok(expand_path(value));
        }
        Self::default_path()
    }

    /// Load from the resolved location. A missing file yields defaults.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_value = std::env::var(CONFIG_ENV).ok();
        let path = Self::resolve_path(explicit, env_value.as_deref())?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            if explicit.is_some() {
                tracing::warn!("Config file {} not found; using defaults", path.display());
            }
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| SyncError::ConfigError {
            message: format!("{}: {e}", path.display()),
        })?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write as TOML, atomically, readable by the owner only on Unix.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        atomic_write_async(path, content.into_bytes())
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = tokio::fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            tokio::fs::set_permissions(path, perms)
                .await
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| -> Result<()> {
            Err(SyncError::ConfigError {
                message: message.to_string(),
            }
            .into())
        };

        if self.concurrency == 0 {
            return invalid("concurrency must be at least 1");
        }
        if self.manifest_attempts == 0 || self.download_attempts_per_endpoint == 0 {
            return invalid("attempt counts must be at least 1");
        }
        if self.attempt_timeout_secs == 0 {
            return invalid("attempt_timeout_secs must be at least 1");
        }
        if self.manifest_path.trim().is_empty() {
            return invalid("manifest_path must not be empty");
        }
        Ok(())
    }

    /// Endpoints to use: `overrides` when given, otherwise the configured list.
    pub fn endpoint_set(&self, overrides: &[String]) -> Result<EndpointSet> {
        if overrides.is_empty() {
            EndpointSet::new(&self.endpoints)
        } else {
            EndpointSet::new(overrides)
        }
    }

    /// Hash cache location, defaulting to `~/.modsync/hash-cache.json`.
    pub fn cache_file(&self) -> Result<PathBuf> {
        match &self.cache_path {
            Some(path) => Ok(expand_path(path)),
            None => Ok(config_dir()?.join("hash-cache.json")),
        }
    }

    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    #[must_use]
    pub fn fetch_options(&self) -> ManifestFetchOptions {
        ManifestFetchOptions {
            manifest_path: self.manifest_path.clone(),
            attempts_per_endpoint: self.manifest_attempts,
            backoff_step: Duration::from_millis(self.manifest_backoff_ms),
            attempt_timeout: self.attempt_timeout(),
        }
    }

    #[must_use]
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            concurrency: self.concurrency,
            attempt_timeout: self.attempt_timeout(),
            attempts_per_endpoint: self.download_attempts_per_endpoint,
        }
    }
}
