//! A game client directory driven through the library pipeline.

use anyhow::Result;
use modsync_cli::executor::{ApplyReport, DownloadExecutor, ExecutorOptions};
use modsync_cli::manifest::{Manifest, ManifestClient, ManifestFetchOptions};
use modsync_cli::planner::{IgnoreSet, ReconciliationPlan, plan};
use modsync_cli::scanner::{HashCache, LocalState, scan};
use modsync_cli::test_utils::{init_test_logging, list_files, write_file};
use modsync_cli::transport::{DefaultTransport, EndpointSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub struct Client {
    dir: TempDir,
    endpoints: Vec<String>,
    ignore: Vec<String>,
}

impl Client {
    pub fn new<S: AsRef<str>>(endpoints: &[S]) -> Result<Self> {
        init_test_logging(None);
        Ok(Self {
            dir: TempDir::new()?,
            endpoints: endpoints.iter().map(|e| e.as_ref().to_string()).collect(),
            ignore: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_ignore(mut self, patterns: &[&str]) -> Self {
        self.ignore = patterns.iter().map(|p| (*p).to_string()).collect();
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
        write_file(self.dir.path(), rel, content)
    }

    pub fn read(&self, rel: &str) -> Option<Vec<u8>> {
        std::fs::read(self.dir.path().join(rel)).ok()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.dir.path().join(rel).exists()
    }

    pub fn files(&self) -> Vec<String> {
        list_files(self.dir.path())
    }

    fn endpoint_set(&self) -> Result<EndpointSet> {
        EndpointSet::new(&self.endpoints)
    }

    async fn fetch(&self, endpoints: &mut EndpointSet) -> Result<Manifest> {
        let options = ManifestFetchOptions {
            backoff_step: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(5),
            ..ManifestFetchOptions::default()
        };
        let client = ManifestClient::new(DefaultTransport::new()?, options);
        Ok(client.fetch(endpoints).await?.manifest)
    }

    pub async fn scan(&self) -> Result<LocalState> {
        let mut cache = HashCache::new(self.dir.path());
        scan(self.dir.path(), &mut cache).await
    }

    /// Fetch, scan and plan, as `modsync audit` does.
    pub async fn audit(&self) -> Result<(Manifest, ReconciliationPlan)> {
        let mut endpoints = self.endpoint_set()?;
        let manifest = self.fetch(&mut endpoints).await?;
        let local = self.scan().await?;
        let ignore = IgnoreSet::new(&self.ignore)?;
        let plan = plan(&local, &manifest, &ignore);
        Ok((manifest, plan))
    }

    /// Audit and apply, as `modsync sync` does.
    pub async fn sync(&self) -> Result<(ReconciliationPlan, ApplyReport)> {
        let mut endpoints = self.endpoint_set()?;
        let manifest = self.fetch(&mut endpoints).await?;
        let local = self.scan().await?;
        let plan = plan(&local, &manifest, &IgnoreSet::new(&self.ignore)?);

        let executor = DownloadExecutor::new(
            DefaultTransport::new()?,
            self.dir.path(),
            ExecutorOptions {
                attempt_timeout: Duration::from_secs(5),
                ..ExecutorOptions::default()
            },
        );
        let report = executor.apply(&plan, &endpoints, &CancellationToken::new(), None).await;
        Ok((plan, report))
    }
}

/// Paths of a list of entries.
pub fn paths(entries: &[modsync_cli::manifest::FileEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.path.as_str()).collect()
}
