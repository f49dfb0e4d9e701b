//! Fire-and-forget side tasks.
//!
//! Some follow-up work after a sync (telling a companion service that the
//! client is up to date, for example) must never delay or fail the sync.
//! [`SideTaskQueue`] runs such tasks one at a time on a background worker.
//! Failures are logged and counted, nothing more.

use anyhow::Result;
use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct SideTask {
    name: String,
    future: BoxFuture<'static, Result<()>>,
}

/// Counts reported when the queue shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideTaskStats {
    pub completed: usize,
    pub failed: usize,
    /// Tasks still queued or running when the grace period ran out
    pub abandoned: bool,
}

pub struct SideTaskQueue {
    sender: mpsc::UnboundedSender<SideTask>,
    worker: JoinHandle<SideTaskStats>,
}

impl SideTaskQueue {
    /// Start the worker. Must be called within a tokio runtime.
    #[must_use]
    pub fn start() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<SideTask>();
        let worker = tokio::spawn(async move {
            let mut stats = SideTaskStats::default();
            while let Some(task) = receiver.recv().await {
                match task.future.await {
                    Ok(()) => {
                        tracing::debug!("Side task '{}' finished", task.name);
                        stats.completed += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Side task '{}' failed: {e:#}", task.name);
                        stats.failed += 1;
                    }
                }
            }
            stats
        });

        Self {
            sender,
            worker,
        }
    }

    /// Queue `future` under `name`. Returns false if the worker is gone.
    pub fn enqueue<F>(&self, name: impl Into<String>, future: F) -> bool
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let task = SideTask {
            name: name.into(),
            future: Box::pin(future),
        };
        self.sender.send(task).is_ok()
    }

    /// Stop accepting tasks and wait up to `grace` for queued ones to finish.
    pub async fn shutdown(self, grace: Duration) -> SideTaskStats {
        let Self {
            sender,
            mut worker,
        } = self;
        drop(sender);

        match tokio::time::timeout(grace, &mut worker).await {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => {
                tracing::warn!("Side task worker panicked: {e}");
                SideTaskStats::default()
            }
            Err(_) => {
                tracing::warn!("Side tasks still running after {grace:?}; abandoning them");
                worker.abort();
                SideTaskStats {
                    abandoned: true,
                    ..SideTaskStats::default()
                }
            }
        }
    }
}
