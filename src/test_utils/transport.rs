//! Scripted in-memory transport.

use crate::core::SyncError;
use crate::transport::Transport;
use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// What the mock answers for one request.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Body(Vec<u8>),
    /// Non-success HTTP status
    Status(u16),
    /// Connection-level failure
    NetworkError(String),
    /// Never answers within any sane attempt timeout
    Hang,
}

#[derive(Debug, Default)]
struct MockState {
    scripted: HashMap<String, VecDeque<MockResponse>>,
    fixed: HashMap<String, MockResponse>,
    requests: Vec<String>,
}

/// Transport answering from a per-URL script and recording every request.
///
/// Scripted responses are consumed in order. Once a URL's script runs out,
/// its fixed response applies, and URLs with neither answer 404.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Always answer `url` with `body`.
    pub fn respond(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.respond_with(url, MockResponse::Body(body.into()));
    }

    pub fn respond_with(&self, url: &str, response: MockResponse) {
        self.lock().fixed.insert(url.to_string(), response);
    }

    /// Queue responses for successive requests to `url`.
    pub fn script(&self, url: &str, responses: Vec<MockResponse>) {
        self.lock().scripted.entry(url.to_string()).or_default().extend(responses);
    }

    /// Every requested URL, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    #[must_use]
    pub fn request_count(&self, url: &str) -> usize {
        self.lock().requests.iter().filter(|r| r.as_str() == url).count()
    }

    fn next_response(&self, url: &str) -> MockResponse {
        let mut state = self.lock();
        state.requests.push(url.to_string());
        if let Some(response) = state.scripted.get_mut(url).and_then(VecDeque::pop_front) {
            return response;
        }
        state.fixed.get(url).cloned().unwrap_or(MockResponse::Status(404))
    }

    async fn answer(&self, url: &str) -> Result<Vec<u8>> {
        match self.next_response(url) {
            MockResponse::Body(body) => Ok(body),
            MockResponse::Status(status) => Err(SyncError::HttpStatus {
                url: url.to_string(),
                status,
            }
            .into()),
            MockResponse::NetworkError(reason) => Err(SyncError::NetworkError {
                url: url.to_string(),
                reason,
            }
            .into()),
            MockResponse::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(SyncError::Timeout {
                    url: url.to_string(),
                    seconds: 3600,
                }
                .into())
            }
        }
    }
}

impl Transport for MockTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.answer(url).await
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let body = self.answer(url).await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}
