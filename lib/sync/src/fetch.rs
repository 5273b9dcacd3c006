//! The HTTP fetch abstraction every network-touching component goes
//! through. Production uses [`ReqwestFetcher`]; tests use [`MockFetcher`].
//! Kept transport-level (status code + byte stream) so each caller maps
//! outcomes onto the `SyncError` variants appropriate to what it fetched
//! (a version manifest vs. a download file).

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>;

#[derive(Debug, Clone)]
pub enum FetchError {
    Timeout,
    Transport(String),
}

pub struct FetchResponse {
    pub status: u16,
    pub body: ByteStream,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        ReqwestFetcher {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let send = self.client.get(url).send();
        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| FetchError::Transport(e.to_string())));

        Ok(FetchResponse {
            status,
            body: Box::pin(body),
        })
    }
}

/// Drains a [`ByteStream`] into a single buffer, applying `timeout` to each
/// individual chunk read (matching the design's "the timeout applies to
/// each read" rule for both the manifest fetch and download file bodies).
pub async fn collect_timed(mut body: ByteStream, timeout: Duration) -> Result<Vec<u8>, FetchError> {
    let mut buf = Vec::new();
    loop {
        match tokio::time::timeout(timeout, body.next()).await {
            Ok(Some(Ok(chunk))) => buf.extend_from_slice(&chunk),
            Ok(Some(Err(e))) => return Err(e),
            Ok(None) => return Ok(buf),
            Err(_) => return Err(FetchError::Timeout),
        }
    }
}

/// A canned response used by [`MockFetcher`].
#[derive(Clone)]
pub enum MockResponse {
    Ok(u16, Vec<u8>),
    Timeout,
    Transport(String),
}

/// An in-memory [`Fetcher`] keyed by exact URL, for unit and integration
/// tests exercising the sync pipeline without real network access.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, MockResponse>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), MockResponse::Ok(status, body.into()));
    }

    pub fn set_timeout(&self, url: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), MockResponse::Timeout);
    }

    pub fn set_transport_error(&self, url: impl Into<String>, reason: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), MockResponse::Transport(reason.into()));
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<FetchResponse, FetchError> {
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(MockResponse::Transport(format!("no mock response for {url}")));

        match response {
            MockResponse::Ok(status, body) => {
                let stream = futures::stream::once(async move { Ok(Bytes::from(body)) });
                Ok(FetchResponse {
                    status,
                    body: Box::pin(stream),
                })
            }
            MockResponse::Timeout => Err(FetchError::Timeout),
            MockResponse::Transport(reason) => Err(FetchError::Transport(reason)),
        }
    }
}
