//! Transport seam for downloading report pages and logs.
//!
//! Production code uses `HttpTransport` (reqwest). Tests use
//! `FakeTransport` with scripted responses and call accounting.

use crate::config::FetchSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Why a single fetch attempt failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Empty response body")]
    EmptyBody,
}

impl TransportError {
    /// Worth another attempt?
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout | Self::EmptyBody => true,
            Self::Status(code) => *code == 429 || (500..600).contains(code),
        }
    }
}

/// Fetch a URL as text
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<String, TransportError>;
}

// ============================================================================
// HTTP Transport (Production)
// ============================================================================

/// reqwest-backed transport with a per-request timeout
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    fn classify_error(err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else if let Some(status) = err.status() {
            TransportError::Status(status.as_u16())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> std::result::Result<String, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify_error(&e))?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::classify_error(&e))?;

        if body.is_empty() {
            return Err(TransportError::EmptyBody);
        }

        Ok(body)
    }
}

// ============================================================================
// Fake Transport (Testing)
// ============================================================================

/// Scripted transport for deterministic tests.
///
/// Each URL has a queue of responses; every call consumes the front one
/// except the last, which repeats. Unscripted URLs answer HTTP 404.
#[derive(Default)]
pub struct FakeTransport {
    scripts: Mutex<HashMap<String, VecDeque<std::result::Result<String, TransportError>>>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every call for `delay` so that requests overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Always answer `url` with `body`
    pub fn respond(self, url: &str, body: &str) -> Self {
        self.script(url, vec![Ok(body.to_string())])
    }

    /// Answer `url` with the given sequence; the last entry repeats
    pub fn script(
        self,
        url: &str,
        responses: Vec<std::result::Result<String, TransportError>>,
    ) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.insert(url.to_string(), responses.into_iter().collect());
        }
        self
    }

    /// Fail `url` `times` times with `error`, then answer `body`
    pub fn flaky(self, url: &str, times: usize, error: TransportError, body: &str) -> Self {
        let mut responses: Vec<_> = (0..times).map(|_| Err(error.clone())).collect();
        responses.push(Ok(body.to_string()));
        self.script(url, responses)
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of fetches issued for `url`
    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().map(|c| c.values().sum()).unwrap_or(0)
    }

    /// Highest number of fetches that were running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, url: &str) -> std::result::Result<String, TransportError> {
        let Ok(mut scripts) = self.scripts.lock() else {
            return Err(TransportError::Network("script lock poisoned".to_string()));
        };
        match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or(Err(TransportError::Status(404))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or(Err(TransportError::Status(404))),
            None => Err(TransportError::Status(404)),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, url: &str) -> std::result::Result<String, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(url.to_string()).or_insert(0) += 1;
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        let response = self.next_response(url);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}
