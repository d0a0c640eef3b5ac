//! HTTP fetcher (spec §4.E).
//!
//! Grounded on the `other_examples` healthcheck crate's `check_endpoint_once`
//! (timing via `Instant`, error classification by `reqwest::Error`
//! predicates) and the teacher's `reqwest::Client` construction style in
//! `crates/integrations/src/airbnb.rs`.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;

use crate::error::PipelineError;
use crate::ssrf::HostResolver;

/// Body truncation ceiling (spec §4.E default).
pub const DEFAULT_MAX_BYTES: usize = 2 * 1024 * 1024;

/// Default per-request timeout when a service has no override.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one fetch attempt.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: u16,
    pub body: Vec<u8>,
    pub latency_ms: u64,
    pub truncated: bool,
}

/// Thin wrapper around a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .expect("reqwest client with default TLS config");
        Self { client }
    }

    pub async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<FetchOutcome, PipelineError> {
        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| PipelineError::BodyRead(e.to_string()))?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let truncated = bytes.len() > max_bytes;
        let body = if truncated {
            bytes[..max_bytes].to_vec()
        } else {
            bytes.to_vec()
        };

        Ok(FetchOutcome {
            status,
            body,
            latency_ms,
            truncated,
        })
    }

    /// As [`fetch`](Self::fetch), but races the request against a
    /// cancellation token so the scheduler's drain deadline can abort an
    /// in-flight poll (spec §5).
    pub async fn fetch_cancellable(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
        cancellation: &tokio_util::sync::CancellationToken,
    ) -> Result<FetchOutcome, PipelineError> {
        tokio::select! {
            result = self.fetch(url, timeout, max_bytes) => result,
            _ = cancellation.cancelled() => Err(PipelineError::Cancelled),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_request_error(e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::Timeout
    } else if e.is_connect() {
        PipelineError::ConnectRefused
    } else if e.is_body() || e.is_decode() {
        PipelineError::BodyRead(e.to_string())
    } else {
        PipelineError::TlsFailed(e.to_string())
    }
}

/// System-resolver implementation of [`HostResolver`] used outside tests.
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    pub fn from_system_conf() -> Result<Self, PipelineError> {
        let inner = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| PipelineError::DnsFailed(e.to_string()))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Vec<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return vec![ip];
        }
        match self.inner.lookup_ip(host).await {
            Ok(lookup) => lookup.iter().collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_and_measures_latency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new();
        let outcome = fetcher
            .fetch(&format!("{}/health", server.uri()), DEFAULT_TIMEOUT, DEFAULT_MAX_BYTES)
            .await
            .unwrap();

        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.body, b"[]");
        assert!(!outcome.truncated);
    }

    #[tokio::test]
    async fn reports_non_2xx_without_erroring() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new();
        let outcome = fetcher
            .fetch(&format!("{}/health", server.uri()), DEFAULT_TIMEOUT, DEFAULT_MAX_BYTES)
            .await
            .unwrap();

        assert_eq!(outcome.status, 503);
    }

    #[tokio::test]
    async fn truncates_oversized_body() {
        let server = MockServer::start().await;
        let big_body = "x".repeat(64);
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string(big_body))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new();
        let outcome = fetcher
            .fetch(&format!("{}/health", server.uri()), DEFAULT_TIMEOUT, 16)
            .await
            .unwrap();

        assert!(outcome.truncated);
        assert_eq!(outcome.body.len(), 16);
    }
}
