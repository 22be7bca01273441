//! Upstream quote adapters.
//!
//! | Adapter | Quote | Series | Markets |
//! |---------|-------|--------|---------|
//! | [`SinaAdapter`] | yes | no | Shanghai, Shenzhen, Hong Kong |
//! | [`YahooAdapter`] | yes | yes | all |
//!
//! Both adapters send their HTTP calls through an [`Upstream`] guard that
//! applies the rate gate, the circuit breaker and the retry policy in that
//! order. With a mock transport ([`HttpClient::is_mock`]) they parse
//! deterministic offline payloads in their own wire format instead.

mod sina;
mod yahoo;

pub use sina::{parse_sina_payload, SinaAdapter, SINA_BASE_URL, SINA_REFERER};
pub use yahoo::{parse_chart_quote, parse_chart_series, YahooAdapter, YAHOO_BASE_URL};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::data_source::{HealthStatus, SourceError};
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::retry::RetryPolicy;
use crate::throttling::{RateGate, RatePolicy};
use crate::{ProviderId, Ticker, ValidationError};

/// Resilience knobs shared by every adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpstreamConfig {
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
    pub breaker: CircuitBreakerConfig,
    pub rate: Option<RatePolicy>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetryPolicy::default(),
            breaker: CircuitBreakerConfig::default(),
            rate: None,
        }
    }
}

/// Rate gate, circuit breaker and retry policy around one HTTP transport.
pub struct Upstream {
    provider: ProviderId,
    http_client: Arc<dyn HttpClient>,
    breaker: CircuitBreaker,
    gate: RateGate,
    rate_refused: AtomicBool,
    retry: RetryPolicy,
    timeout_ms: u64,
}

impl Upstream {
    pub fn new(provider: ProviderId, http_client: Arc<dyn HttpClient>, config: UpstreamConfig) -> Self {
        Self {
            provider,
            http_client,
            breaker: CircuitBreaker::new(config.breaker),
            gate: RateGate::new(config.rate.unwrap_or(RatePolicy::default_for(provider))),
            rate_refused: AtomicBool::new(false),
            retry: config.retry,
            timeout_ms: config.timeout_ms,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.http_client.is_mock()
    }

    /// Breaker health plus whether the last call found the rate gate shut.
    pub fn health(&self) -> HealthStatus {
        HealthStatus::new(
            self.breaker.health(),
            !self.rate_refused.load(Ordering::Relaxed),
        )
    }

    /// GETs `request` and returns the body of a 2xx response.
    pub async fn fetch(&self, request: HttpRequest) -> Result<String, SourceError> {
        let request = request.with_timeout_ms(self.timeout_ms);
        self.retry
            .run(self.provider.as_str(), || self.attempt(request.clone()))
            .await
    }

    async fn attempt(&self, request: HttpRequest) -> Result<String, SourceError> {
        let provider = self.provider;
        let admitted = self.gate.try_acquire();
        self.rate_refused.store(!admitted, Ordering::Relaxed);
        if !admitted {
            return Err(SourceError::rate_limited(format!(
                "{provider} request budget exhausted"
            )));
        }
        if !self.breaker.allow_request() {
            let wait_ms = self
                .breaker
                .remaining_cool_down()
                .map_or(0, |left| left.as_millis());
            return Err(SourceError::circuit_open(format!(
                "{provider} circuit breaker is open; skipping upstream call for {wait_ms}ms"
            )));
        }

        debug!(source = %provider, url = %request.url, "upstream call");
        let response = self.http_client.execute(request).await.map_err(|error| {
            self.breaker.record_failure();
            if error.retryable() {
                SourceError::unavailable(format!("{provider} transport error: {}", error.message()))
            } else {
                SourceError::invalid_request(format!(
                    "{provider} transport error: {}",
                    error.message()
                ))
            }
        })?;

        match response.status {
            status if (200..300).contains(&status) => {
                self.breaker.record_success();
                Ok(response.body)
            }
            404 => {
                self.breaker.record_success();
                Err(SourceError::not_found(format!("{provider} returned status 404")))
            }
            429 => {
                self.breaker.record_failure();
                Err(SourceError::rate_limited(format!("{provider} returned status 429")))
            }
            status if status >= 500 || status == 408 => {
                self.breaker.record_failure();
                Err(SourceError::unavailable(format!(
                    "{provider} returned status {status}"
                )))
            }
            status => {
                self.breaker.record_success();
                Err(SourceError::invalid_request(format!(
                    "{provider} returned status {status}"
                )))
            }
        }
    }
}

/// Small deterministic hash used by mock payloads.
pub(crate) fn ticker_seed(ticker: &Ticker) -> u64 {
    ticker
        .as_str()
        .bytes()
        .fold(0_u64, |acc, byte| acc.wrapping_mul(33).wrapping_add(u64::from(byte)))
}

pub(crate) fn validation_to_error(error: ValidationError) -> SourceError {
    SourceError::parse(error.to_string())
}
