//! Quote source trait and its error and health types.
//!
//! Every upstream (Sina, Yahoo) implements [`QuoteSource`]. The fetcher only
//! talks to sources through this trait, which keeps the fallback chain
//! independent of any single wire format.
//!
//! | Capability | Method | Response |
//! |------------|--------|----------|
//! | Quote | [`QuoteSource::quote`] | [`Quote`] |
//! | Series | [`QuoteSource::series`] | [`PriceSeries`] |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{PriceSeries, ProviderId, Quote, Ticker};

/// Requested data kind, used for capability checks and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Quote,
    Series,
}

impl Capability {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Series => "series",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a source can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub quote: bool,
    pub series: bool,
}

impl CapabilitySet {
    pub const fn new(quote: bool, series: bool) -> Self {
        Self { quote, series }
    }

    pub const fn supports(self, capability: Capability) -> bool {
        match capability {
            Capability::Quote => self.quote,
            Capability::Series => self.series,
        }
    }

    pub fn supported(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(2);
        if self.quote {
            values.push("quote");
        }
        if self.series {
            values.push("series");
        }
        values
    }
}

/// Health state reported by the `sources` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Runtime source health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    pub rate_available: bool,
}

impl HealthStatus {
    pub const fn new(state: HealthState, rate_available: bool) -> Self {
        Self {
            state,
            rate_available,
        }
    }

    pub const fn healthy() -> Self {
        Self::new(HealthState::Healthy, true)
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Unsupported,
    Unavailable,
    RateLimited,
    InvalidRequest,
    NotFound,
    Parse,
    Internal,
}

/// Structured source error consumed by the fetcher's fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unsupported(capability: Capability, ticker: &Ticker) -> Self {
        Self {
            kind: SourceErrorKind::Unsupported,
            message: format!("{capability} for '{ticker}' is not served by this source"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    /// Unavailable, and not retryable while the circuit stays open.
    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Parse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unsupported => "source.unsupported",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Parse => "source.parse",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Boxed future returned by [`QuoteSource`] methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Upstream quote provider contract.
///
/// Implementations must be `Send + Sync`; the fetcher shares them across
/// concurrent quote and series requests.
pub trait QuoteSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn capabilities(&self) -> CapabilitySet;

    /// Whether this source can serve `ticker` at all. The fetcher skips
    /// sources that return `false` without recording an error.
    fn supports(&self, ticker: &Ticker) -> bool;

    /// Fetches the latest quote.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the upstream is unreachable, rate limited,
    /// does not know the ticker, or answers with an unparseable payload.
    fn quote<'a>(&'a self, ticker: &'a Ticker) -> SourceFuture<'a, Quote>;

    /// Fetches up to a month of daily closes.
    fn series<'a>(&'a self, ticker: &'a Ticker) -> SourceFuture<'a, PriceSeries>;

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>>;
}
