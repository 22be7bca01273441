//! # Stockpal Core
//!
//! Symbol resolution and resilient quote retrieval for the stockpal
//! assistant.
//!
//! ## Overview
//!
//! This crate provides the building blocks behind the `stockpal` CLI:
//!
//! - **Symbol resolution** from free-text Chinese or English queries
//! - **Dual-source quote fetching** (Sina primary, Yahoo secondary) that never fails
//! - **Synthetic fallback series** when no live history is available
//! - **Trend analysis**, **price watches** and **SVG charts** over a fetched series
//! - **Response envelope** with metadata and structured errors
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Sina and Yahoo adapters plus the shared resilient upstream |
//! | [`analysis`] | Moving averages and trend classification |
//! | [`cache`] | Hour-bucket TTL cache for fetch reports |
//! | [`chart`] | SVG rendering of a price series |
//! | [`circuit_breaker`] | Per-source circuit breaker |
//! | [`config`] | Settings with environment overrides |
//! | [`data_source`] | Quote source trait and error types |
//! | [`domain`] | Domain models (Ticker, Quote, PriceSeries) |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`fallback`] | Deterministic synthetic price series |
//! | [`fetcher`] | Source chain, caching and report assembly |
//! | [`http_client`] | HTTP client abstraction |
//! | [`report`] | Fetch report and its markdown rendering |
//! | [`resolver`] | Query to ticker resolution |
//! | [`retry`] | Retry policy with exponential backoff |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Per-source rate gate |
//! | [`watch`] | Target-price watches |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stockpal_core::{CacheMode, QuoteFetcherBuilder, TrendAnalysis};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = QuoteFetcherBuilder::new().with_real_clients().build()?;
//!
//!     let report = fetcher.lookup("腾讯", CacheMode::Use).await?;
//!     println!("{}", report.display);
//!
//!     let analysis = TrendAnalysis::from_series(&report.series)?;
//!     println!("{}", analysis.summary());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │  CLI / User     │────▶│ Symbol Resolver  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Quote Fetcher  │────▶│ Bucket Cache     │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Sina / Yahoo    │────▶│ Upstream guard   │
//! │ (QuoteSource)   │     │ (breaker, retry) │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       ▼
//!          │              ┌──────────────────┐
//!          │              │ HTTP Client      │
//!          │              │ (reqwest/noop)   │
//!          ▼              └──────────────────┘
//! ┌─────────────────┐
//! │ Synthetic       │
//! │ fallback series │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Fetching never fails; adapter failures are recorded in the report:
//!
//! ```rust
//! use stockpal_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited => "slow down",
//!         SourceErrorKind::Unavailable => "try the next source",
//!         SourceErrorKind::NotFound => "unknown ticker",
//!         _ => "bad upstream response",
//!     }
//! }
//!
//! assert_eq!(describe(&SourceError::not_found("unknown")), "unknown ticker");
//! ```

pub mod adapters;
pub mod analysis;
pub mod cache;
pub mod chart;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod fallback;
pub mod fetcher;
pub mod http_client;
pub mod report;
pub mod resolver;
pub mod retry;
pub mod source;
pub mod throttling;
pub mod watch;

// Adapter implementations
pub use adapters::{SinaAdapter, Upstream, UpstreamConfig, YahooAdapter};

// Analysis and charts
pub use analysis::{moving_average, Trend, TrendAnalysis, STOP_LOSS_RATIO};
pub use chart::{render_svg, ChartError, DEFAULT_CHART_SIZE};

// Caching
pub use cache::{bucket_key, BucketCache, CacheMode};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Configuration
pub use config::{ConfigError, Settings};

// Data source trait and types
pub use data_source::{
    Capability, CapabilitySet, HealthState, HealthStatus, QuoteSource, SourceError,
    SourceErrorKind, SourceFuture,
};

// Domain models
pub use domain::{
    Market, PricePoint, PriceSeries, Quote, SeriesOrigin, Ticker, TradeDate, UtcDateTime,
    MAX_SERIES_POINTS,
};

// Envelope types
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};

// Error types
pub use error::{CoreError, ValidationError};

// Fetching
pub use fallback::synthetic_series;
pub use fetcher::{QuoteFetcher, QuoteFetcherBuilder, SourceSnapshot};
pub use report::{format_quote, no_data_message, QuoteReport};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient};

// Resolution
pub use resolver::{Alias, MatchKind, PatternKind, Resolution, ResolveError, SymbolResolver};

// Retry logic
pub use retry::{Backoff, RetryPolicy};

// Source identifiers
pub use source::ProviderId;

// Throttling
pub use throttling::{RateGate, RatePolicy};

// Watches
pub use watch::{watch, PriceWatch, WatchDirection, WatchOutcome, WatchStatus, MIN_POLL_INTERVAL};
