//! Dual-source quote fetcher.
//!
//! The fetcher asks its sources, in registration order, for a quote and for
//! a daily series. Both chains run concurrently. A fetch never fails: when
//! every source is exhausted the report carries no quote, a "no data"
//! display string and a synthetic series anchored at the best-known price.
//!
//! ```rust,ignore
//! use stockpal_core::{CacheMode, QuoteFetcherBuilder};
//!
//! let fetcher = QuoteFetcherBuilder::new().with_real_clients().build()?;
//! let report = fetcher.lookup("茅台现在多少钱", CacheMode::Use).await?;
//! println!("{}", report.display);
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::adapters::{SinaAdapter, UpstreamConfig, YahooAdapter};
use crate::cache::{bucket_key, BucketCache, CacheMode};
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::config::Settings;
use crate::data_source::{
    Capability, CapabilitySet, HealthState, HealthStatus, QuoteSource, SourceError, SourceFuture,
};
use crate::fallback::synthetic_series;
use crate::http_client::{HttpClient, NoopHttpClient, ReqwestHttpClient};
use crate::report::{format_quote, no_data_message, QuoteReport};
use crate::resolver::{load_aliases_file, Alias, ResolveError, SymbolResolver};
use crate::retry::RetryPolicy;
use crate::{CoreError, EnvelopeError, ProviderId, Ticker, TradeDate, UtcDateTime};

/// Source snapshot used by the `sources` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SourceSnapshot {
    pub id: ProviderId,
    pub capabilities: CapabilitySet,
    pub health: HealthStatus,
}

impl SourceSnapshot {
    pub fn status_label(self) -> &'static str {
        if !self.health.rate_available {
            return "rate_limited";
        }

        match self.health.state {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}

/// Result of walking one capability's source chain.
struct ChainOutcome<T> {
    data: Option<(ProviderId, T)>,
    chain: Vec<ProviderId>,
    errors: Vec<EnvelopeError>,
}

/// Ordered sources, the resolver and the report cache.
pub struct QuoteFetcher {
    sources: Vec<Arc<dyn QuoteSource>>,
    resolver: SymbolResolver,
    cache: BucketCache<QuoteReport>,
}

impl QuoteFetcher {
    pub fn new(
        sources: Vec<Arc<dyn QuoteSource>>,
        resolver: SymbolResolver,
        cache: BucketCache<QuoteReport>,
    ) -> Self {
        Self {
            sources,
            resolver,
            cache,
        }
    }

    pub fn resolver(&self) -> &SymbolResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &BucketCache<QuoteReport> {
        &self.cache
    }

    /// Registered sources in chain order.
    pub fn source_ids(&self) -> Vec<ProviderId> {
        self.sources.iter().map(|source| source.id()).collect()
    }

    /// Resolves free text and fetches the resulting ticker.
    pub async fn lookup(&self, query: &str, mode: CacheMode) -> Result<QuoteReport, ResolveError> {
        let resolution = self.resolver.resolve(query)?;
        Ok(self.fetch(&resolution.ticker, mode).await)
    }

    pub async fn fetch(&self, ticker: &Ticker, mode: CacheMode) -> QuoteReport {
        let started = Instant::now();
        let key = bucket_key(ticker, UtcDateTime::now());

        if mode.reads() {
            if let Some(mut cached) = self.cache.get(&key).await {
                debug!(ticker = %ticker, key = %key, "serving cached report");
                cached.cache_hit = true;
                cached.latency_ms = elapsed_ms(started);
                return cached;
            }
        }

        let (quote, series) = tokio::join!(
            self.walk_chain(Capability::Quote, ticker, |source| source.quote(ticker)),
            self.walk_chain(Capability::Series, ticker, |source| source.series(ticker)),
        );

        let mut warnings = Vec::new();
        let mut source_chain = dedupe_chain(quote.chain.iter().chain(&series.chain));

        if let Some((provider, _)) = &quote.data {
            if !quote.errors.is_empty() {
                warnings.push(format!(
                    "quote fallback succeeded with '{provider}' after {} failed attempt(s)",
                    quote.errors.len()
                ));
            }
        }

        let mut errors = quote.errors;
        errors.extend(series.errors);

        let (quote_source, quote) = match quote.data {
            Some((provider, quote)) => (Some(provider), Some(quote)),
            None => {
                warn!(ticker = %ticker, "no source returned a quote");
                (None, None)
            }
        };

        let series = match series.data {
            Some((_, series)) => series,
            None => {
                warn!(ticker = %ticker, "no live price history; using synthetic series");
                warnings.push(format!(
                    "no live price history for '{ticker}'; chart uses a synthetic series"
                ));
                source_chain.push(ProviderId::Synthetic);
                let anchor = quote.as_ref().map(|quote| quote.last_price);
                synthetic_series(ticker, anchor, TradeDate::today())
            }
        };

        let display = match &quote {
            Some(quote) => format_quote(quote),
            None => no_data_message(ticker),
        };

        let report = QuoteReport {
            ticker: ticker.clone(),
            quote,
            quote_source,
            series,
            display,
            source_chain,
            warnings,
            errors,
            latency_ms: elapsed_ms(started),
            cache_hit: false,
        };

        if mode.writes() && report.has_quote() {
            let swept = self.cache.clear_expired().await;
            if swept > 0 {
                debug!(swept, "dropped expired cache entries");
            }
            self.cache.put(key, report.clone()).await;
        }

        report
    }

    /// Health and capabilities of every registered source.
    pub async fn snapshots(&self) -> Vec<SourceSnapshot> {
        let mut snapshots = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            snapshots.push(SourceSnapshot {
                id: source.id(),
                capabilities: source.capabilities(),
                health: source.health().await,
            });
        }
        snapshots
    }

    async fn walk_chain<'s, T, F>(
        &'s self,
        capability: Capability,
        ticker: &'s Ticker,
        mut invoke: F,
    ) -> ChainOutcome<T>
    where
        F: FnMut(&'s dyn QuoteSource) -> SourceFuture<'s, T>,
    {
        let mut chain = Vec::new();
        let mut errors = Vec::new();

        for source in &self.sources {
            if !source.capabilities().supports(capability) || !source.supports(ticker) {
                continue;
            }

            let provider = source.id();
            chain.push(provider);

            let health = source.health().await;
            if health.state == HealthState::Unhealthy {
                errors.push(EnvelopeError::from_source(
                    provider,
                    &SourceError::circuit_open(format!(
                        "{provider} is unhealthy; skipping {capability} call"
                    )),
                ));
                continue;
            }

            match invoke(source.as_ref()).await {
                Ok(data) => {
                    debug!(ticker = %ticker, source = %provider, %capability, "source answered");
                    return ChainOutcome {
                        data: Some((provider, data)),
                        chain,
                        errors,
                    };
                }
                Err(error) => {
                    warn!(ticker = %ticker, source = %provider, %capability, error = %error, "source failed");
                    errors.push(EnvelopeError::from_source(provider, &error));
                }
            }
        }

        if chain.is_empty() {
            errors.push(EnvelopeError {
                code: String::from("source.no_candidate"),
                message: format!("no source serves {capability} for '{ticker}'"),
                retryable: Some(false),
                source: None,
            });
        }

        ChainOutcome {
            data: None,
            chain,
            errors,
        }
    }
}

/// Assembles a [`QuoteFetcher`] with real or mock transports.
///
/// | Setting | Source |
/// |---------|--------|
/// | timeouts, retries, cache TTL, base URLs | [`Settings`] |
/// | extra aliases | [`Settings::aliases_path`] plus [`with_extra_aliases`](Self::with_extra_aliases) |
pub struct QuoteFetcherBuilder {
    settings: Settings,
    use_mock: bool,
    http_client: Option<Arc<dyn HttpClient>>,
    extra_aliases: Vec<Alias>,
    retry: Option<RetryPolicy>,
    breaker: CircuitBreakerConfig,
}

impl Default for QuoteFetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteFetcherBuilder {
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            use_mock: false,
            http_client: None,
            extra_aliases: Vec::new(),
            retry: None,
            breaker: CircuitBreakerConfig::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Deterministic offline data from every adapter.
    pub fn with_mock_mode(mut self) -> Self {
        self.use_mock = true;
        self
    }

    pub fn with_real_clients(mut self) -> Self {
        self.use_mock = false;
        self
    }

    /// Shared transport for every adapter, overriding the mock/real choice.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_extra_aliases(mut self, aliases: Vec<Alias>) -> Self {
        self.extra_aliases.extend(aliases);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// # Errors
    ///
    /// Fails when the configured aliases file cannot be read or parsed.
    pub fn build(self) -> Result<QuoteFetcher, CoreError> {
        let http_client: Arc<dyn HttpClient> = match self.http_client {
            Some(client) => client,
            None if self.use_mock => Arc::new(NoopHttpClient),
            None => Arc::new(ReqwestHttpClient::new()),
        };

        let config = UpstreamConfig {
            timeout_ms: self.settings.timeout_ms,
            retry: self
                .retry
                .unwrap_or_else(|| RetryPolicy::new(self.settings.max_retries)),
            breaker: self.breaker,
            rate: None,
        };

        let sources: Vec<Arc<dyn QuoteSource>> = vec![
            Arc::new(
                SinaAdapter::with_config(Arc::clone(&http_client), config)
                    .with_base_url(&self.settings.sina_base_url),
            ),
            Arc::new(
                YahooAdapter::with_config(http_client, config)
                    .with_base_url(&self.settings.yahoo_base_url),
            ),
        ];

        let mut aliases = match &self.settings.aliases_path {
            Some(path) => load_aliases_file(path)?,
            None => Vec::new(),
        };
        aliases.extend(self.extra_aliases);

        Ok(QuoteFetcher::new(
            sources,
            SymbolResolver::with_extra_aliases(aliases),
            BucketCache::new(self.settings.cache_ttl),
        ))
    }
}

fn dedupe_chain<'a>(chain: impl IntoIterator<Item = &'a ProviderId>) -> Vec<ProviderId> {
    let mut seen = HashSet::new();
    chain
        .into_iter()
        .copied()
        .filter(|provider| seen.insert(*provider))
        .collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_fetcher() -> QuoteFetcher {
        QuoteFetcherBuilder::new()
            .with_mock_mode()
            .build()
            .expect("mock fetcher")
    }

    #[tokio::test]
    async fn a_share_quote_comes_from_sina_and_series_from_yahoo() {
        let fetcher = mock_fetcher();
        let report = fetcher
            .lookup("茅台", CacheMode::Bypass)
            .await
            .expect("resolved");

        assert_eq!(report.ticker.as_str(), "600519");
        assert_eq!(report.quote_source, Some(ProviderId::Sina));
        assert_eq!(report.series.source, ProviderId::Yahoo);
        assert_eq!(report.source_chain, vec![ProviderId::Sina, ProviderId::Yahoo]);
        assert!(report.errors.is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn us_ticker_skips_sina_without_error() {
        let fetcher = mock_fetcher();
        let ticker = Ticker::parse("AAPL").expect("ticker");
        let report = fetcher.fetch(&ticker, CacheMode::Bypass).await;

        assert_eq!(report.quote_source, Some(ProviderId::Yahoo));
        assert_eq!(report.source_chain, vec![ProviderId::Yahoo]);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn second_fetch_in_same_bucket_hits_cache() {
        let fetcher = mock_fetcher();
        let ticker = Ticker::parse("0700.HK").expect("ticker");

        let first = fetcher.fetch(&ticker, CacheMode::Use).await;
        let second = fetcher.fetch(&ticker, CacheMode::Use).await;
        let refreshed = fetcher.fetch(&ticker, CacheMode::Refresh).await;

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.quote, second.quote);
        assert!(!refreshed.cache_hit);
    }

    #[tokio::test]
    async fn unresolvable_query_is_an_error() {
        let fetcher = mock_fetcher();
        let err = fetcher
            .lookup("zzzzz", CacheMode::Bypass)
            .await
            .expect_err("no match");
        assert!(matches!(err, ResolveError::NoMatch { .. }));
    }

    #[tokio::test]
    async fn snapshots_list_sources_in_chain_order() {
        let fetcher = mock_fetcher();
        let snapshots = fetcher.snapshots().await;

        let ids = snapshots.iter().map(|snapshot| snapshot.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![ProviderId::Sina, ProviderId::Yahoo]);
        assert!(snapshots.iter().all(|snapshot| snapshot.status_label() == "healthy"));
    }
}
