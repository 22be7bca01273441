//! Behavior-driven tests for the dual-source quote fetcher
//!
//! These tests verify HOW the fetcher degrades when upstreams misbehave:
//! primary timeouts, unknown symbols, total outages, and cached repeats.
//! Every upstream is an in-memory transport routed by URL.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stockpal_core::{
    no_data_message, CacheMode, CircuitBreakerConfig, HealthState, HttpClient, HttpError,
    HttpRequest, HttpResponse, ProviderId, QuoteFetcher, QuoteFetcherBuilder, RetryPolicy,
    SeriesOrigin, Settings, Ticker,
};

const MAOTAI: &str = "var hq_str_sh600519=\"贵州茅台,1705.000,1700.010,1712.500,1718.880,1698.000,1712.490,1712.500,2630217,4497183840.000,100,1712.490,200,1712.480,100,1712.000,300,1711.990,100,1711.880,100,1712.500,200,1712.660,100,1712.700,100,1712.880,100,1713.000,2024-01-05,15:00:01,00,\";\n";

const EMPTY_SINA: &str = "var hq_str_sh600519=\"\";\n";

const CHART: &str = r#"{
    "chart": {
        "result": [{
            "meta": {
                "currency": "CNY",
                "symbol": "600519.SS",
                "regularMarketPrice": 1712.5,
                "chartPreviousClose": 1690.0,
                "longName": "Kweichow Moutai Co., Ltd.",
                "regularMarketTime": 1704438001,
                "gmtoffset": 28800
            },
            "timestamp": [1704159000, 1704245400, 1704331800, 1704418200],
            "indicators": {"quote": [{"close": [1685.0, 1700.0, null, 1712.5]}]}
        }],
        "error": null
    }
}"#;

#[derive(Clone)]
enum Reply {
    Body(&'static str),
    Status(u16),
    Timeout,
    /// Times out on the first call, then answers with the body.
    TimeoutOnce(&'static str),
}

impl Reply {
    fn for_call(&self, previous_calls: u32) -> Reply {
        match self {
            Reply::TimeoutOnce(_) if previous_calls == 0 => Reply::Timeout,
            Reply::TimeoutOnce(body) => Reply::Body(body),
            other => other.clone(),
        }
    }
}

/// Transport that answers by URL fragment and counts calls per upstream.
struct RoutedHttpClient {
    sina: Reply,
    yahoo: Reply,
    sina_calls: AtomicU32,
    yahoo_calls: AtomicU32,
}

impl RoutedHttpClient {
    fn new(sina: Reply, yahoo: Reply) -> Arc<Self> {
        Arc::new(Self {
            sina,
            yahoo,
            sina_calls: AtomicU32::new(0),
            yahoo_calls: AtomicU32::new(0),
        })
    }

    fn total_calls(&self) -> u32 {
        self.sina_calls.load(Ordering::SeqCst) + self.yahoo_calls.load(Ordering::SeqCst)
    }
}

impl HttpClient for RoutedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let reply = if request.url.contains("/list=") {
            self.sina.for_call(self.sina_calls.fetch_add(1, Ordering::SeqCst))
        } else if request.url.contains("/v8/finance/chart/") {
            self.yahoo.for_call(self.yahoo_calls.fetch_add(1, Ordering::SeqCst))
        } else {
            Reply::Status(404)
        };

        Box::pin(async move {
            match reply {
                Reply::Body(body) => Ok(HttpResponse::ok(body)),
                Reply::Status(status) => Ok(HttpResponse::with_status(status, "")),
                Reply::Timeout | Reply::TimeoutOnce(_) => {
                    Err(HttpError::timeout("request timed out"))
                }
            }
        })
    }
}

fn fetcher(client: Arc<RoutedHttpClient>) -> QuoteFetcher {
    QuoteFetcherBuilder::new()
        .with_http_client(client)
        .with_retry_policy(RetryPolicy::fixed(Duration::from_millis(1), 1))
        .build()
        .expect("fetcher builds")
}

fn maotai() -> Ticker {
    Ticker::parse("600519").expect("ticker")
}

// =============================================================================
// Fetcher: Primary Source Healthy
// =============================================================================

#[tokio::test]
async fn when_both_sources_answer_system_uses_sina_quote_and_yahoo_series() {
    // Given: Both upstreams answer with valid payloads
    let client = RoutedHttpClient::new(Reply::Body(MAOTAI), Reply::Body(CHART));
    let fetcher = fetcher(client);

    // When: The fetcher is asked for Maotai
    let report = fetcher.fetch(&maotai(), CacheMode::Bypass).await;

    // Then: The quote comes from Sina and the history from Yahoo
    assert_eq!(report.quote_source, Some(ProviderId::Sina));
    let quote = report.quote.as_ref().expect("quote present");
    assert_eq!(quote.display_name, "贵州茅台");
    assert_eq!(quote.last_price, 1712.5);
    assert_eq!(report.series.origin, SeriesOrigin::Live);
    assert_eq!(report.series.closes().collect::<Vec<_>>(), vec![1685.0, 1700.0, 1712.5]);
    assert_eq!(report.source_chain, vec![ProviderId::Sina, ProviderId::Yahoo]);
    assert!(report.errors.is_empty());
    assert!(report.warnings.is_empty());
    assert!(report.display.contains("贵州茅台 (600519)"));
}

// =============================================================================
// Fetcher: Primary Source Failing
// =============================================================================

#[tokio::test]
async fn when_primary_times_out_system_still_returns_secondary_quote_and_series() {
    // Given: Sina times out on every attempt, Yahoo is healthy
    let client = RoutedHttpClient::new(Reply::Timeout, Reply::Body(CHART));
    let fetcher = fetcher(Arc::clone(&client));

    // When: The fetcher is asked for Maotai
    let report = fetcher.fetch(&maotai(), CacheMode::Bypass).await;

    // Then: The timeout was retried once and then recorded
    assert_eq!(client.sina_calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].source, Some(ProviderId::Sina));
    assert_eq!(report.errors[0].code, "source.unavailable");
    assert_eq!(report.errors[0].retryable, Some(true));

    // And: Yahoo served both the quote and a valid live series
    assert_eq!(report.quote_source, Some(ProviderId::Yahoo));
    assert_eq!(report.current_price(), Some(1712.5));
    assert_eq!(report.series.source, ProviderId::Yahoo);
    assert_eq!(report.series.len(), 3);
    assert!(report
        .warnings
        .iter()
        .any(|warning| warning.contains("fallback succeeded with 'yahoo' after 1 failed attempt(s)")));
}

#[tokio::test]
async fn when_primary_does_not_know_the_symbol_system_falls_back_without_retrying() {
    // Given: Sina answers with an empty payload
    let client = RoutedHttpClient::new(Reply::Body(EMPTY_SINA), Reply::Body(CHART));
    let fetcher = fetcher(Arc::clone(&client));

    // When
    let report = fetcher.fetch(&maotai(), CacheMode::Bypass).await;

    // Then: Not-found is final, so Sina was called once
    assert_eq!(client.sina_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.errors[0].code, "source.not_found");
    assert_eq!(report.errors[0].retryable, Some(false));
    assert_eq!(report.quote_source, Some(ProviderId::Yahoo));
}

#[tokio::test]
async fn when_primary_breaker_cools_down_system_tries_primary_again() {
    // Given: A breaker that opens on one failure and cools down after 100ms
    let client = RoutedHttpClient::new(Reply::TimeoutOnce(MAOTAI), Reply::Body(CHART));
    let fetcher = QuoteFetcherBuilder::new()
        .with_http_client(Arc::<RoutedHttpClient>::clone(&client))
        .with_retry_policy(RetryPolicy::fixed(Duration::from_millis(1), 1))
        .with_circuit_breaker(CircuitBreakerConfig {
            failure_threshold: 1,
            cool_down: Duration::from_millis(100),
        })
        .build()
        .expect("fetcher builds");

    // When: Sina times out once and its circuit opens
    let first = fetcher.fetch(&maotai(), CacheMode::Bypass).await;
    assert_eq!(first.quote_source, Some(ProviderId::Yahoo));
    assert_eq!(fetcher.snapshots().await[0].health.state, HealthState::Unhealthy);

    // And: The cool-down passes before the next fetch
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(fetcher.snapshots().await[0].health.state, HealthState::Degraded);
    let second = fetcher.fetch(&maotai(), CacheMode::Bypass).await;

    // Then: Sina is called again and serves the quote
    assert_eq!(client.sina_calls.load(Ordering::SeqCst), 2);
    assert_eq!(second.quote_source, Some(ProviderId::Sina));
    assert!(second.errors.is_empty());
    assert_eq!(fetcher.snapshots().await[0].health.state, HealthState::Healthy);
}

#[tokio::test]
async fn when_history_is_unavailable_system_anchors_fallback_series_at_quote() {
    // Given: Sina is healthy but Yahoo does not know the symbol
    let client = RoutedHttpClient::new(Reply::Body(MAOTAI), Reply::Status(404));
    let fetcher = fetcher(client);

    // When
    let report = fetcher.fetch(&maotai(), CacheMode::Bypass).await;

    // Then: The quote is live and the series is synthetic, ending at the quote price
    assert_eq!(report.quote_source, Some(ProviderId::Sina));
    assert!(report.series.is_synthetic());
    assert_eq!(report.series.last().map(|point| point.close), Some(1712.5));
    assert_eq!(
        report.source_chain,
        vec![ProviderId::Sina, ProviderId::Yahoo, ProviderId::Synthetic]
    );
    assert!(!report.is_complete());
    assert!(report.errors.iter().all(|error| error.source == Some(ProviderId::Yahoo)));
}

// =============================================================================
// Fetcher: Total Outage
// =============================================================================

#[tokio::test]
async fn when_no_source_has_data_system_returns_well_formed_no_data_report() {
    // Given: Both upstreams are down
    let client = RoutedHttpClient::new(Reply::Status(503), Reply::Status(503));
    let fetcher = fetcher(Arc::clone(&client));
    let ticker = maotai();

    // When
    let report = fetcher.fetch(&ticker, CacheMode::Use).await;

    // Then: No quote, the no-data message, and one error per failed call
    assert!(report.quote.is_none());
    assert_eq!(report.quote_source, None);
    assert_eq!(report.display, no_data_message(&ticker));
    assert!(report.errors.len() >= 3);
    assert!(report.errors.iter().any(|error| error.source == Some(ProviderId::Sina)));
    assert!(report.errors.iter().any(|error| error.source == Some(ProviderId::Yahoo)));

    // And: The quote and series chains shared one retried chart request
    assert_eq!(client.yahoo_calls.load(Ordering::SeqCst), 2);

    // And: The fallback series is non-empty and strictly chronological
    assert!(report.series.is_synthetic());
    assert!(!report.series.is_empty());
    for pair in report.series.points().windows(2) {
        assert!(pair[0].date < pair[1].date, "series must be ordered by date");
    }
    assert!(report.series.closes().all(|close| close > 0.0));
    assert_eq!(report.source_chain.last(), Some(&ProviderId::Synthetic));
}

#[tokio::test]
async fn when_no_source_has_data_system_does_not_cache_the_failure() {
    let client = RoutedHttpClient::new(Reply::Status(404), Reply::Status(404));
    let fetcher = fetcher(client);

    let first = fetcher.fetch(&maotai(), CacheMode::Use).await;
    let second = fetcher.fetch(&maotai(), CacheMode::Use).await;

    assert!(!first.cache_hit);
    assert!(!second.cache_hit);
    assert_eq!(fetcher.cache().len().await, 0);
}

// =============================================================================
// Fetcher: Caching
// =============================================================================

#[tokio::test]
async fn when_same_ticker_is_fetched_twice_within_the_hour_system_serves_cache() {
    // Given: Healthy upstreams
    let client = RoutedHttpClient::new(Reply::Body(MAOTAI), Reply::Body(CHART));
    let fetcher = fetcher(Arc::clone(&client));

    // When: The same ticker is fetched twice
    let first = fetcher.fetch(&maotai(), CacheMode::Use).await;
    let calls_after_first = client.total_calls();
    let second = fetcher.fetch(&maotai(), CacheMode::Use).await;

    // Then: The second report is served from cache without network calls
    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(client.total_calls(), calls_after_first);
    assert_eq!(first.quote, second.quote);
    assert_eq!(first.series, second.series);
}

#[tokio::test]
async fn when_cache_is_bypassed_system_always_calls_upstreams() {
    let client = RoutedHttpClient::new(Reply::Body(MAOTAI), Reply::Body(CHART));
    let fetcher = fetcher(Arc::clone(&client));

    fetcher.fetch(&maotai(), CacheMode::Use).await;
    let calls_after_first = client.total_calls();
    let bypassed = fetcher.fetch(&maotai(), CacheMode::Bypass).await;
    let refreshed = fetcher.fetch(&maotai(), CacheMode::Refresh).await;

    assert!(!bypassed.cache_hit);
    assert!(!refreshed.cache_hit);
    assert_eq!(client.total_calls(), calls_after_first * 3);
}

#[tokio::test]
async fn when_expired_entries_linger_system_sweeps_them_on_write() {
    // Given: A cache whose entries expire after 30ms
    let fetcher = QuoteFetcherBuilder::new()
        .with_mock_mode()
        .with_settings(Settings {
            cache_ttl: Duration::from_millis(30),
            ..Settings::default()
        })
        .build()
        .expect("fetcher builds");

    // When: One ticker is cached, expires, and another is stored
    fetcher.fetch(&maotai(), CacheMode::Use).await;
    assert_eq!(fetcher.cache().len().await, 1);
    tokio::time::sleep(Duration::from_millis(60)).await;
    fetcher
        .fetch(&Ticker::parse("AAPL").expect("ticker"), CacheMode::Use)
        .await;

    // Then: Only the fresh entry remains
    assert_eq!(fetcher.cache().len().await, 1);
}

// =============================================================================
// Fetcher: Shared Chart Requests
// =============================================================================

#[tokio::test]
async fn when_one_source_serves_quote_and_series_system_requests_the_chart_once() {
    // Given: A US ticker, which only Yahoo serves
    let client = RoutedHttpClient::new(Reply::Status(500), Reply::Body(CHART));
    let fetcher = fetcher(Arc::clone(&client));
    let ticker = Ticker::parse("AAPL").expect("ticker");

    // When: One fetch needs both the quote and the series
    let report = fetcher.fetch(&ticker, CacheMode::Bypass).await;

    // Then: A single chart request fed both
    assert_eq!(report.quote_source, Some(ProviderId::Yahoo));
    assert_eq!(report.series.source, ProviderId::Yahoo);
    assert_eq!(client.yahoo_calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.sina_calls.load(Ordering::SeqCst), 0);

    // And: The next fetch goes upstream again
    fetcher.fetch(&ticker, CacheMode::Bypass).await;
    assert_eq!(client.yahoo_calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Fetcher: Mock Mode
// =============================================================================

#[tokio::test]
async fn when_mock_mode_is_enabled_system_serves_complete_offline_reports() {
    let fetcher = QuoteFetcherBuilder::new()
        .with_mock_mode()
        .build()
        .expect("fetcher builds");

    for query in ["茅台", "腾讯", "苹果"] {
        let report = fetcher.lookup(query, CacheMode::Bypass).await.expect("resolves");
        assert!(report.is_complete(), "mock report for '{query}' should be complete");
        assert!(report.errors.is_empty());
    }
}
