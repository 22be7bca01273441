use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;

use super::{ticker_seed, validation_to_error, Upstream, UpstreamConfig};
use crate::data_source::{
    Capability, CapabilitySet, HealthStatus, QuoteSource, SourceError, SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{PricePoint, PriceSeries, ProviderId, Quote, Ticker, TradeDate, UtcDateTime};

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

const YAHOO_REFERER: &str = "https://finance.yahoo.com/";
const MOCK_DAYS: i64 = 30;
/// How long one chart payload may serve the other half of a fetch.
const SHARE_WINDOW: Duration = Duration::from_secs(2);

type ChartCell = OnceCell<Result<String, SourceError>>;

/// One chart request, readable once as a quote and once as a series.
struct SharedChart {
    cell: Arc<ChartCell>,
    requested_at: Instant,
    quote_read: bool,
    series_read: bool,
}

impl SharedChart {
    fn new(capability: Capability) -> Self {
        let mut shared = Self {
            cell: Arc::new(ChartCell::new()),
            requested_at: Instant::now(),
            quote_read: false,
            series_read: false,
        };
        shared.mark(capability);
        shared
    }

    /// Returns false when `capability` already read this payload.
    fn mark(&mut self, capability: Capability) -> bool {
        let read = match capability {
            Capability::Quote => &mut self.quote_read,
            Capability::Series => &mut self.series_read,
        };
        !std::mem::replace(read, true)
    }

    fn exhausted(&self) -> bool {
        self.quote_read && self.series_read
    }
}

/// Secondary quote source and the only source of daily history.
///
/// The quote and the series come from the same chart payload, so one fetch
/// asking for both sends a single request. A payload is handed out at most
/// once per capability; a repeat read starts a new request.
pub struct YahooAdapter {
    upstream: Upstream,
    base_url: String,
    shared: Mutex<HashMap<String, SharedChart>>,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_config(http_client, UpstreamConfig::default())
    }

    pub fn with_config(http_client: Arc<dyn HttpClient>, config: UpstreamConfig) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Yahoo, http_client, config),
            base_url: YAHOO_BASE_URL.to_owned(),
            shared: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// One month of daily bars; both the quote and the series read this payload.
    async fn chart_body(
        &self,
        ticker: &Ticker,
        capability: Capability,
    ) -> Result<String, SourceError> {
        if self.upstream.is_mock() {
            return Ok(mock_chart(ticker));
        }

        let endpoint = format!(
            "{}/v8/finance/chart/{}?range=1mo&interval=1d",
            self.base_url,
            urlencoding::encode(&ticker.yahoo_symbol())
        );
        let cell = self.share(&endpoint, capability);
        cell.get_or_init(|| async {
            let request = HttpRequest::get(endpoint.as_str()).with_header("Referer", YAHOO_REFERER);
            self.upstream.fetch(request).await
        })
        .await
        .clone()
    }

    fn share(&self, endpoint: &str, capability: Capability) -> Arc<ChartCell> {
        let mut shared = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        shared.retain(|_, chart| chart.requested_at.elapsed() < SHARE_WINDOW);

        if let Some(chart) = shared.get_mut(endpoint) {
            if chart.mark(capability) {
                let cell = Arc::clone(&chart.cell);
                if chart.exhausted() {
                    shared.remove(endpoint);
                }
                return cell;
            }
        }

        let chart = SharedChart::new(capability);
        let cell = Arc::clone(&chart.cell);
        shared.insert(endpoint.to_owned(), chart);
        cell
    }
}

impl QuoteSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true)
    }

    fn supports(&self, _ticker: &Ticker) -> bool {
        true
    }

    fn quote<'a>(&'a self, ticker: &'a Ticker) -> SourceFuture<'a, Quote> {
        Box::pin(async move {
            let body = self.chart_body(ticker, Capability::Quote).await?;
            parse_chart_quote(ticker, &body)
        })
    }

    fn series<'a>(&'a self, ticker: &'a Ticker) -> SourceFuture<'a, PriceSeries> {
        Box::pin(async move {
            let body = self.chart_body(ticker, Capability::Series).await?;
            parse_chart_series(ticker, &body)
        })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { self.upstream.health() })
    }
}

/// Builds a quote from the chart payload's `meta` block.
///
/// The previous close is taken from `previousClose` when present, then from
/// the penultimate daily close, then from `chartPreviousClose` (which for a
/// one-month range is the close before the range starts).
pub fn parse_chart_quote(ticker: &Ticker, body: &str) -> Result<Quote, SourceError> {
    let result = parse_chart_result(ticker, body)?;
    let meta = &result.meta;

    let last_price = meta.regular_market_price.ok_or_else(|| {
        SourceError::not_found(format!("yahoo chart for '{ticker}' has no market price"))
    })?;

    let closes = result.valid_closes();
    let penultimate = closes.len().checked_sub(2).map(|index| closes[index].1);
    let previous_close = meta
        .previous_close
        .or(penultimate)
        .or(meta.chart_previous_close)
        .unwrap_or(last_price);

    let currency = meta
        .currency
        .clone()
        .unwrap_or_else(|| ticker.market().default_currency().to_owned());
    let display_name = meta
        .long_name
        .clone()
        .or_else(|| meta.short_name.clone())
        .unwrap_or_default();
    let timestamp = match meta.regular_market_time {
        Some(seconds) => UtcDateTime::from_unix(seconds).map_err(validation_to_error)?,
        None => UtcDateTime::now(),
    };

    Quote::new(
        ticker.clone(),
        display_name,
        last_price,
        previous_close,
        currency,
        timestamp,
    )
    .map_err(validation_to_error)
}

/// Builds the daily close series. Dates are exchange-local via `gmtoffset`;
/// null closes and non-increasing dates are skipped.
pub fn parse_chart_series(ticker: &Ticker, body: &str) -> Result<PriceSeries, SourceError> {
    let result = parse_chart_result(ticker, body)?;
    let gmtoffset = result.meta.gmtoffset;

    let mut points: Vec<PricePoint> = Vec::new();
    for (seconds, close) in result.valid_closes() {
        let local = seconds.checked_add(gmtoffset).ok_or_else(|| {
            SourceError::parse(format!(
                "yahoo timestamp {seconds} with offset {gmtoffset} is out of range"
            ))
        })?;
        let date = UtcDateTime::from_unix(local)
            .map_err(validation_to_error)?
            .date();
        if points.last().is_some_and(|previous| date <= previous.date) {
            continue;
        }
        points.push(PricePoint::new(date, close).map_err(validation_to_error)?);
    }

    if points.is_empty() {
        return Err(SourceError::not_found(format!(
            "yahoo chart for '{ticker}' has no closing prices"
        )));
    }

    PriceSeries::new(ticker.clone(), ProviderId::Yahoo, points).map_err(validation_to_error)
}

fn parse_chart_result(ticker: &Ticker, body: &str) -> Result<ChartResult, SourceError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|error| SourceError::parse(format!("failed to parse yahoo chart: {error}")))?;

    if let Some(error) = envelope.chart.error {
        return Err(SourceError::not_found(format!(
            "yahoo chart error for '{ticker}': {}",
            error.description.or(error.code).unwrap_or_default()
        )));
    }

    envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::not_found(format!("yahoo chart for '{ticker}' is empty")))
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: ChartIndicators,
}

impl ChartResult {
    /// `(unix seconds, close)` pairs with usable closes.
    fn valid_closes(&self) -> Vec<(i64, f64)> {
        let closes = self
            .indicators
            .quote
            .first()
            .map(|quote| quote.close.as_slice())
            .unwrap_or_default();

        self.timestamp
            .iter()
            .flatten()
            .zip(closes)
            .filter_map(|(seconds, close)| {
                (*close)
                    .filter(|value| value.is_finite() && *value >= 0.0)
                    .map(|value| (*seconds, value))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    regular_market_time: Option<i64>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn mock_chart(ticker: &Ticker) -> String {
    let seed = ticker_seed(ticker);
    let base = 50.0 + (seed % 3_000) as f64 / 10.0;
    let today = TradeDate::today().into_inner();
    let close_of_day = |offset: i64| {
        let day = today - time::Duration::days(offset);
        day.midnight().assume_utc().unix_timestamp() + 14 * 3_600
    };

    let timestamps = (0..MOCK_DAYS)
        .rev()
        .map(close_of_day)
        .collect::<Vec<_>>();
    let closes = (0..MOCK_DAYS as u64)
        .map(|index| {
            let drift = ((seed + index * 7) % 11) as f64 - 5.0;
            (base * (1.0 + drift / 200.0) * 100.0).round() / 100.0
        })
        .collect::<Vec<_>>();
    let last = closes.last().copied().unwrap_or(base);
    let previous = closes.iter().rev().nth(1).copied().unwrap_or(base);

    json!({
        "chart": {
            "result": [{
                "meta": {
                    "currency": ticker.market().default_currency(),
                    "symbol": ticker.yahoo_symbol(),
                    "shortName": format!("MOCK {}", ticker.as_str()),
                    "regularMarketPrice": last,
                    "previousClose": previous,
                    "regularMarketTime": timestamps.last().copied().unwrap_or_default(),
                    "gmtoffset": 0
                },
                "timestamp": timestamps,
                "indicators": { "quote": [{ "close": closes }] }
            }],
            "error": null
        }
    })
    .to_string()
}
