use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use time::macros::{format_description, offset};
use time::{Date, PrimitiveDateTime, Time, UtcOffset};

use super::{ticker_seed, validation_to_error, Upstream, UpstreamConfig};
use crate::data_source::{
    Capability, CapabilitySet, HealthStatus, QuoteSource, SourceError, SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{Market, PriceSeries, ProviderId, Quote, Ticker, UtcDateTime};

pub const SINA_BASE_URL: &str = "https://hq.sinajs.cn";
/// The quote endpoint rejects requests without this referer.
pub const SINA_REFERER: &str = "https://finance.sina.com.cn/";

const BEIJING: UtcOffset = offset!(+8);
const A_SHARE_MIN_FIELDS: usize = 32;
const HK_MIN_FIELDS: usize = 19;

/// Positional field offsets of one Sina layout.
struct Layout {
    name: usize,
    open: usize,
    previous_close: usize,
    last: usize,
    high: usize,
    low: usize,
    volume: usize,
    date: usize,
    time: usize,
    min_fields: usize,
    currency: &'static str,
}

const A_SHARE: Layout = Layout {
    name: 0,
    open: 1,
    previous_close: 2,
    last: 3,
    high: 4,
    low: 5,
    volume: 8,
    date: 30,
    time: 31,
    min_fields: A_SHARE_MIN_FIELDS,
    currency: "CNY",
};

const HONG_KONG: Layout = Layout {
    name: 1,
    open: 2,
    previous_close: 3,
    last: 6,
    high: 4,
    low: 5,
    volume: 12,
    date: 17,
    time: 18,
    min_fields: HK_MIN_FIELDS,
    currency: "HKD",
};

/// Primary real-time source for Shanghai, Shenzhen and Hong Kong listings.
pub struct SinaAdapter {
    upstream: Upstream,
    base_url: String,
}

impl SinaAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_config(http_client, UpstreamConfig::default())
    }

    pub fn with_config(http_client: Arc<dyn HttpClient>, config: UpstreamConfig) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Sina, http_client, config),
            base_url: SINA_BASE_URL.to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    async fn fetch_quote(&self, ticker: &Ticker) -> Result<Quote, SourceError> {
        let code = ticker
            .sina_code()
            .ok_or_else(|| SourceError::unsupported(Capability::Quote, ticker))?;

        let body = if self.upstream.is_mock() {
            mock_payload(ticker, &code)
        } else {
            let request = HttpRequest::get(format!("{}/list={code}", self.base_url))
                .with_header("Referer", SINA_REFERER);
            self.upstream.fetch(request).await?
        };

        parse_sina_payload(ticker, &body)
    }
}

impl QuoteSource for SinaAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Sina
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, false)
    }

    fn supports(&self, ticker: &Ticker) -> bool {
        ticker.sina_code().is_some()
    }

    fn quote<'a>(&'a self, ticker: &'a Ticker) -> SourceFuture<'a, Quote> {
        Box::pin(self.fetch_quote(ticker))
    }

    fn series<'a>(&'a self, ticker: &'a Ticker) -> SourceFuture<'a, PriceSeries> {
        Box::pin(async move { Err(SourceError::unsupported(Capability::Series, ticker)) })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { self.upstream.health() })
    }
}

/// Parses a `var hq_str_<code>="f0,f1,...";` response into a quote.
///
/// The field layout is picked from the ticker's market. An empty field list
/// is Sina's answer for unknown codes.
pub fn parse_sina_payload(ticker: &Ticker, body: &str) -> Result<Quote, SourceError> {
    let start = body
        .find("=\"")
        .map(|index| index + 2)
        .ok_or_else(|| SourceError::parse("sina payload has no quoted field list"))?;
    let end = body[start..]
        .find('"')
        .map(|index| start + index)
        .ok_or_else(|| SourceError::parse("sina payload field list is not terminated"))?;

    let raw = body[start..end].trim();
    if raw.is_empty() {
        return Err(SourceError::not_found(format!(
            "sina has no data for '{ticker}'"
        )));
    }

    let fields = raw.split(',').map(str::trim).collect::<Vec<_>>();
    let layout = match ticker.market() {
        Market::HongKong => &HONG_KONG,
        Market::Shanghai | Market::Shenzhen => &A_SHARE,
        Market::Us | Market::Index => {
            return Err(SourceError::unsupported(Capability::Quote, ticker));
        }
    };

    if fields.len() < layout.min_fields {
        return Err(SourceError::parse(format!(
            "sina payload for '{ticker}' has {} fields, expected at least {}",
            fields.len(),
            layout.min_fields
        )));
    }

    let previous_close = price_field(&fields, layout.previous_close, "previous close")?;
    let mut last = price_field(&fields, layout.last, "last price")?;
    // Before the opening auction the last price is reported as zero.
    if last == 0.0 {
        last = previous_close;
    }

    let timestamp = beijing_timestamp(fields[layout.date], fields[layout.time])?;
    let volume = fields[layout.volume]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .map(|value| value as u64);

    Quote::new(
        ticker.clone(),
        fields[layout.name],
        last,
        previous_close,
        layout.currency,
        timestamp,
    )
    .and_then(|quote| {
        quote.with_session(
            session_field(&fields, layout.open),
            session_field(&fields, layout.high),
            session_field(&fields, layout.low),
        )
    })
    .map(|quote| quote.with_volume(volume))
    .map_err(validation_to_error)
}

fn price_field(fields: &[&str], index: usize, label: &str) -> Result<f64, SourceError> {
    fields[index]
        .parse::<f64>()
        .map_err(|_| SourceError::parse(format!("sina {label} '{}' is not a number", fields[index])))
}

fn session_field(fields: &[&str], index: usize) -> Option<f64> {
    fields[index]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

fn beijing_timestamp(date: &str, time: &str) -> Result<UtcDateTime, SourceError> {
    let date = Date::parse(&date.replace('/', "-"), format_description!("[year]-[month]-[day]"))
        .map_err(|_| SourceError::parse(format!("sina date '{date}' is not YYYY-MM-DD")))?;
    let time = Time::parse(time, format_description!("[hour]:[minute]:[second]"))
        .or_else(|_| Time::parse(time, format_description!("[hour]:[minute]")))
        .map_err(|_| SourceError::parse(format!("sina time '{time}' is not HH:MM[:SS]")))?;

    Ok(UtcDateTime::from_local(PrimitiveDateTime::new(date, time), BEIJING))
}

fn mock_payload(ticker: &Ticker, code: &str) -> String {
    let seed = ticker_seed(ticker);
    let previous_close = 10.0 + (seed % 2_000) as f64 / 10.0;
    let last = previous_close * (1.0 + ((seed % 9) as f64 - 4.0) / 100.0);
    let high = last.max(previous_close) * 1.01;
    let low = last.min(previous_close) * 0.99;
    let volume = 100_000 + seed % 50_000;

    let now = UtcDateTime::now().into_inner().to_offset(BEIJING);
    let date = format!("{:04}-{:02}-{:02}", now.year(), u8::from(now.month()), now.day());
    let time = format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second());
    let name = format!("MOCK {}", ticker.base_code());

    let fields = if ticker.market() == Market::HongKong {
        let mut fields = vec![String::from("0"); HK_MIN_FIELDS];
        fields[HONG_KONG.name] = name;
        fields[HONG_KONG.open] = format!("{previous_close:.3}");
        fields[HONG_KONG.previous_close] = format!("{previous_close:.3}");
        fields[HONG_KONG.high] = format!("{high:.3}");
        fields[HONG_KONG.low] = format!("{low:.3}");
        fields[HONG_KONG.last] = format!("{last:.3}");
        fields[HONG_KONG.volume] = volume.to_string();
        fields[HONG_KONG.date] = date.replace('-', "/");
        fields[HONG_KONG.time] = time;
        fields
    } else {
        let mut fields = vec![String::from("0"); A_SHARE_MIN_FIELDS + 1];
        fields[A_SHARE.name] = name;
        fields[A_SHARE.open] = format!("{previous_close:.2}");
        fields[A_SHARE.previous_close] = format!("{previous_close:.2}");
        fields[A_SHARE.last] = format!("{last:.2}");
        fields[A_SHARE.high] = format!("{high:.2}");
        fields[A_SHARE.low] = format!("{low:.2}");
        fields[A_SHARE.volume] = volume.to_string();
        fields[A_SHARE.date] = date;
        fields[A_SHARE.time] = time;
        fields
    };

    format!("var hq_str_{code}=\"{}\";\n", fields.join(","))
}
