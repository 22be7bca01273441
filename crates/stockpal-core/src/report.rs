//! Fetch results and their human-readable rendering.

use serde::{Deserialize, Serialize};

use crate::{EnvelopeError, PriceSeries, ProviderId, Quote, Ticker};

/// Outcome of one quote fetch.
///
/// Always well formed: `quote` is `None` when every source failed, and
/// `series` is then a synthetic fallback. `errors` records each adapter
/// failure on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteReport {
    pub ticker: Ticker,
    pub quote: Option<Quote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_source: Option<ProviderId>,
    pub series: PriceSeries,
    pub display: String,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub cache_hit: bool,
}

impl QuoteReport {
    pub fn has_quote(&self) -> bool {
        self.quote.is_some()
    }

    /// Live quote and live history, no fallback involved.
    pub fn is_complete(&self) -> bool {
        self.quote.is_some() && !self.series.is_synthetic()
    }

    /// Best known current price: the quote, else the last close.
    pub fn current_price(&self) -> Option<f64> {
        self.quote
            .as_ref()
            .map(|quote| quote.last_price)
            .or_else(|| self.series.last().map(|point| point.close))
    }
}

pub fn currency_symbol(currency: &str) -> &str {
    match currency {
        "CNY" => "¥",
        "HKD" => "HK$",
        "USD" => "$",
        "EUR" => "€",
        "JPY" => "JP¥",
        "GBP" => "£",
        other => other,
    }
}

/// Markdown snapshot of a quote, the way the assistant shows it in chat.
pub fn format_quote(quote: &Quote) -> String {
    let symbol = currency_symbol(&quote.currency);
    let marker = if quote.is_up() { "🟢" } else { "🔴" };

    let mut lines = vec![
        format!("**{} ({}) - 实时行情**", quote.display_name, quote.ticker),
        format!("- 当前价格: **{symbol}{:.2}**", quote.last_price),
        format!(
            "- 涨跌: {marker} {:+.2} ({:+.2}%)",
            quote.change, quote.change_percent
        ),
    ];

    let session = [
        ("今日最高", quote.high),
        ("今日最低", quote.low),
        ("今开", quote.open),
    ];
    for (label, value) in session {
        if let Some(value) = value {
            lines.push(format!("- {label}: {symbol}{value:.2}"));
        }
    }

    lines.push(format!("- 昨收: {symbol}{:.2}", quote.previous_close));
    if let Some(volume) = quote.volume {
        lines.push(format!("- 成交量: {}", group_thousands(volume)));
    }
    lines.push(format!("- 更新时间: {}", quote.timestamp));

    lines.join("\n")
}

/// Placeholder shown when neither source returned a quote.
pub fn no_data_message(ticker: &Ticker) -> String {
    format!("无法获取 {ticker} 的实时数据，请检查股票代码或网络连接。")
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
