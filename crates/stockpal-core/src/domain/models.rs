use serde::{Deserialize, Serialize};

use crate::{ProviderId, Ticker, TradeDate, UtcDateTime, ValidationError};

/// Most recent points kept in a [`PriceSeries`].
pub const MAX_SERIES_POINTS: usize = 30;

/// Point-in-time price snapshot for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: Ticker,
    pub display_name: String,
    pub last_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    pub currency: String,
    pub timestamp: UtcDateTime,
}

impl Quote {
    pub fn new(
        ticker: Ticker,
        display_name: impl Into<String>,
        last_price: f64,
        previous_close: f64,
        currency: impl AsRef<str>,
        timestamp: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("last_price", last_price)?;
        validate_non_negative("previous_close", previous_close)?;

        let change = last_price - previous_close;
        let change_percent = if previous_close > 0.0 {
            change / previous_close * 100.0
        } else {
            0.0
        };

        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            ticker.as_str().to_owned()
        } else {
            display_name.trim().to_owned()
        };

        Ok(Self {
            ticker,
            display_name,
            last_price,
            previous_close,
            change,
            change_percent,
            open: None,
            high: None,
            low: None,
            volume: None,
            currency: validate_currency_code(currency.as_ref())?,
            timestamp,
        })
    }

    /// Attach the session's open/high/low range.
    pub fn with_session(
        mut self,
        open: Option<f64>,
        high: Option<f64>,
        low: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_optional_non_negative("open", open)?;
        validate_optional_non_negative("high", high)?;
        validate_optional_non_negative("low", low)?;
        self.open = open;
        self.high = high;
        self.low = low;
        Ok(self)
    }

    pub fn with_volume(mut self, volume: Option<u64>) -> Self {
        self.volume = volume;
        self
    }

    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }
}

/// One closing price on one trading date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: TradeDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: TradeDate, close: f64) -> Result<Self, ValidationError> {
        validate_non_negative("close", close)?;
        Ok(Self { date, close })
    }
}

/// Where a series' points came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesOrigin {
    Live,
    Synthetic,
}

/// Chronological closing prices for charting and trend analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: Ticker,
    pub origin: SeriesOrigin,
    pub source: ProviderId,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, keeping the most recent [`MAX_SERIES_POINTS`] points.
    pub fn new(
        ticker: Ticker,
        source: ProviderId,
        mut points: Vec<PricePoint>,
    ) -> Result<Self, ValidationError> {
        if points.is_empty() {
            return Err(ValidationError::EmptySeries);
        }

        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(ValidationError::UnorderedSeries { index: index + 1 });
            }
        }

        if points.len() > MAX_SERIES_POINTS {
            points.drain(..points.len() - MAX_SERIES_POINTS);
        }

        let origin = if source.is_remote() {
            SeriesOrigin::Live
        } else {
            SeriesOrigin::Synthetic
        };

        Ok(Self {
            ticker,
            origin,
            source,
            points,
        })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|point| point.close)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == SeriesOrigin::Synthetic
    }
}

/// Validate and normalize currency to uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_optional_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_non_negative(field, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> TradeDate {
        TradeDate::parse(raw).expect("valid date")
    }

    fn ts() -> UtcDateTime {
        UtcDateTime::parse("2024-01-05T07:00:00Z").expect("timestamp")
    }

    #[test]
    fn quote_derives_change_from_previous_close() {
        let ticker = Ticker::parse("600519").expect("ticker");
        let quote = Quote::new(ticker, "贵州茅台", 1650.0, 1500.0, "cny", ts()).expect("quote");

        assert_eq!(quote.currency, "CNY");
        assert!((quote.change - 150.0).abs() < 1e-9);
        assert!((quote.change_percent - 10.0).abs() < 1e-9);
        assert!(quote.is_up());
    }

    #[test]
    fn quote_with_zero_previous_close_has_zero_percent_change() {
        let ticker = Ticker::parse("AAPL").expect("ticker");
        let quote = Quote::new(ticker, "", 10.0, 0.0, "USD", ts()).expect("quote");

        assert_eq!(quote.change_percent, 0.0);
        assert_eq!(quote.display_name, "AAPL");
    }

    #[test]
    fn quote_rejects_nan_price() {
        let ticker = Ticker::parse("AAPL").expect("ticker");
        let err = Quote::new(ticker, "Apple", f64::NAN, 1.0, "USD", ts()).expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { field: "last_price" }));
    }

    #[test]
    fn series_rejects_duplicate_dates() {
        let ticker = Ticker::parse("AAPL").expect("ticker");
        let points = vec![
            PricePoint::new(date("2024-01-02"), 10.0).expect("point"),
            PricePoint::new(date("2024-01-02"), 11.0).expect("point"),
        ];

        let err = PriceSeries::new(ticker, ProviderId::Yahoo, points).expect_err("must fail");
        assert!(matches!(err, ValidationError::UnorderedSeries { index: 1 }));
    }

    #[test]
    fn series_keeps_most_recent_points() {
        let ticker = Ticker::parse("AAPL").expect("ticker");
        let mut day = date("2024-01-01").into_inner();
        let mut points = Vec::new();
        for index in 0..40 {
            points.push(PricePoint::new(TradeDate::new(day), index as f64).expect("point"));
            day = day.next_day().expect("next day");
        }

        let series = PriceSeries::new(ticker, ProviderId::Yahoo, points).expect("series");
        assert_eq!(series.len(), MAX_SERIES_POINTS);
        assert_eq!(series.points()[0].close, 10.0);
        assert_eq!(series.origin, SeriesOrigin::Live);
    }
}
