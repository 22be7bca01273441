//! Moving averages and a four-way trend label over a close series.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{PriceSeries, SeriesOrigin, Ticker, ValidationError};

/// Suggested stop loss as a fraction of the last close.
pub const STOP_LOSS_RATIO: f64 = 0.95;

/// Mean of the last `window` closes, or of every close when the series is
/// shorter. `None` for an empty series or a zero window.
pub fn moving_average(series: &PriceSeries, window: usize) -> Option<f64> {
    if window == 0 || series.is_empty() {
        return None;
    }

    let points = series.points();
    let tail = &points[points.len().saturating_sub(window)..];
    let sum: f64 = tail.iter().map(|point| point.close).sum();
    Some(sum / tail.len() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    StrongUp,
    WeakDown,
    OscillatingUp,
    OscillatingDown,
}

impl Trend {
    pub fn classify(last: f64, ma5: f64, ma10: f64, ma20: f64) -> Self {
        if last > ma20 && ma5 > ma10 && ma10 > ma20 {
            Self::StrongUp
        } else if last < ma20 && ma5 < ma10 && ma10 < ma20 {
            Self::WeakDown
        } else if last > ma20 {
            Self::OscillatingUp
        } else {
            Self::OscillatingDown
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::StrongUp => "强势上涨趋势",
            Self::WeakDown => "弱势下跌趋势",
            Self::OscillatingUp => "震荡上行趋势",
            Self::OscillatingDown => "震荡下行趋势",
        }
    }
}

impl Display for Trend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Technical summary of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub ticker: Ticker,
    pub origin: SeriesOrigin,
    pub points: usize,
    pub last_close: f64,
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub trend: Trend,
    pub stop_loss: f64,
}

impl TrendAnalysis {
    pub fn from_series(series: &PriceSeries) -> Result<Self, ValidationError> {
        let last_close = series
            .last()
            .map(|point| point.close)
            .ok_or(ValidationError::EmptySeries)?;
        let average = |window| moving_average(series, window).unwrap_or(last_close);
        let (ma5, ma10, ma20) = (average(5), average(10), average(20));

        Ok(Self {
            ticker: series.ticker.clone(),
            origin: series.origin,
            points: series.len(),
            last_close,
            ma5,
            ma10,
            ma20,
            trend: Trend::classify(last_close, ma5, ma10, ma20),
            stop_loss: last_close * STOP_LOSS_RATIO,
        })
    }

    /// Markdown block appended to a quote display.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            String::from("**技术分析:**"),
            format!("- **{}**", self.trend),
            format!("- 5日均线: {:.2}", self.ma5),
            format!("- 10日均线: {:.2}", self.ma10),
            format!("- 20日均线: {:.2}", self.ma20),
            format!("- 建议止损位: {:.2}", self.stop_loss),
        ];
        if self.origin == SeriesOrigin::Synthetic {
            lines.push(String::from("- 注意: 历史数据不可用，以上指标基于模拟序列"));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PricePoint, ProviderId, TradeDate};

    fn series(closes: &[f64]) -> PriceSeries {
        let mut day = TradeDate::parse("2024-02-01").expect("date").into_inner();
        let mut points = Vec::new();
        for close in closes {
            points.push(PricePoint::new(TradeDate::new(day), *close).expect("point"));
            day = day.next_day().expect("next day");
        }
        PriceSeries::new(Ticker::parse("AAPL").expect("ticker"), ProviderId::Yahoo, points)
            .expect("series")
    }

    #[test]
    fn moving_average_uses_trailing_window() {
        let series = series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(moving_average(&series, 5), Some(4.0));
        assert_eq!(moving_average(&series, 20), Some(3.5));
        assert_eq!(moving_average(&series, 0), None);
    }

    #[test]
    fn rising_series_is_strong_uptrend() {
        let closes = (1..=25).map(f64::from).collect::<Vec<_>>();
        let analysis = TrendAnalysis::from_series(&series(&closes)).expect("analysis");

        assert_eq!(analysis.trend, Trend::StrongUp);
        assert_eq!(analysis.last_close, 25.0);
        assert!((analysis.stop_loss - 23.75).abs() < 1e-9);
    }

    #[test]
    fn falling_series_is_weak_downtrend() {
        let closes = (1..=25).rev().map(f64::from).collect::<Vec<_>>();
        let analysis = TrendAnalysis::from_series(&series(&closes)).expect("analysis");
        assert_eq!(analysis.trend, Trend::WeakDown);
    }

    #[test]
    fn classification_falls_back_to_position_against_ma20() {
        assert_eq!(Trend::classify(11.0, 9.0, 10.0, 10.5), Trend::OscillatingUp);
        assert_eq!(Trend::classify(10.0, 11.0, 10.0, 10.5), Trend::OscillatingDown);
        assert_eq!(Trend::classify(10.5, 10.5, 10.5, 10.5), Trend::OscillatingDown);
    }

    #[test]
    fn summary_mentions_synthetic_origin() {
        let analysis = TrendAnalysis::from_series(&crate::fallback::synthetic_series(
            &Ticker::parse("AAPL").expect("ticker"),
            None,
            TradeDate::parse("2024-02-01").expect("date"),
        ))
        .expect("analysis");

        assert!(analysis.summary().contains("模拟序列"));
    }
}
