//! Synthetic price history used when no source can provide one.

use crate::adapters::ticker_seed;
use crate::{PricePoint, PriceSeries, ProviderId, Ticker, TradeDate, MAX_SERIES_POINTS};

/// Anchor used when no price at all is known for the ticker.
pub const DEFAULT_ANCHOR_PRICE: f64 = 100.0;

const MAX_DAILY_MOVE: f64 = 0.02;

/// Builds a deterministic daily series for `ticker` that ends on `end` at
/// `anchor`.
///
/// The walk is seeded by the ticker and the end date, so repeated calls on
/// the same day draw the same chart. Earlier closes are derived backwards
/// from the anchor with bounded daily moves, which keeps every close positive.
pub fn synthetic_series(ticker: &Ticker, anchor: Option<f64>, end: TradeDate) -> PriceSeries {
    let anchor = anchor
        .filter(|price| price.is_finite() && *price > 0.0)
        .unwrap_or(DEFAULT_ANCHOR_PRICE);

    let mut dates = Vec::with_capacity(MAX_SERIES_POINTS);
    let mut day = Some(end);
    while let Some(current) = day {
        dates.push(current);
        if dates.len() == MAX_SERIES_POINTS {
            break;
        }
        day = current.previous_day();
    }
    dates.reverse();

    let seed = ticker_seed(ticker) ^ end.into_inner().to_julian_day().unsigned_abs() as u64;
    let mut rng = fastrand::Rng::with_seed(seed);

    let mut closes = vec![anchor; dates.len()];
    for index in (0..closes.len().saturating_sub(1)).rev() {
        let change = (rng.f64() * 2.0 - 1.0) * MAX_DAILY_MOVE;
        closes[index] = closes[index + 1] / (1.0 + change);
    }

    let points = dates
        .into_iter()
        .zip(closes)
        .map(|(date, close)| PricePoint {
            date,
            close: (close * 100.0).round() / 100.0,
        })
        .collect();

    PriceSeries::new(ticker.clone(), ProviderId::Synthetic, points)
        .expect("synthetic points are non-empty and strictly increasing")
}
