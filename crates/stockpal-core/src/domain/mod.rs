//! # Domain Models
//!
//! Value types shared by the resolver, the adapters and the fetcher.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated, upper-cased symbol with market inference |
//! | [`Market`] | Listing venue (Shanghai, Shenzhen, Hong Kong, US, index) |
//! | [`Quote`] | Price snapshot with derived change and change percent |
//! | [`PriceSeries`] | Chronological closes, at most 30 points |
//! | [`TradeDate`] | `YYYY-MM-DD` trading date |
//! | [`UtcDateTime`] | RFC3339 UTC timestamp |
//!
//! All constructors validate their invariants and return
//! [`ValidationError`](crate::ValidationError) on failure.

mod models;
mod ticker;
mod timestamp;

pub use models::{
    validate_currency_code, PricePoint, PriceSeries, Quote, SeriesOrigin, MAX_SERIES_POINTS,
};
pub use ticker::{Market, Ticker};
pub use timestamp::{TradeDate, UtcDateTime};
