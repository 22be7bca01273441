//! Target-price watches polled against live quotes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::CacheMode;
use crate::fetcher::QuoteFetcher;
use crate::{Quote, Ticker, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchDirection {
    AtOrAbove,
    AtOrBelow,
}

impl WatchDirection {
    pub fn reached(self, price: f64, target: f64) -> bool {
        match self {
            Self::AtOrAbove => price >= target,
            Self::AtOrBelow => price <= target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceWatch {
    pub ticker: Ticker,
    pub target: f64,
    pub direction: WatchDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WatchStatus {
    Triggered { price: f64 },
    Pending { price: f64 },
    NoData,
}

impl WatchStatus {
    pub const fn is_triggered(self) -> bool {
        matches!(self, Self::Triggered { .. })
    }
}

/// Final state of a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatchOutcome {
    pub status: WatchStatus,
    pub polls: u32,
}

impl PriceWatch {
    pub fn new(ticker: Ticker, target: f64, direction: WatchDirection) -> Result<Self, ValidationError> {
        if !target.is_finite() || target <= 0.0 {
            return Err(ValidationError::InvalidTarget);
        }

        Ok(Self {
            ticker,
            target,
            direction,
        })
    }

    pub fn check(&self, quote: Option<&Quote>) -> WatchStatus {
        match quote {
            Some(quote) if self.direction.reached(quote.last_price, self.target) => {
                WatchStatus::Triggered {
                    price: quote.last_price,
                }
            }
            Some(quote) => WatchStatus::Pending {
                price: quote.last_price,
            },
            None => WatchStatus::NoData,
        }
    }
}

/// Shortest polling period; a zero interval is raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls `fetcher` every `interval` until the watch triggers or `max_polls`
/// fetches have run. Every poll bypasses the cache.
pub async fn watch(
    fetcher: &QuoteFetcher,
    watch: &PriceWatch,
    interval: Duration,
    max_polls: u32,
) -> WatchOutcome {
    let mut timer = tokio::time::interval(interval.max(MIN_POLL_INTERVAL));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut outcome = WatchOutcome {
        status: WatchStatus::NoData,
        polls: 0,
    };

    while outcome.polls < max_polls {
        timer.tick().await;
        let report = fetcher.fetch(&watch.ticker, CacheMode::Bypass).await;
        outcome.polls += 1;
        outcome.status = watch.check(report.quote.as_ref());

        if let WatchStatus::Triggered { price } = outcome.status {
            info!(
                ticker = %watch.ticker,
                price,
                target = watch.target,
                direction = ?watch.direction,
                "price watch triggered"
            );
            break;
        }
        debug!(ticker = %watch.ticker, poll = outcome.polls, status = ?outcome.status, "price watch pending");
    }

    outcome
}
