use std::time::{Duration, Instant};

use serde::Serialize;
use stockpal_core::{watch, PriceWatch, QuoteFetcher, WatchDirection, WatchOutcome, WatchStatus};

use crate::cli::WatchArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct WatchResponseData<'a> {
    watch: &'a PriceWatch,
    outcome: WatchOutcome,
    display: String,
}

pub async fn run(args: &WatchArgs, fetcher: &QuoteFetcher) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let ticker = fetcher.resolver().resolve(&args.query)?.ticker;

    // The argument group guarantees exactly one of the two.
    let (target, direction) = match (args.above, args.below) {
        (Some(target), _) => (target, WatchDirection::AtOrAbove),
        (None, Some(target)) => (target, WatchDirection::AtOrBelow),
        (None, None) => (f64::NAN, WatchDirection::AtOrAbove),
    };
    let price_watch = PriceWatch::new(ticker, target, direction)?;

    let interval = Duration::from_secs(args.interval_secs.max(1));
    let outcome = watch(fetcher, &price_watch, interval, args.max_polls).await;

    let display = describe(&price_watch, outcome);
    let data = serde_json::to_value(WatchResponseData {
        watch: &price_watch,
        outcome,
        display,
    })?;

    let mut result = CommandResult::ok(data, fetcher.source_ids())
        .with_latency(started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64);
    if outcome.status == WatchStatus::NoData {
        result
            .warnings
            .push(format!("no quote available for '{}'", price_watch.ticker));
    }
    Ok(result)
}

fn describe(price_watch: &PriceWatch, outcome: WatchOutcome) -> String {
    let comparison = match price_watch.direction {
        WatchDirection::AtOrAbove => "≥",
        WatchDirection::AtOrBelow => "≤",
    };
    let condition = format!("{} {comparison} {:.2}", price_watch.ticker, price_watch.target);

    match outcome.status {
        WatchStatus::Triggered { price } => {
            format!("🔔 {condition} reached at {price:.2} after {} poll(s)", outcome.polls)
        }
        WatchStatus::Pending { price } => {
            format!("⏳ {condition} not reached; last price {price:.2} after {} poll(s)", outcome.polls)
        }
        WatchStatus::NoData => format!("{condition}: no quote after {} poll(s)", outcome.polls),
    }
}
