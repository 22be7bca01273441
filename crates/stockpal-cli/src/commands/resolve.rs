use std::time::Instant;

use stockpal_core::QuoteFetcher;

use crate::cli::QueryArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &QueryArgs, fetcher: &QuoteFetcher) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let resolution = fetcher.resolver().resolve(&args.query)?;
    let data = serde_json::to_value(&resolution)?;

    Ok(CommandResult::ok(data, fetcher.source_ids())
        .with_latency(started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64))
}
