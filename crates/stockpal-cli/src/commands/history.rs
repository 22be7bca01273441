use stockpal_core::{CacheMode, QuoteFetcher};

use crate::cli::QueryArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(
    args: &QueryArgs,
    fetcher: &QuoteFetcher,
    mode: CacheMode,
) -> Result<CommandResult, CliError> {
    let report = fetcher.lookup(&args.query, mode).await?;
    let data = serde_json::to_value(&report.series)?;
    Ok(CommandResult::from_report(data, &report))
}
