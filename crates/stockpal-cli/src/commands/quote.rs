use serde::Serialize;
use stockpal_core::{CacheMode, ProviderId, Quote, QuoteFetcher, Ticker};

use crate::cli::QueryArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct QuoteResponseData<'a> {
    ticker: &'a Ticker,
    quote: Option<&'a Quote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote_source: Option<ProviderId>,
    display: &'a str,
}

pub async fn run(
    args: &QueryArgs,
    fetcher: &QuoteFetcher,
    mode: CacheMode,
) -> Result<CommandResult, CliError> {
    let report = fetcher.lookup(&args.query, mode).await?;

    let data = serde_json::to_value(QuoteResponseData {
        ticker: &report.ticker,
        quote: report.quote.as_ref(),
        quote_source: report.quote_source,
        display: &report.display,
    })?;

    Ok(CommandResult::from_report(data, &report))
}
