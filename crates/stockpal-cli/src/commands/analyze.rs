use serde::Serialize;
use stockpal_core::{CacheMode, Quote, QuoteFetcher, TrendAnalysis};

use crate::cli::QueryArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct AnalyzeResponseData<'a> {
    quote: Option<&'a Quote>,
    analysis: &'a TrendAnalysis,
    display: String,
}

pub async fn run(
    args: &QueryArgs,
    fetcher: &QuoteFetcher,
    mode: CacheMode,
) -> Result<CommandResult, CliError> {
    let report = fetcher.lookup(&args.query, mode).await?;
    let analysis = TrendAnalysis::from_series(&report.series)?;

    let data = serde_json::to_value(AnalyzeResponseData {
        quote: report.quote.as_ref(),
        analysis: &analysis,
        display: format!("{}\n\n{}", report.display, analysis.summary()),
    })?;

    Ok(CommandResult::from_report(data, &report))
}
