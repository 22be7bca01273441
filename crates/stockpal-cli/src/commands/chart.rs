use std::path::Path;

use serde::Serialize;
use stockpal_core::{render_svg, CacheMode, QuoteFetcher, SeriesOrigin, Ticker};
use tracing::info;

use crate::cli::ChartArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ChartResponseData<'a> {
    ticker: &'a Ticker,
    path: &'a Path,
    points: usize,
    origin: SeriesOrigin,
    bytes: usize,
}

pub async fn run(
    args: &ChartArgs,
    fetcher: &QuoteFetcher,
    mode: CacheMode,
) -> Result<CommandResult, CliError> {
    let report = fetcher.lookup(&args.query, mode).await?;
    let svg = render_svg(&report.series, (args.width, args.height))?;
    std::fs::write(&args.output, &svg)?;
    info!(ticker = %report.ticker, path = %args.output.display(), "chart written");

    let data = serde_json::to_value(ChartResponseData {
        ticker: &report.ticker,
        path: &args.output,
        points: report.series.len(),
        origin: report.series.origin,
        bytes: svg.len(),
    })?;

    Ok(CommandResult::from_report(data, &report))
}
