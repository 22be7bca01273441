mod aliases;
mod analyze;
mod chart;
mod history;
mod quote;
mod resolve;
mod sources;
mod watch;

use serde_json::Value;
use stockpal_core::{
    CacheMode, Envelope, EnvelopeError, ProviderId, QuoteFetcher, QuoteFetcherBuilder, QuoteReport,
    Settings,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
            source_chain,
        }
    }

    /// Carries a fetch report's chain, diagnostics and timing.
    pub fn from_report(data: Value, report: &QuoteReport) -> Self {
        Self {
            data,
            warnings: report.warnings.clone(),
            errors: report.errors.clone(),
            latency_ms: report.latency_ms,
            cache_hit: report.cache_hit,
            source_chain: report.source_chain.clone(),
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let fetcher = build_fetcher(cli)?;
    let mode = cache_mode(cli);

    let command_result = match &cli.command {
        Command::Resolve(args) => resolve::run(args, &fetcher)?,
        Command::Quote(args) => quote::run(args, &fetcher, mode).await?,
        Command::History(args) => history::run(args, &fetcher, mode).await?,
        Command::Analyze(args) => analyze::run(args, &fetcher, mode).await?,
        Command::Watch(args) => watch::run(args, &fetcher).await?,
        Command::Chart(args) => chart::run(args, &fetcher, mode).await?,
        Command::Aliases => aliases::run(&fetcher)?,
        Command::Sources => sources::run(&fetcher).await?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        cache_hit,
        source_chain,
    } = command_result;

    let mut metadata = Metadata::new(source_chain, latency_ms, cache_hit)?;
    for warning in warnings {
        metadata.push_warning(warning);
    }

    let meta = metadata.into_envelope_meta()?;
    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

/// Environment settings with command-line overrides applied on top.
fn build_fetcher(cli: &Cli) -> Result<QuoteFetcher, CliError> {
    let mut settings = Settings::from_env()?;
    if let Some(timeout_ms) = cli.timeout_ms {
        settings = settings.with_timeout_ms(timeout_ms)?;
    }
    if let Some(path) = &cli.aliases {
        settings = settings.with_aliases_path(path);
    }
    if cli.no_cache {
        settings = settings.without_cache();
    }

    let builder = QuoteFetcherBuilder::new().with_settings(settings);
    let builder = if cli.mock {
        builder.with_mock_mode()
    } else {
        builder.with_real_clients()
    };

    Ok(builder.build()?)
}

fn cache_mode(cli: &Cli) -> CacheMode {
    if cli.no_cache {
        CacheMode::Bypass
    } else if cli.refresh {
        CacheMode::Refresh
    } else {
        CacheMode::Use
    }
}
