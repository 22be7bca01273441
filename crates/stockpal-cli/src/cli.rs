//! CLI argument definitions for stockpal.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `resolve` | Turn a free-text query into a ticker |
//! | `quote` | Fetch the latest quote |
//! | `history` | Fetch up to 30 daily closes |
//! | `analyze` | Quote plus moving-average trend analysis |
//! | `watch` | Poll until a target price is reached |
//! | `chart` | Write an SVG price chart |
//! | `aliases` | List the name→ticker table |
//! | `sources` | List source capabilities and health |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Exit non-zero on warnings or errors |
//! | `--timeout-ms` | `5000` | Per-request timeout in ms |
//! | `--mock` | `false` | Deterministic offline data |
//! | `--no-cache` | `false` | Skip the report cache |
//! | `--refresh` | `false` | Fetch fresh data and update the cache |
//! | `--aliases` | unset | Extra aliases JSON file |
//! | `--verbose` | `false` | Debug logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! stockpal quote 茅台
//! stockpal analyze "how is AAPL doing" --format table
//! stockpal watch 腾讯 --above 400 --interval-secs 30 --max-polls 20
//! stockpal chart 600519 --output maotai.svg
//! ```

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

/// Stock quote assistant for A-share, Hong Kong and US tickers.
///
/// Resolves company names or codes, fetches quotes from Sina with Yahoo as
/// fallback and prints them with a structured metadata envelope.
#[derive(Debug, Parser)]
#[command(name = "stockpal", author, version, about = "Stock quote assistant")]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Exit with code 3 when the result carries warnings or errors.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Per-request timeout in milliseconds; overrides STOCKPAL_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Serve deterministic offline data instead of calling Sina and Yahoo.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Neither read nor write the report cache.
    #[arg(long, global = true, default_value_t = false, conflicts_with = "refresh")]
    pub no_cache: bool,

    /// Ignore cached reports but store the fresh one.
    #[arg(long, global = true, default_value_t = false)]
    pub refresh: bool,

    /// JSON file of extra `{"name": "code"}` aliases; overrides STOCKPAL_ALIASES.
    #[arg(long, global = true)]
    pub aliases: Option<PathBuf>,

    /// Debug-level logging on stderr (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary followed by metadata.
    Table,
    /// Single JSON envelope.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a free-text query to a ticker without fetching.
    ///
    ///   stockpal resolve "帮我看看特斯拉"
    Resolve(QueryArgs),

    /// Fetch the latest quote.
    ///
    ///   stockpal quote 茅台
    ///   stockpal quote 0700.HK --format table
    Quote(QueryArgs),

    /// Fetch up to 30 daily closes; falls back to a simulated series.
    History(QueryArgs),

    /// Quote plus MA5/MA10/MA20 trend and a suggested stop loss.
    Analyze(QueryArgs),

    /// Poll the quote until it crosses a target price.
    ///
    ///   stockpal watch AAPL --below 180 --interval-secs 60
    Watch(WatchArgs),

    /// Render closes and MA5 into an SVG file.
    ///
    ///   stockpal chart 600519 --output maotai.svg
    Chart(ChartArgs),

    /// List the name→ticker alias table.
    Aliases,

    /// List source capabilities and health.
    Sources,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Company name, ticker or a sentence containing either.
    pub query: String,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["above", "below"])))]
pub struct WatchArgs {
    /// Company name, ticker or a sentence containing either.
    pub query: String,

    /// Trigger when the price is at or above this level.
    #[arg(long)]
    pub above: Option<f64>,

    /// Trigger when the price is at or below this level.
    #[arg(long)]
    pub below: Option<f64>,

    /// Seconds between polls.
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,

    /// Stop after this many polls.
    #[arg(long, default_value_t = 10)]
    pub max_polls: u32,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    /// Company name, ticker or a sentence containing either.
    pub query: String,

    /// Destination SVG file.
    #[arg(long, short)]
    pub output: PathBuf,

    #[arg(long, default_value_t = 960)]
    pub width: u32,

    #[arg(long, default_value_t = 540)]
    pub height: u32,
}
