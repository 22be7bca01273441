//! Free text to ticker resolution.
//!
//! Resolution runs in two stages. The query is first checked against an
//! ordered name table (case-insensitive containment, first hit wins). On a
//! miss, an ordered list of code patterns is tried against the raw text. The
//! market is then inferred from the code's shape by [`Ticker::market`].
//!
//! ```rust
//! use stockpal_core::SymbolResolver;
//!
//! let resolver = SymbolResolver::default();
//! let resolution = resolver.resolve("茅台现在多少钱").expect("known alias");
//! assert_eq!(resolution.ticker.as_str(), "600519");
//! ```

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{CoreError, Ticker, ValidationError};

/// Built-in name table. Order matters: the first contained name wins.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("茅台", "600519"),
    ("贵州茅台", "600519"),
    ("maotai", "600519"),
    ("腾讯", "0700.HK"),
    ("阿里巴巴", "BABA"),
    ("阿里", "BABA"),
    ("苹果", "AAPL"),
    ("谷歌", "GOOGL"),
    ("微软", "MSFT"),
    ("特斯拉", "TSLA"),
    ("亚马逊", "AMZN"),
    ("英伟达", "NVDA"),
    ("标普500", "^GSPC"),
    ("道琼斯", "^DJI"),
    ("纳斯达克", "^IXIC"),
    ("上证指数", "000001.SS"),
    ("深证成指", "399001.SZ"),
    ("创业板", "399006.SZ"),
    ("恒生指数", "^HSI"),
];

/// Which code pattern produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    HongKong,
    QualifiedAShare,
    Index,
    AShare,
    Latin,
}

// Boundaries are ASCII-only so codes embedded in CJK text still match.
static CODE_PATTERNS: LazyLock<Vec<(PatternKind, Regex)>> = LazyLock::new(|| {
    [
        (
            PatternKind::HongKong,
            r"(?i)(?:^|[^0-9A-Za-z.])(\d{4,5}\.HK)(?:$|[^0-9A-Za-z])",
        ),
        (
            PatternKind::QualifiedAShare,
            r"(?i)(?:^|[^0-9A-Za-z.])(\d{6}\.(?:SS|SZ))(?:$|[^0-9A-Za-z])",
        ),
        (
            PatternKind::Index,
            r"(?:^|[^0-9A-Za-z^])(\^[A-Za-z][A-Za-z0-9]{1,5})(?:$|[^0-9A-Za-z])",
        ),
        (
            PatternKind::AShare,
            r"(?:^|[^0-9A-Za-z.])(\d{6})(?:$|[^0-9A-Za-z.])",
        ),
        (
            PatternKind::Latin,
            r"(?:^|[^0-9A-Za-z.^])([A-Z]{1,5})(?:$|[^0-9A-Za-z.])",
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("code patterns are valid")))
    .collect()
});

/// Single letters that are usually English words, not tickers.
const LATIN_STOPWORDS: [&str; 2] = ["I", "A"];

/// First code `pattern` finds in `query`. A Latin stopword only wins when no
/// other Latin candidate follows it.
fn first_code<'q>(kind: PatternKind, pattern: &Regex, query: &'q str) -> Option<&'q str> {
    let mut codes = pattern
        .captures_iter(query)
        .filter_map(|captures| captures.get(1))
        .map(|code| code.as_str());
    let first = codes.next()?;
    if kind != PatternKind::Latin || !LATIN_STOPWORDS.contains(&first) {
        return Some(first);
    }

    Some(
        codes
            .find(|code| !LATIN_STOPWORDS.contains(code))
            .unwrap_or(first),
    )
}

/// How a query was matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Alias { name: String },
    Pattern { pattern: PatternKind },
}

/// Successful resolution of a free-text query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub query: String,
    pub ticker: Ticker,
    pub matched_by: MatchKind,
}

/// Resolution failures. `NoMatch` is the "nothing recognisable" sentinel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("query cannot be empty")]
    EmptyQuery,
    #[error("no ticker found for '{query}'; try a company name or a stock code")]
    NoMatch { query: String },
}

/// One name→ticker entry of the lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub ticker: Ticker,
}

impl Alias {
    pub fn new(name: impl Into<String>, code: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            name: name.into(),
            ticker: Ticker::parse(code)?,
        })
    }
}

/// Table-then-pattern symbol resolver.
#[derive(Debug, Clone)]
pub struct SymbolResolver {
    aliases: Vec<Alias>,
}

impl Default for SymbolResolver {
    fn default() -> Self {
        let aliases = BUILTIN_ALIASES
            .iter()
            .map(|(name, code)| Alias::new(*name, code).expect("built-in alias codes are valid"))
            .collect();
        Self { aliases }
    }
}

impl SymbolResolver {
    /// Built-in table followed by `extra` entries.
    pub fn with_extra_aliases(extra: Vec<Alias>) -> Self {
        let mut resolver = Self::default();
        resolver.aliases.extend(extra);
        resolver
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn resolve(&self, query: &str) -> Result<Resolution, ResolveError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }

        let lowered = trimmed.to_lowercase();
        if let Some(alias) = self
            .aliases
            .iter()
            .find(|alias| lowered.contains(&alias.name.to_lowercase()))
        {
            debug!(query = trimmed, alias = %alias.name, ticker = %alias.ticker, "resolved by alias");
            return Ok(Resolution {
                query: trimmed.to_owned(),
                ticker: alias.ticker.clone(),
                matched_by: MatchKind::Alias {
                    name: alias.name.clone(),
                },
            });
        }

        for (kind, pattern) in CODE_PATTERNS.iter() {
            let Some(code) = first_code(*kind, pattern, trimmed) else {
                continue;
            };
            if let Ok(ticker) = Ticker::parse(code) {
                debug!(query = trimmed, pattern = ?kind, ticker = %ticker, "resolved by pattern");
                return Ok(Resolution {
                    query: trimmed.to_owned(),
                    ticker,
                    matched_by: MatchKind::Pattern { pattern: *kind },
                });
            }
        }

        Err(ResolveError::NoMatch {
            query: trimmed.to_owned(),
        })
    }
}

/// Reads extra aliases from a JSON object file (`{"name": "code"}`).
///
/// Entries are returned in key order.
pub fn load_aliases_file(path: impl AsRef<Path>) -> Result<Vec<Alias>, CoreError> {
    let raw = std::fs::read_to_string(path)?;
    parse_aliases_json(&raw)
}

pub fn parse_aliases_json(raw: &str) -> Result<Vec<Alias>, CoreError> {
    let table: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    let mut aliases = Vec::with_capacity(table.len());
    for (name, value) in table {
        let code = value
            .as_str()
            .ok_or_else(|| ValidationError::InvalidAlias { name: name.clone() })?;
        aliases.push(Alias::new(name, code)?);
    }
    Ok(aliases)
}
