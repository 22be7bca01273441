use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_TICKER_LEN: usize = 15;

/// Listing venue inferred from a ticker's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Shanghai,
    Shenzhen,
    HongKong,
    Us,
    Index,
}

impl Market {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shanghai => "shanghai",
            Self::Shenzhen => "shenzhen",
            Self::HongKong => "hong_kong",
            Self::Us => "us",
            Self::Index => "index",
        }
    }

    pub const fn default_currency(self) -> &'static str {
        match self {
            Self::Shanghai | Self::Shenzhen => "CNY",
            Self::HongKong => "HKD",
            Self::Us | Self::Index => "USD",
        }
    }

    /// Yahoo-style exchange suffix, if the market uses one.
    pub const fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Shanghai => Some("SS"),
            Self::Shenzhen => Some("SZ"),
            Self::HongKong => Some("HK"),
            Self::Us | Self::Index => None,
        }
    }
}

impl Display for Market {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized ticker as produced by the resolver (`600519`, `0700.HK`, `^GSPC`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Parse and normalize a ticker to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "^" {
            return Err(ValidationError::EmptyTicker);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_TICKER_LEN {
            return Err(ValidationError::TickerTooLong {
                len,
                max: MAX_TICKER_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || (ch == '^' && index == 0);
            if !valid {
                return Err(ValidationError::TickerInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn market(&self) -> Market {
        if self.0.starts_with('^') {
            return Market::Index;
        }

        match self.suffix() {
            Some("SS") => return Market::Shanghai,
            Some("SZ") => return Market::Shenzhen,
            Some("HK") => return Market::HongKong,
            _ => {}
        }

        if is_a_share_code(&self.0) {
            // 5xxxxx funds, 6xxxxx main board and 9xxxxx B shares list in Shanghai.
            return match self.0.as_bytes()[0] {
                b'5' | b'6' | b'9' => Market::Shanghai,
                _ => Market::Shenzhen,
            };
        }

        Market::Us
    }

    /// Code without its exchange suffix.
    pub fn base_code(&self) -> &str {
        match self.suffix() {
            Some(suffix) => &self.0[..self.0.len() - suffix.len() - 1],
            None => &self.0,
        }
    }

    /// Exchange-qualified form (`600519` becomes `600519.SS`).
    pub fn qualified(&self) -> String {
        let market = self.market();
        match (market.suffix(), self.suffix()) {
            (Some(suffix), None) if is_a_share_code(&self.0) => format!("{}.{suffix}", self.0),
            _ => self.0.clone(),
        }
    }

    /// Symbol accepted by the Yahoo chart endpoint. Hong Kong codes use four digits there.
    pub fn yahoo_symbol(&self) -> String {
        if self.market() == Market::HongKong {
            let digits = self.base_code().trim_start_matches('0');
            return format!("{digits:0>4}.HK");
        }
        self.qualified()
    }

    /// Market-prefixed code accepted by the Sina quote endpoint.
    pub fn sina_code(&self) -> Option<String> {
        let base = self.base_code();
        match self.market() {
            Market::Shanghai if is_a_share_code(base) => Some(format!("sh{base}")),
            Market::Shenzhen if is_a_share_code(base) => Some(format!("sz{base}")),
            Market::HongKong if base.chars().all(|ch| ch.is_ascii_digit()) => {
                let digits = base.trim_start_matches('0');
                Some(format!("rt_hk{digits:0>5}"))
            }
            _ => None,
        }
    }

    fn suffix(&self) -> Option<&str> {
        let (_, suffix) = self.0.rsplit_once('.')?;
        matches!(suffix, "SS" | "SZ" | "HK").then_some(suffix)
    }
}

fn is_a_share_code(value: &str) -> bool {
    value.len() == 6 && value.bytes().all(|byte| byte.is_ascii_digit())
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Ticker {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Ticker {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(raw: &str) -> Ticker {
        Ticker::parse(raw).expect("ticker should parse")
    }

    #[test]
    fn parses_and_normalizes_ticker() {
        assert_eq!(ticker(" aapl ").as_str(), "AAPL");
        assert_eq!(ticker("0700.hk").as_str(), "0700.HK");
    }

    #[test]
    fn rejects_caret_outside_leading_position() {
        let err = Ticker::parse("GS^PC").expect_err("must fail");
        assert!(matches!(err, ValidationError::TickerInvalidChar { ch: '^', index: 2 }));
    }

    #[test]
    fn rejects_non_ascii_input() {
        let err = Ticker::parse("茅台").expect_err("must fail");
        assert!(matches!(err, ValidationError::TickerInvalidChar { .. }));
    }

    #[test]
    fn infers_market_from_leading_digit() {
        assert_eq!(ticker("600519").market(), Market::Shanghai);
        assert_eq!(ticker("510300").market(), Market::Shanghai);
        assert_eq!(ticker("000001").market(), Market::Shenzhen);
        assert_eq!(ticker("300750").market(), Market::Shenzhen);
        assert_eq!(ticker("000001.SS").market(), Market::Shanghai);
        assert_eq!(ticker("0700.HK").market(), Market::HongKong);
        assert_eq!(ticker("^GSPC").market(), Market::Index);
        assert_eq!(ticker("AAPL").market(), Market::Us);
    }

    #[test]
    fn qualifies_bare_a_share_codes_only() {
        assert_eq!(ticker("600519").qualified(), "600519.SS");
        assert_eq!(ticker("399001.SZ").qualified(), "399001.SZ");
        assert_eq!(ticker("AAPL").qualified(), "AAPL");
    }

    #[test]
    fn maps_to_provider_codes() {
        assert_eq!(ticker("600519").sina_code().as_deref(), Some("sh600519"));
        assert_eq!(ticker("399006.SZ").sina_code().as_deref(), Some("sz399006"));
        assert_eq!(ticker("0700.HK").sina_code().as_deref(), Some("rt_hk00700"));
        assert_eq!(ticker("AAPL").sina_code(), None);
        assert_eq!(ticker("^HSI").sina_code(), None);
        assert_eq!(ticker("00700.HK").yahoo_symbol(), "0700.HK");
        assert_eq!(ticker("000001").yahoo_symbol(), "000001.SZ");
    }
}
