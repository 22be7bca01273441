//! Runtime settings with environment overrides.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `STOCKPAL_TIMEOUT_MS` | [`Settings::timeout_ms`] | `5000` |
//! | `STOCKPAL_CACHE_TTL_SECS` | [`Settings::cache_ttl`] | `300` |
//! | `STOCKPAL_MAX_RETRIES` | [`Settings::max_retries`] | `2` |
//! | `STOCKPAL_SINA_BASE_URL` | [`Settings::sina_base_url`] | `https://hq.sinajs.cn` |
//! | `STOCKPAL_YAHOO_BASE_URL` | [`Settings::yahoo_base_url`] | `https://query1.finance.yahoo.com` |
//! | `STOCKPAL_ALIASES` | [`Settings::aliases_path`] | unset |
//!
//! Empty variables count as unset.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::adapters::{SINA_BASE_URL, YAHOO_BASE_URL};
use crate::cache::DEFAULT_CACHE_TTL;
use crate::http_client::DEFAULT_TIMEOUT_MS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {var} has invalid value '{value}'")]
    InvalidValue { var: &'static str, value: String },
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub timeout_ms: u64,
    pub cache_ttl: Duration,
    pub max_retries: u32,
    pub sina_base_url: String,
    pub yahoo_base_url: String,
    pub aliases_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_ttl: DEFAULT_CACHE_TTL,
            max_retries: 2,
            sina_base_url: SINA_BASE_URL.to_owned(),
            yahoo_base_url: YAHOO_BASE_URL.to_owned(),
            aliases_path: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut settings = Self::default();

        if let Some(timeout_ms) = parse_var::<u64>("STOCKPAL_TIMEOUT_MS", read("STOCKPAL_TIMEOUT_MS"))? {
            settings = settings.with_timeout_ms(timeout_ms)?;
        }
        if let Some(seconds) = parse_var::<u64>("STOCKPAL_CACHE_TTL_SECS", read("STOCKPAL_CACHE_TTL_SECS"))? {
            settings.cache_ttl = Duration::from_secs(seconds);
        }
        if let Some(retries) = parse_var::<u32>("STOCKPAL_MAX_RETRIES", read("STOCKPAL_MAX_RETRIES"))? {
            settings.max_retries = retries;
        }
        if let Some(url) = read("STOCKPAL_SINA_BASE_URL") {
            settings.sina_base_url = url.trim().to_owned();
        }
        if let Some(url) = read("STOCKPAL_YAHOO_BASE_URL") {
            settings.yahoo_base_url = url.trim().to_owned();
        }
        if let Some(path) = read("STOCKPAL_ALIASES") {
            settings.aliases_path = Some(PathBuf::from(path.trim()));
        }

        Ok(settings)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.timeout_ms = timeout_ms;
        Ok(self)
    }

    pub fn with_aliases_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.aliases_path = Some(path.into());
        self
    }

    /// Zero TTL disables the cache.
    pub fn without_cache(mut self) -> Self {
        self.cache_ttl = Duration::ZERO;
        self
    }
}

fn parse_var<T: FromStr>(var: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { var, value })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let settings = Settings::from_lookup(lookup(&[])).expect("settings");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timeout_ms, 5_000);
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("STOCKPAL_TIMEOUT_MS", "1500"),
            ("STOCKPAL_CACHE_TTL_SECS", "0"),
            ("STOCKPAL_MAX_RETRIES", " 4 "),
            ("STOCKPAL_SINA_BASE_URL", "http://127.0.0.1:9000"),
            ("STOCKPAL_ALIASES", "/etc/stockpal/aliases.json"),
        ]))
        .expect("settings");

        assert_eq!(settings.timeout_ms, 1_500);
        assert_eq!(settings.cache_ttl, Duration::ZERO);
        assert_eq!(settings.max_retries, 4);
        assert_eq!(settings.sina_base_url, "http://127.0.0.1:9000");
        assert_eq!(settings.yahoo_base_url, YAHOO_BASE_URL);
        assert_eq!(
            settings.aliases_path,
            Some(PathBuf::from("/etc/stockpal/aliases.json"))
        );
    }

    #[test]
    fn empty_values_are_ignored() {
        let settings = Settings::from_lookup(lookup(&[("STOCKPAL_TIMEOUT_MS", "  ")])).expect("settings");
        assert_eq!(settings.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn rejects_non_numeric_and_zero_timeouts() {
        let err = Settings::from_lookup(lookup(&[("STOCKPAL_TIMEOUT_MS", "fast")])).expect_err("invalid");
        assert!(matches!(err, ConfigError::InvalidValue { var: "STOCKPAL_TIMEOUT_MS", .. }));

        let err = Settings::from_lookup(lookup(&[("STOCKPAL_TIMEOUT_MS", "0")])).expect_err("zero");
        assert_eq!(err, ConfigError::ZeroTimeout);
    }
}
