use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::models::trade::DEFAULT_TRADE_HISTORY_CAP;

const DEFAULT_BACKEND_WS_URL: &str = "ws://localhost:8000/ws";
const DEFAULT_EXCHANGE_WS_URL: &str = "wss://stream.binance.com:9443/ws/";
const DEFAULT_HISTORY_URL: &str = "https://api.binance.com";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{key}: invalid url '{value}': {reason}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{key}: expected a number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key}: unknown value '{value}'")]
    InvalidChoice { key: &'static str, value: String },
}

/// Which wire format the live socket speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    /// Local backend emitting `{"type": ...}` tagged frames.
    Backend,
    /// Public exchange kline stream, read-only.
    Exchange,
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend => f.write_str("backend"),
            Self::Exchange => f.write_str("exchange"),
        }
    }
}

impl FromStr for FeedSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "backend" => Ok(Self::Backend),
            "exchange" | "binance" => Ok(Self::Exchange),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(5000),
            max_attempts: Some(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    pub base_url: String,
    pub limit: u32,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub source: FeedSource,
    pub symbol: String,
    pub interval: String,
    pub ws_url: String,
    /// `None` skips the historical seed.
    pub history: Option<HistoryConfig>,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
    pub trade_history_cap: usize,
}

impl FeedConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = match lookup("FEED_SOURCE") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidChoice {
                key: "FEED_SOURCE",
                value,
            })?,
            None => FeedSource::Backend,
        };

        let symbol = lookup("FEED_SYMBOL").unwrap_or_else(|| "XRPUSDT".to_string());
        let interval = lookup("FEED_INTERVAL").unwrap_or_else(|| "1m".to_string());

        let ws_url = match (source, lookup("FEED_WS_URL")) {
            (_, Some(url)) => url,
            (FeedSource::Backend, None) => DEFAULT_BACKEND_WS_URL.to_string(),
            (FeedSource::Exchange, None) => {
                let base = lookup("BINANCE_WS_URL")
                    .unwrap_or_else(|| DEFAULT_EXCHANGE_WS_URL.to_string());
                format!(
                    "{}{}@kline_{}",
                    base,
                    symbol.to_lowercase(),
                    interval
                )
            }
        };
        validate_url("FEED_WS_URL", &ws_url)?;

        let history_enabled = match lookup("FEED_HISTORY") {
            Some(value) => parse_switch("FEED_HISTORY", value)?,
            None => true,
        };

        let history = if history_enabled {
            let base_url =
                lookup("BINANCE_BASE_URL").unwrap_or_else(|| DEFAULT_HISTORY_URL.to_string());
            validate_url("BINANCE_BASE_URL", &base_url)?;
            Some(HistoryConfig {
                base_url,
                limit: parse_number(&lookup, "FEED_HISTORY_LIMIT", 1000)?,
                retry_delay: Duration::from_millis(parse_number(
                    &lookup,
                    "FEED_SEED_RETRY_MS",
                    5000,
                )?),
            })
        } else {
            None
        };

        let max_attempts = match lookup("FEED_MAX_RECONNECTS") {
            Some(value) if value.eq_ignore_ascii_case("unlimited") => None,
            Some(value) => Some(value.parse().map_err(|_| ConfigError::InvalidNumber {
                key: "FEED_MAX_RECONNECTS",
                value,
            })?),
            None => ReconnectPolicy::default().max_attempts,
        };

        let reconnect = ReconnectPolicy {
            delay: Duration::from_millis(parse_number(&lookup, "FEED_RECONNECT_DELAY_MS", 5000)?),
            max_attempts,
        };

        Ok(Self {
            source,
            symbol,
            interval,
            ws_url,
            history,
            reconnect,
            connect_timeout: Duration::from_millis(parse_number(
                &lookup,
                "FEED_CONNECT_TIMEOUT_MS",
                10_000,
            )?),
            trade_history_cap: parse_number(
                &lookup,
                "FEED_TRADE_HISTORY_CAP",
                DEFAULT_TRADE_HISTORY_CAP,
            )?,
        })
    }
}

fn validate_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(default),
    }
}

fn parse_switch(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidChoice { key, value }),
    }
}
