//! Server configuration loaded from environment variables

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Runtime configuration for the feed server and its monitors
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Interface to bind the HTTP/WebSocket listener on
    pub host: String,
    /// Port to bind the HTTP/WebSocket listener on
    pub port: u16,
    /// Pricing monitor poll interval
    pub pricing_interval: Duration,
    /// Option-expiry monitor poll interval
    pub option_expiry_interval: Duration,
    /// Days ahead of today (inclusive) an option contract triggers an alert
    pub option_alert_window_days: u32,
    /// Interval between WebSocket ping frames sent to each client
    pub heartbeat_interval: Duration,
    /// Upper bound for enqueueing one event on a single connection
    pub send_timeout: Duration,
    /// Outbound queue capacity per connection
    pub send_buffer: usize,
    /// Optional JSON snapshot used to seed the in-memory data source
    pub market_data_file: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            pricing_interval: Duration::from_secs(30),
            option_expiry_interval: Duration::from_secs(3600),
            option_alert_window_days: 7,
            heartbeat_interval: Duration::from_secs(30),
            send_timeout: Duration::from_millis(5000),
            send_buffer: 64,
            market_data_file: None,
        }
    }
}

impl FeedConfig {
    /// Create from environment variables
    ///
    /// Environment:
    /// - FEED_HOST: Bind interface (default 0.0.0.0)
    /// - FEED_PORT: Bind port (default 8000)
    /// - FEED_PRICING_INTERVAL_SECS: Pricing poll interval (default 30)
    /// - FEED_OPTION_EXPIRY_INTERVAL_SECS: Option-expiry poll interval (default 3600)
    /// - FEED_OPTION_ALERT_WINDOW_DAYS: Expiry alert window in days (default 7)
    /// - FEED_HEARTBEAT_SECS: WebSocket ping interval (default 30)
    /// - FEED_SEND_TIMEOUT_MS: Per-connection send timeout (default 5000)
    /// - FEED_SEND_BUFFER: Per-connection outbound queue size (default 64)
    /// - FEED_MARKET_DATA_FILE: JSON snapshot for the in-memory source (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (environment, test maps)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("FEED_HOST").unwrap_or(defaults.host);
        let port = parse_or(&lookup, "FEED_PORT", defaults.port)?;

        let pricing_secs = positive(
            &lookup,
            "FEED_PRICING_INTERVAL_SECS",
            defaults.pricing_interval.as_secs(),
        )?;
        let expiry_secs = positive(
            &lookup,
            "FEED_OPTION_EXPIRY_INTERVAL_SECS",
            defaults.option_expiry_interval.as_secs(),
        )?;
        let window_days = parse_or(
            &lookup,
            "FEED_OPTION_ALERT_WINDOW_DAYS",
            defaults.option_alert_window_days,
        )?;
        let heartbeat_secs = positive(
            &lookup,
            "FEED_HEARTBEAT_SECS",
            defaults.heartbeat_interval.as_secs(),
        )?;
        let send_timeout_ms = positive(
            &lookup,
            "FEED_SEND_TIMEOUT_MS",
            defaults.send_timeout.as_millis() as u64,
        )?;
        let send_buffer = positive(&lookup, "FEED_SEND_BUFFER", defaults.send_buffer as u64)?;

        let market_data_file = lookup("FEED_MARKET_DATA_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            host,
            port,
            pricing_interval: Duration::from_secs(pricing_secs),
            option_expiry_interval: Duration::from_secs(expiry_secs),
            option_alert_window_days: window_days,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            send_timeout: Duration::from_millis(send_timeout_ms),
            send_buffer: send_buffer as usize,
            market_data_file,
        })
    }

    /// Socket address to bind the server on
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
            key: "FEED_HOST",
            value: raw.clone(),
            reason: e.to_string(),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value: raw,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn positive<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
