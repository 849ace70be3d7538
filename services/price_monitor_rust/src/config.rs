//! Configuration for price_monitor_rust

use anyhow::{anyhow, Context, Result};
use polywatch_core::alerts::DEFAULT_MARKET_LINK_BASE;
use polywatch_core::clients::polymarket::{DEFAULT_REQUEST_TIMEOUT, POLY_API};
use polywatch_core::clients::telegram::DEFAULT_TELEGRAM_API_BASE;
use polywatch_core::snapshot::DEFAULT_SNAPSHOT_PATH;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct MonitorConfig {
    // Telegram (required)
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_base: String,

    // Upstream
    pub markets_url: String,
    pub polymarket_proxy_url: Option<String>,
    pub request_timeout: Duration,

    // Detection
    pub check_interval: Duration,
    pub change_threshold: f64,

    // Persistence
    pub snapshot_path: PathBuf,

    // Alerts
    pub market_link_base: String,
    pub startup_notification: bool,

    // Liveness endpoint
    pub health_enabled: bool,
    pub health_bind: SocketAddr,
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Missing Telegram credentials are fatal.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_bot_token = required(&lookup, "TELEGRAM_BOT_TOKEN")?;
        let telegram_chat_id = required(&lookup, "TELEGRAM_CHAT_ID")?;

        let check_interval_secs = parse_u64(&lookup, "CHECK_INTERVAL_SECS", 15 * 60)?;
        if check_interval_secs == 0 {
            return Err(anyhow!("CHECK_INTERVAL_SECS must be > 0"));
        }

        let change_threshold = parse_f64(&lookup, "CHANGE_THRESHOLD", 0.005)?;
        if !change_threshold.is_finite() || change_threshold < 0.0 {
            return Err(anyhow!("CHANGE_THRESHOLD must be a finite fraction >= 0 (e.g. 0.005 = 0.5%)"));
        }

        let request_timeout_secs = parse_u64(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT.as_secs())?;
        if request_timeout_secs == 0 {
            return Err(anyhow!("REQUEST_TIMEOUT_SECS must be > 0"));
        }

        let health_bind_raw =
            lookup("HEALTH_BIND").unwrap_or_else(|| "0.0.0.0:10000".to_string());
        let health_bind: SocketAddr = health_bind_raw
            .parse()
            .with_context(|| format!("Invalid HEALTH_BIND: {health_bind_raw} (expected host:port)"))?;

        Ok(Self {
            telegram_bot_token,
            telegram_chat_id,
            telegram_api_base: lookup("TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),

            markets_url: lookup("MARKETS_URL").unwrap_or_else(|| POLY_API.to_string()),
            polymarket_proxy_url: lookup("POLYMARKET_PROXY_URL").filter(|v| !v.trim().is_empty()),
            request_timeout: Duration::from_secs(request_timeout_secs),

            check_interval: Duration::from_secs(check_interval_secs),
            change_threshold,

            snapshot_path: lookup("LAST_PRICES_FILE")
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string())
                .into(),

            market_link_base: lookup("MARKET_LINK_BASE")
                .unwrap_or_else(|| DEFAULT_MARKET_LINK_BASE.to_string()),
            startup_notification: parse_bool(&lookup, "STARTUP_NOTIFICATION", true),

            health_enabled: parse_bool(&lookup, "HEALTH_ENABLED", true),
            health_bind,
        })
    }
}

impl fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_api_base", &self.telegram_api_base)
            .field("markets_url", &self.markets_url)
            .field("polymarket_proxy_url", &self.polymarket_proxy_url)
            .field("request_timeout", &self.request_timeout)
            .field("check_interval", &self.check_interval)
            .field("change_threshold", &self.change_threshold)
            .field("snapshot_path", &self.snapshot_path)
            .field("market_link_base", &self.market_link_base)
            .field("startup_notification", &self.startup_notification)
            .field("health_enabled", &self.health_enabled)
            .field("health_bind", &self.health_bind)
            .finish()
    }
}

fn required<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Result<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{key} must be set (environment or .env)"))
}

/// Parse as f64 with default fallback
fn parse_f64<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: f64) -> Result<f64> {
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} must be a valid f64, got {:?}", key, val)),
        None => Ok(default),
    }
}

/// Parse as u64 with default fallback
fn parse_u64<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u64) -> Result<u64> {
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} must be a valid u64, got {:?}", key, val)),
        None => Ok(default),
    }
}

fn parse_bool<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: bool) -> bool {
    lookup(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
        .unwrap_or(default)
}
