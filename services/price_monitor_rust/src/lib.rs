//! price_monitor_rust - Polymarket price-move monitor with Telegram alerts

pub mod config;
pub mod health;
pub mod monitor;

pub use config::MonitorConfig;
pub use monitor::{CycleError, CycleOutcome, CycleReport, MonitorHandle, PriceMonitor};
