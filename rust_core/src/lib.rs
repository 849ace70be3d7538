//! Polywatch Core - Polymarket price-move detection.
//!
//! This crate provides:
//! - Market listing fetch from the Gamma API (either listing shape)
//! - Best-effort field resolution for ids, titles, outcome names and prices
//! - Relative price-change evaluation against the last observed price
//! - Durable JSON snapshot of last observed prices
//! - Telegram delivery of price-move alerts

pub mod alerts;
pub mod clients;
pub mod evaluator;
pub mod models;
pub mod resolver;
pub mod snapshot;

pub use alerts::PriceAlert;
pub use clients::{AlertSink, FetchError, MarketSource, PolymarketClient, TelegramClient};
pub use evaluator::{DeltaEvaluator, Evaluation, PriceMove, RecordReason};
pub use models::{Market, Outcome, PriceKey};
pub use snapshot::{PriceSnapshot, PriceSnapshotStore, SnapshotError};
