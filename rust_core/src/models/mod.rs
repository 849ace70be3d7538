// Shared models for the price monitor
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// Markets & Outcomes (rebuilt on every fetch, never persisted)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub id: String,
    pub title: String,
    /// Used to build the canonical market link. Falls back to `id`.
    pub slug: String,
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub name: String,
    /// Price exactly as upstream sent it: number, numeric string, or absent.
    pub raw_price: Option<Value>,
}

impl Outcome {
    pub fn new(name: impl Into<String>, raw_price: Option<Value>) -> Self {
        Self {
            name: name.into(),
            raw_price,
        }
    }

    /// Numeric price, if the raw value parses as a finite real number.
    pub fn price(&self) -> Option<f64> {
        self.raw_price.as_ref().and_then(crate::resolver::parse_price)
    }
}

// ============================================================================
// Snapshot key
// ============================================================================

/// `"<marketId>||<outcomeName>"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceKey(String);

impl PriceKey {
    pub const SEPARATOR: &'static str = "||";

    pub fn new(market_id: &str, outcome_name: &str) -> Self {
        Self(format!("{}{}{}", market_id, Self::SEPARATOR, outcome_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
