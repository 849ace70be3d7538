//! Field resolution for loosely-shaped market listings.
//!
//! Upstream market records are not schema-stable: the same logical field
//! shows up under different names depending on the endpoint version. Each
//! logical field is described by a [`FieldChain`], an ordered list of
//! candidate keys tried in priority order.

use crate::models::{Market, Outcome};
use serde_json::Value;

pub const UNTITLED_MARKET: &str = "Untitled Market";
pub const DEFAULT_OUTCOME_NAME: &str = "Outcome";

/// Ordered candidate keys for one logical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldChain {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

pub const MARKET_ID: FieldChain = FieldChain {
    name: "market id",
    fields: &["id", "marketAddress", "conditionId", "slug"],
};

pub const MARKET_TITLE: FieldChain = FieldChain {
    name: "market title",
    fields: &["title", "name", "slug"],
};

pub const MARKET_SLUG: FieldChain = FieldChain {
    name: "market slug",
    fields: &["slug"],
};

pub const MARKET_OUTCOMES: FieldChain = FieldChain {
    name: "market outcomes",
    fields: &["outcomes", "pairs"],
};

/// Gamma ships outcome names and prices as parallel arrays.
pub const MARKET_OUTCOME_PRICES: FieldChain = FieldChain {
    name: "market outcome prices",
    fields: &["outcomePrices"],
};

pub const OUTCOME_NAME: FieldChain = FieldChain {
    name: "outcome name",
    fields: &["name", "label", "title"],
};

pub const OUTCOME_PRICE: FieldChain = FieldChain {
    name: "outcome price",
    fields: &["price", "lastPrice", "last_price", "last"],
};

impl FieldChain {
    /// First candidate that is present and not `null`.
    pub fn first_present<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        self.fields
            .iter()
            .filter_map(|field| record.get(field))
            .find(|v| !v.is_null())
    }

    /// First candidate holding a non-blank string or a number, as text.
    pub fn first_text(&self, record: &Value) -> Option<String> {
        self.fields
            .iter()
            .filter_map(|field| record.get(field))
            .find_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    /// First candidate that decodes to a non-empty list.
    pub fn first_list(&self, record: &Value) -> Vec<Value> {
        self.fields
            .iter()
            .filter_map(|field| record.get(field))
            .map(parse_json_string_or_array)
            .find(|items| !items.is_empty())
            .unwrap_or_default()
    }
}

/// Accept either a JSON array or a string holding a JSON-encoded array.
pub fn parse_json_string_or_array(v: &Value) -> Vec<Value> {
    match v {
        Value::Array(arr) => arr.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(arr)) => arr,
            _ => vec![],
        },
        _ => vec![],
    }
}

/// Parse a raw upstream price. Only finite numbers count.
pub fn parse_price(v: &Value) -> Option<f64> {
    let price = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    price.is_finite().then_some(price)
}

/// Resolve one outcome record. Never fails: missing pieces become defaults.
pub fn resolve_outcome(record: &Value) -> Outcome {
    let name = OUTCOME_NAME
        .first_text(record)
        .unwrap_or_else(|| DEFAULT_OUTCOME_NAME.to_string());
    Outcome::new(name, OUTCOME_PRICE.first_present(record).cloned())
}

/// Resolve a market record. Returns `None` when no identifier can be found,
/// since such a market cannot be keyed in the snapshot.
pub fn resolve_market(record: &Value) -> Option<Market> {
    let id = MARKET_ID.first_text(record)?;
    let title = MARKET_TITLE
        .first_text(record)
        .unwrap_or_else(|| UNTITLED_MARKET.to_string());
    let slug = MARKET_SLUG.first_text(record).unwrap_or_else(|| id.clone());

    Some(Market {
        id,
        title,
        slug,
        outcomes: resolve_outcomes(record),
    })
}

fn resolve_outcomes(record: &Value) -> Vec<Outcome> {
    let entries = MARKET_OUTCOMES.first_list(record);
    let parallel_prices = MARKET_OUTCOME_PRICES.first_list(record);

    entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| match entry {
            Value::Object(_) => Some(resolve_outcome(entry)),
            // ["Yes", "No"] + outcomePrices ["0.52", "0.48"]
            Value::String(name) => {
                let name = if name.trim().is_empty() {
                    DEFAULT_OUTCOME_NAME.to_string()
                } else {
                    name.clone()
                };
                Some(Outcome::new(name, parallel_prices.get(i).cloned()))
            }
            _ => None,
        })
        .collect()
}
