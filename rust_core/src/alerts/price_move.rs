//! Price-move alert and its Telegram (Markdown) rendering.

use crate::evaluator::PriceMove;
use crate::models::Market;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MARKET_LINK_BASE: &str = "https://polymarket.com/markets";

/// A single outcome crossing the alert threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub market_title: String,
    pub market_slug: String,
    pub outcome_name: String,
    pub old_price: f64,
    pub new_price: f64,
    pub relative_change: f64,
    pub checked_at: DateTime<Utc>,
}

impl PriceAlert {
    pub fn new(market: &Market, outcome_name: &str, mv: &PriceMove, checked_at: DateTime<Utc>) -> Self {
        Self {
            market_title: market.title.clone(),
            market_slug: market.slug.clone(),
            outcome_name: outcome_name.to_string(),
            old_price: mv.old_price,
            new_price: mv.new_price,
            relative_change: mv.relative_change,
            checked_at,
        }
    }

    pub fn change_pct(&self) -> f64 {
        self.relative_change * 100.0
    }

    pub fn market_link(&self, link_base: &str) -> String {
        format!("{}/{}", link_base.trim_end_matches('/'), self.market_slug)
    }

    /// Format alert message for Telegram (legacy Markdown parse mode)
    pub fn format_message(&self, link_base: &str) -> String {
        format!(
            "*Polymarket Update — {}*\n\
             _Checked at:_ {}\n\
             *Outcome:* {}\n\
             *Old odds:* {}\n\
             *New odds:* {}\n\
             *Change:* {:+.2}%\n\
             [Open market]({})",
            self.market_title,
            self.checked_at.format("%Y-%m-%d %H:%M:%S UTC"),
            escape_markdown(&self.outcome_name),
            format_probability(self.old_price),
            format_probability(self.new_price),
            self.change_pct(),
            self.market_link(link_base),
        )
    }

    /// Same content without any markup, for when Telegram rejects the Markdown.
    pub fn format_plain_message(&self, link_base: &str) -> String {
        format!(
            "Polymarket Update — {}\n\
             Checked at: {}\n\
             Outcome: {}\n\
             Old odds: {}\n\
             New odds: {}\n\
             Change: {:+.2}%\n\
             Open market: {}",
            self.market_title,
            self.checked_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.outcome_name,
            format_probability(self.old_price),
            format_probability(self.new_price),
            self.change_pct(),
            self.market_link(link_base),
        )
    }
}

/// Backslash-escape legacy Markdown control characters. Only valid outside
/// an entity.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// 0.5 -> "50.00%"
pub fn format_probability(price: f64) -> String {
    format!("{:.2}%", price * 100.0)
}
