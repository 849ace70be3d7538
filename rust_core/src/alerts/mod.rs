pub mod price_move;

pub use price_move::{escape_markdown, format_probability, PriceAlert, DEFAULT_MARKET_LINK_BASE};
