use crate::clients::MarketSource;
use crate::models::Market;
use crate::resolver::resolve_market;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const POLY_API: &str = "https://gamma-api.polymarket.com/markets";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("could not decode listing from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected listing shape: {0}")]
    Shape(&'static str),
}

#[derive(Debug, Clone)]
pub struct PolymarketClient {
    client: Client,
    markets_url: String,
}

impl PolymarketClient {
    pub fn new(markets_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        Self::with_proxy(markets_url, timeout, None)
    }

    pub fn with_proxy(
        markets_url: impl Into<String>,
        timeout: Duration,
        proxy_url: Option<&str>,
    ) -> Result<Self, FetchError> {
        let mut client_builder = Client::builder().timeout(timeout);

        if let Some(proxy_url) = proxy_url.filter(|p| !p.is_empty()) {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => {
                    client_builder = client_builder.proxy(proxy);
                    info!("Polymarket client using proxy: {}", proxy_url);
                }
                Err(e) => warn!("Ignoring invalid Polymarket proxy {}: {}", proxy_url, e),
            }
        }

        Ok(Self {
            client: client_builder.build().map_err(FetchError::Client)?,
            markets_url: markets_url.into(),
        })
    }

    /// One-shot reachability probe, logged only. Used at startup.
    pub async fn check_connectivity(&self) -> bool {
        info!("Testing connection to Polymarket API at {}", self.markets_url);
        match self.fetch_markets().await {
            Ok(markets) => {
                info!("Polymarket API reachable, received {} markets", markets.len());
                true
            }
            Err(e) => {
                warn!("Polymarket API not reachable: {}", e);
                false
            }
        }
    }

    async fn fetch_listing(&self) -> Result<Value, FetchError> {
        let url = &self.markets_url;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            });
        }

        resp.json::<Value>().await.map_err(|source| FetchError::Decode {
            url: url.clone(),
            source,
        })
    }
}

#[async_trait]
impl MarketSource for PolymarketClient {
    async fn fetch_markets(&self) -> Result<Vec<Market>, FetchError> {
        let listing = self.fetch_listing().await?;
        markets_from_listing(listing)
    }

    fn source_name(&self) -> &str {
        "polymarket"
    }
}

/// The listing arrives either as a bare array or as `{"markets": [...]}`.
pub fn normalize_listing(body: Value) -> Result<Vec<Value>, FetchError> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut obj) => match obj.remove("markets") {
            Some(Value::Array(records)) => Ok(records),
            Some(_) => Err(FetchError::Shape("`markets` is not an array")),
            None => Err(FetchError::Shape("object without a `markets` field")),
        },
        _ => Err(FetchError::Shape("expected an array or an object")),
    }
}

/// Normalize and resolve a listing. Records without any identifier are
/// dropped; everything else becomes a [`Market`].
pub fn markets_from_listing(body: Value) -> Result<Vec<Market>, FetchError> {
    let records = normalize_listing(body)?;
    let total = records.len();

    let markets: Vec<Market> = records.iter().filter_map(resolve_market).collect();

    let dropped = total - markets.len();
    if dropped > 0 {
        debug!("Dropped {} of {} market records without an identifier", dropped, total);
    }

    Ok(markets)
}
