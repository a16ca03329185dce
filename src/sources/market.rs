//! CoinGecko market data.
//!
//! API: `https://api.coingecko.com/api/v3/coins/{id}?market_data=true`
//! Auth: none on the public tier.
//! Rate limit: roughly 10–30 calls/minute on the public tier, well above
//! one call per guild every five minutes.
//!
//! Only four figures are used, all optional:
//! `market_data.current_price.usd`, `market_data.total_volume.usd`,
//! `market_data.market_cap.usd` and `market_data.price_change_percentage_24h`.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use super::get_json;
use crate::config::SourcesConfig;
use crate::types::{FetchError, Fetched, MarketSnapshot};

const SOURCE_NAME: &str = "coingecko";
const QUOTE_CURRENCY: &str = "usd";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CoinResponse {
    #[serde(default)]
    market_data: Option<MarketData>,
}

/// Values are kept as raw JSON so one odd field (a string where a quote
/// map belongs, a null) does not fail the whole response.
#[derive(Debug, Default, Deserialize)]
struct MarketData {
    #[serde(default)]
    current_price: Option<Value>,
    #[serde(default)]
    total_volume: Option<Value>,
    #[serde(default)]
    market_cap: Option<Value>,
    #[serde(default)]
    price_change_percentage_24h: Option<Value>,
    #[serde(default)]
    price_change_percentage_24h_in_currency: Option<Value>,
}

fn quote(map: &Option<Value>) -> Option<f64> {
    map.as_ref()?.get(QUOTE_CURRENCY).and_then(Value::as_f64)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct MarketDataClient {
    http: Client,
    url: String,
}

impl MarketDataClient {
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent("soteria-stats/0.1.0")
            .build()
            .context("Failed to build HTTP client for market data")?;
        Ok(Self { http, url: config.market_url.clone() })
    }

    pub async fn fetch(&self) -> Fetched<MarketSnapshot> {
        let result = get_json(&self.http, &self.url, SOURCE_NAME)
            .await
            .and_then(parse_market);
        match &result {
            Ok(snapshot) => info!(
                price = ?snapshot.price,
                change_24h = ?snapshot.change_24h,
                "CoinGecko data retrieved"
            ),
            Err(e) => error!(error = %e, "Error fetching CoinGecko data"),
        }
        result
    }
}

fn parse_market(body: Value) -> Fetched<MarketSnapshot> {
    let resp: CoinResponse =
        serde_json::from_value(body).map_err(|e| FetchError::MalformedResponse {
            source_name: SOURCE_NAME.to_string(),
            message: e.to_string(),
        })?;
    let md = resp.market_data.unwrap_or_default();

    let change_24h = md
        .price_change_percentage_24h
        .as_ref()
        .and_then(Value::as_f64)
        .or_else(|| quote(&md.price_change_percentage_24h_in_currency));

    Ok(MarketSnapshot {
        price: quote(&md.current_price),
        volume_24h: quote(&md.total_volume),
        market_cap: quote(&md.market_cap),
        change_24h,
    })
}
