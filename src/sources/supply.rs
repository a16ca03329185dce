//! Circulating supply from the block explorer.
//!
//! `GET /api/getcoinsupply` returns `{"coinsupply": <number|string>}`.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::get_json;
use crate::config::SourcesConfig;
use crate::types::{FetchError, Fetched};

const SOURCE_NAME: &str = "supply";

pub struct SupplyClient {
    http: Client,
    url: String,
}

impl SupplyClient {
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent("soteria-stats/0.1.0")
            .build()
            .context("Failed to build HTTP client for supply endpoint")?;
        Ok(Self { http, url: config.supply_url.clone() })
    }

    /// Raw coin supply, unscaled.
    pub async fn fetch(&self) -> Fetched<f64> {
        let result = get_json(&self.http, &self.url, SOURCE_NAME)
            .await
            .and_then(|body| parse_supply(&body));
        match &result {
            Ok(supply) => debug!(supply, "Coin supply fetched"),
            Err(e) => warn!(error = %e, "Coin supply unavailable"),
        }
        result
    }
}

fn parse_supply(body: &Value) -> Fetched<f64> {
    let raw = body.get("coinsupply").ok_or_else(|| FetchError::MalformedResponse {
        source_name: SOURCE_NAME.to_string(),
        message: "missing `coinsupply` field".to_string(),
    })?;

    let supply = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    supply
        .filter(|s| s.is_finite())
        .ok_or_else(|| FetchError::NotNumeric(format!("coinsupply = {raw}")))
}
