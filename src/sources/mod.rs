//! Data sources.
//!
//! Defines the `StatsSource` trait and the Soteria implementation that
//! gathers its figures from three independent endpoints:
//! - node JSON-RPC (difficulty, hashrate, block height)
//! - block explorer (coin supply)
//! - CoinGecko (price, volume, market cap, 24h change)

pub mod market;
pub mod rpc;
pub mod supply;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::SourcesConfig;
use crate::types::{FetchError, Fetched, RawStats};

use self::market::MarketDataClient;
use self::rpc::NodeRpcClient;
use self::supply::SupplyClient;

/// Anything that can produce one round of raw stats.
///
/// Implementations never fail as a whole: each field carries its own
/// result so one broken endpoint only blanks its own channels.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn collect(&self) -> RawStats;
}

/// Live Soteria endpoints.
pub struct SoteriaSources {
    rpc: NodeRpcClient,
    supply: SupplyClient,
    market: MarketDataClient,
}

impl SoteriaSources {
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        Ok(Self {
            rpc: NodeRpcClient::new(config)?,
            supply: SupplyClient::new(config)?,
            market: MarketDataClient::new(config)?,
        })
    }
}

#[async_trait]
impl StatsSource for SoteriaSources {
    async fn collect(&self) -> RawStats {
        let (difficulty, hashrate, block_height, supply, market) = tokio::join!(
            self.rpc.difficulty(),
            self.rpc.network_hashrate(),
            self.rpc.block_count(),
            self.supply.fetch(),
            self.market.fetch(),
        );

        let stats = RawStats { difficulty, hashrate, block_height, supply, market };
        debug!(failed_sources = stats.failed_sources(), "Stats collected");
        stats
    }
}

/// GET `url` and decode the body as JSON, mapping every failure into the
/// fetch error taxonomy.
pub(crate) async fn get_json(http: &Client, url: &str, source_name: &str) -> Fetched<Value> {
    let resp = http.get(url).send().await.map_err(|e| {
        error!(source = source_name, error = %e, "Request failed");
        FetchError::Transport { source_name: source_name.to_string(), message: e.to_string() }
    })?;

    let status = resp.status();
    if !status.is_success() {
        warn!(source = source_name, status = status.as_u16(), "Non-success status");
        return Err(FetchError::HttpStatus {
            source_name: source_name.to_string(),
            status: status.as_u16(),
        });
    }

    resp.json::<Value>().await.map_err(|e| FetchError::MalformedResponse {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}
