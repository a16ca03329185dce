//! Shared types for the stats bridge.
//!
//! The display keys, the raw per-cycle fetch results and the cycle
//! reports live here so that sources, formatting and the engine can
//! depend on them without depending on each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Display keys
// ---------------------------------------------------------------------------

/// One stat shown as a voice-channel label.
///
/// The label prefix both names a freshly created channel and identifies
/// an existing one on later cycles, so it must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKey {
    Members,
    Difficulty,
    Hashrate,
    BlockHeight,
    Supply,
    Price,
    Volume24h,
    MarketCap,
}

impl DisplayKey {
    /// Every key, in the order channels are reconciled.
    pub const ALL: [DisplayKey; 8] = [
        DisplayKey::Members,
        DisplayKey::Difficulty,
        DisplayKey::Hashrate,
        DisplayKey::BlockHeight,
        DisplayKey::Supply,
        DisplayKey::Price,
        DisplayKey::Volume24h,
        DisplayKey::MarketCap,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DisplayKey::Members => "Members:",
            DisplayKey::Difficulty => "Difficulty (SoterG):",
            DisplayKey::Hashrate => "Hashrate (SoterG): GH/s",
            DisplayKey::BlockHeight => "Block:",
            DisplayKey::Supply => "Supply:",
            DisplayKey::Price => "Price:",
            DisplayKey::Volume24h => "24h Volume: $",
            DisplayKey::MarketCap => "Market Cap: $",
        }
    }

    /// Full channel name for a rendered value.
    pub fn channel_name(self, value: &str) -> String {
        format!("{} {}", self.label(), value)
    }

    /// Whether an existing channel name belongs to this key.
    ///
    /// Matching is a prefix test on lower-cased, space-stripped names so a
    /// channel keeps matching after it has been renamed with a value.
    pub fn matches(self, channel_name: &str) -> bool {
        normalize(channel_name).starts_with(&normalize(self.label()))
    }
}

impl fmt::Display for DisplayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisplayKey::Members => "members",
            DisplayKey::Difficulty => "difficulty",
            DisplayKey::Hashrate => "hashrate",
            DisplayKey::BlockHeight => "block_height",
            DisplayKey::Supply => "supply",
            DisplayKey::Price => "price",
            DisplayKey::Volume24h => "volume_24h",
            DisplayKey::MarketCap => "market_cap",
        };
        write!(f, "{s}")
    }
}

/// Lower-case and drop spaces.
pub fn normalize(name: &str) -> String {
    name.to_lowercase().replace(' ', "").trim().to_string()
}

// ---------------------------------------------------------------------------
// Fetch results
// ---------------------------------------------------------------------------

/// Why a data point could not be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Transport failure ({source_name}): {message}")]
    Transport { source_name: String, message: String },

    #[error("HTTP {status} from {source_name}")]
    HttpStatus { source_name: String, status: u16 },

    #[error("Malformed response ({source_name}): {message}")]
    MalformedResponse { source_name: String, message: String },

    #[error("Not a number: {0}")]
    NotNumeric(String),

    #[error("No value returned for {0}")]
    Missing(String),

    #[error("RPC error ({method}): {message}")]
    Rpc { method: String, message: String },
}

pub type Fetched<T> = Result<T, FetchError>;

/// Market figures in USD. Each field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price: Option<f64>,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,
    /// 24h price change in percent.
    pub change_24h: Option<f64>,
}

/// Everything fetched for one guild update, held only for that update.
///
/// RPC values are kept as raw JSON because difficulty is displayed as-is
/// and the node is free to return numbers or strings.
#[derive(Debug, Clone)]
pub struct RawStats {
    pub difficulty: Fetched<serde_json::Value>,
    pub hashrate: Fetched<serde_json::Value>,
    pub block_height: Fetched<serde_json::Value>,
    /// Raw supply in base units, before scaling.
    pub supply: Fetched<f64>,
    pub market: Fetched<MarketSnapshot>,
}

impl RawStats {
    /// A bundle where every source failed with the same error.
    pub fn unavailable(err: FetchError) -> Self {
        Self {
            difficulty: Err(err.clone()),
            hashrate: Err(err.clone()),
            block_height: Err(err.clone()),
            supply: Err(err.clone()),
            market: Err(err),
        }
    }

    /// Number of sources that returned an error.
    pub fn failed_sources(&self) -> usize {
        [
            self.difficulty.is_err(),
            self.hashrate.is_err(),
            self.block_height.is_err(),
            self.supply.is_err(),
            self.market.is_err(),
        ]
        .iter()
        .filter(|failed| **failed)
        .count()
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of reconciling one guild.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GuildReport {
    pub guild_id: String,
    pub guild_name: String,
    pub category_created: bool,
    pub channels_created: usize,
    pub channels_renamed: usize,
    pub channels_unchanged: usize,
    pub channels_failed: usize,
    pub channels_locked: usize,
    pub lock_failures: usize,
    pub failed_sources: usize,
}

impl GuildReport {
    pub fn new(guild_id: &str, guild_name: &str) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            guild_name: guild_name.to_string(),
            ..Self::default()
        }
    }
}

/// Summary of one scheduled cycle across all guilds.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub guilds: Vec<GuildReport>,
    /// Guilds whose update aborted before reconciliation finished.
    pub guilds_failed: usize,
}

impl CycleReport {
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    pub fn channels_failed(&self) -> usize {
        self.guilds.iter().map(|g| g.channels_failed).sum()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle {} | guilds: {} ok, {} failed | channel failures: {} | {:.1}s",
            self.cycle_number,
            self.guilds.len(),
            self.guilds_failed,
            self.channels_failed(),
            self.duration_secs(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
