//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` (or the path in `SOTERIA_STATS_CONFIG`) into
//! strongly-typed structs. Every field has a default, so a missing file is
//! not an error. Endpoint URLs may be overridden from the environment and
//! the bot token is only ever read from the environment.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "SOTERIA_STATS_CONFIG";

const DEFAULT_RPC_URL: &str = "https://soteria-rpc-mainnet.soteria-network.site/rpc";
const DEFAULT_SUPPLY_URL: &str = "https://explorer.soteria-network.site/api/getcoinsupply";
const DEFAULT_MARKET_URL: &str = "https://api.coingecko.com/api/v3/coins/soteria?localization=false&tickers=false&market_data=true&community_data=false&developer_data=false&sparkline=false";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotConfig {
    /// Exact name of the category holding the stat channels.
    pub category_name: String,
    pub update_interval_secs: u64,
    /// Minimum gap between two channel mutations.
    pub mutation_delay_ms: u64,
    /// Name of the environment variable holding the bot token.
    pub token_env: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            category_name: "Soteria Server Stats".to_string(),
            update_interval_secs: 300,
            mutation_delay_ms: 500,
            token_env: "DISCORD_BOT_TOKEN".to_string(),
            api_base_url: "https://discord.com/api/v10".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    pub rpc_url: String,
    pub supply_url: String,
    pub market_url: String,
    /// Algorithm argument passed to `getnetworkhashps`.
    pub hashrate_algo: String,
    pub request_timeout_secs: u64,
    /// Basic-auth credentials for the node, if it requires them.
    #[serde(skip)]
    pub rpc_user: Option<String>,
    #[serde(skip)]
    pub rpc_password: Option<SecretString>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            supply_url: DEFAULT_SUPPLY_URL.to_string(),
            market_url: DEFAULT_MARKET_URL.to_string(),
            hashrate_algo: "soterg".to_string(),
            request_timeout_secs: 15,
            rpc_user: None,
            rpc_password: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            warn!(path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the path named by `SOTERIA_STATS_CONFIG` (or the default
    /// path) and apply environment overrides.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::load(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        info!(
            rpc_url = %config.sources.rpc_url,
            supply_url = %config.sources.supply_url,
            category = %config.bot.category_name,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("SOTERIA_RPC_URL") {
            self.sources.rpc_url = url;
        }
        if let Some(url) = non_empty("SOTERIA_SUPPLY_URL") {
            self.sources.supply_url = url;
        }
        if let Some(url) = non_empty("COINGECKO_URL") {
            self.sources.market_url = url;
        }
        if let Some(user) = non_empty("SOTERIA_RPC_USER") {
            self.sources.rpc_user = Some(user);
        }
        if let Some(password) = non_empty("SOTERIA_RPC_PASSWORD") {
            self.sources.rpc_password = Some(SecretString::new(password));
        }
    }

    fn validate(&self) -> Result<()> {
        if self.bot.update_interval_secs == 0 {
            anyhow::bail!("bot.update_interval_secs must be greater than zero");
        }
        if self.bot.category_name.trim().is_empty() {
            anyhow::bail!("bot.category_name must not be empty");
        }
        Ok(())
    }

    /// Resolve the bot token from the configured environment variable.
    pub fn bot_token(&self) -> Result<SecretString> {
        let token = std::env::var(&self.bot.token_env)
            .with_context(|| format!("Environment variable not set: {}", self.bot.token_env))?;
        Ok(SecretString::new(token))
    }
}

impl BotConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn mutation_delay(&self) -> Duration {
        Duration::from_millis(self.mutation_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SourcesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
