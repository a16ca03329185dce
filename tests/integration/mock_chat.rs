//! Mock chat platform and stats source for integration testing.
//!
//! `MockChat` keeps guilds, categories, channels and permission overwrites
//! in memory so tests can run full cycles and inspect the resulting
//! channel layout. Failures can be injected per operation.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use soteria_stats::chat::{BotIdentity, Channel, ChannelKind, ChatPlatform, Guild};
use soteria_stats::sources::StatsSource;
use soteria_stats::types::{MarketSnapshot, RawStats};

#[derive(Default)]
struct ChatState {
    /// (guild id, channel)
    channels: Vec<(String, Channel)>,
    denied: HashSet<String>,
    next_id: u64,
    categories_created: usize,
    channels_created: usize,
    renames: usize,
    guild_calls: usize,
}

/// In-memory chat platform.
pub struct MockChat {
    guilds: Vec<Guild>,
    member_count: Option<u64>,
    ready: bool,
    state: Arc<Mutex<ChatState>>,
    /// Renames to names starting with this prefix fail.
    fail_rename_prefix: Arc<Mutex<Option<String>>>,
    /// Category listing fails for this guild id.
    fail_guild: Arc<Mutex<Option<String>>>,
}

impl MockChat {
    pub fn new(guilds: &[(&str, &str)]) -> Self {
        Self {
            guilds: guilds
                .iter()
                .map(|(id, name)| Guild { id: id.to_string(), name: name.to_string() })
                .collect(),
            member_count: Some(2048),
            ready: true,
            state: Arc::new(Mutex::new(ChatState::default())),
            fail_rename_prefix: Arc::new(Mutex::new(None)),
            fail_guild: Arc::new(Mutex::new(None)),
        }
    }

    pub fn single() -> Self {
        Self::new(&[("g1", "Soteria")])
    }

    pub fn with_member_count(mut self, count: Option<u64>) -> Self {
        self.member_count = count;
        self
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn fail_renames_starting_with(&self, prefix: &str) {
        *self.fail_rename_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    pub fn fail_guild(&self, guild_id: &str) {
        *self.fail_guild.lock().unwrap() = Some(guild_id.to_string());
    }

    /// Seed a channel as if it had been created by hand or a past cycle.
    pub fn insert(&self, guild_id: &str, name: &str, kind: ChannelKind, parent: Option<&str>) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("seed-{}", state.next_id);
        state.channels.push((
            guild_id.to_string(),
            Channel {
                id: id.clone(),
                name: name.to_string(),
                kind,
                parent_id: parent.map(String::from),
            },
        ));
        id
    }

    pub fn categories_in(&self, guild_id: &str) -> Vec<Channel> {
        self.of_kind(guild_id, ChannelKind::Category)
    }

    pub fn voice_in(&self, guild_id: &str, category_id: &str) -> Vec<Channel> {
        self.of_kind(guild_id, ChannelKind::Voice)
            .into_iter()
            .filter(|c| c.parent_id.as_deref() == Some(category_id))
            .collect()
    }

    /// Names of the voice channels under the guild's only category.
    pub fn display_names(&self, guild_id: &str) -> Vec<String> {
        let categories = self.categories_in(guild_id);
        assert_eq!(categories.len(), 1, "expected exactly one category");
        self.voice_in(guild_id, &categories[0].id)
            .into_iter()
            .map(|c| c.name)
            .collect()
    }

    pub fn is_denied(&self, channel_id: &str) -> bool {
        self.state.lock().unwrap().denied.contains(channel_id)
    }

    pub fn categories_created(&self) -> usize {
        self.state.lock().unwrap().categories_created
    }

    pub fn channels_created(&self) -> usize {
        self.state.lock().unwrap().channels_created
    }

    pub fn renames(&self) -> usize {
        self.state.lock().unwrap().renames
    }

    pub fn guild_calls(&self) -> usize {
        self.state.lock().unwrap().guild_calls
    }

    fn of_kind(&self, guild_id: &str, kind: ChannelKind) -> Vec<Channel> {
        self.state
            .lock()
            .unwrap()
            .channels
            .iter()
            .filter(|(g, c)| g == guild_id && c.kind == kind)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn create(&self, guild_id: &str, name: &str, kind: ChannelKind, parent: Option<&str>) -> Channel {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let channel = Channel {
            id: format!("ch-{}", state.next_id),
            name: name.to_string(),
            kind,
            parent_id: parent.map(String::from),
        };
        state.channels.push((guild_id.to_string(), channel.clone()));
        channel
    }
}

#[async_trait]
impl ChatPlatform for MockChat {
    async fn ready(&self) -> Result<BotIdentity> {
        if !self.ready {
            return Err(anyhow!("401: Unauthorized"));
        }
        Ok(BotIdentity { id: "bot".to_string(), username: "soteria-stats".to_string() })
    }

    async fn guilds(&self) -> Result<Vec<Guild>> {
        self.state.lock().unwrap().guild_calls += 1;
        Ok(self.guilds.clone())
    }

    async fn member_count(&self, _guild_id: &str) -> Result<Option<u64>> {
        Ok(self.member_count)
    }

    async fn categories(&self, guild_id: &str) -> Result<Vec<Channel>> {
        if self.fail_guild.lock().unwrap().as_deref() == Some(guild_id) {
            return Err(anyhow!("500: Internal Server Error"));
        }
        Ok(self.categories_in(guild_id))
    }

    async fn create_category(&self, guild_id: &str, name: &str) -> Result<Channel> {
        self.state.lock().unwrap().categories_created += 1;
        Ok(self.create(guild_id, name, ChannelKind::Category, None))
    }

    async fn voice_channels(&self, guild_id: &str, category_id: &str) -> Result<Vec<Channel>> {
        Ok(self.voice_in(guild_id, category_id))
    }

    async fn create_voice_channel(
        &self,
        guild_id: &str,
        category_id: &str,
        name: &str,
    ) -> Result<Channel> {
        self.state.lock().unwrap().channels_created += 1;
        Ok(self.create(guild_id, name, ChannelKind::Voice, Some(category_id)))
    }

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<()> {
        if let Some(prefix) = self.fail_rename_prefix.lock().unwrap().as_deref() {
            if name.starts_with(prefix) {
                return Err(anyhow!("429: rate limited"));
            }
        }
        let mut state = self.state.lock().unwrap();
        let channel = state
            .channels
            .iter_mut()
            .find(|(_, c)| c.id == channel_id)
            .ok_or_else(|| anyhow!("404: Unknown Channel"))?;
        channel.1.name = name.to_string();
        state.renames += 1;
        Ok(())
    }

    async fn deny_connect(&self, _guild_id: &str, channel_id: &str) -> Result<()> {
        self.state.lock().unwrap().denied.insert(channel_id.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A stats source that always returns the same bundle.
pub struct FixedStats {
    stats: RawStats,
    calls: AtomicUsize,
}

impl FixedStats {
    pub fn new(stats: RawStats) -> Self {
        Self { stats, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsSource for FixedStats {
    async fn collect(&self) -> RawStats {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.stats.clone()
    }
}

/// Healthy figures for every source.
pub fn healthy_stats() -> RawStats {
    RawStats {
        difficulty: Ok(serde_json::json!(0.0421)),
        hashrate: Ok(serde_json::json!(1_234_567_890u64)),
        block_height: Ok(serde_json::json!(1_048_576)),
        supply: Ok(2_500_000_000_000.0),
        market: Ok(MarketSnapshot {
            price: Some(0.000123),
            volume_24h: Some(4_521.77),
            market_cap: Some(310_000.0),
            change_24h: Some(2.0),
        }),
    }
}

/// The channel names a cycle over `healthy_stats` with 2,048 members
/// should produce.
pub fn expected_healthy_names() -> Vec<String> {
    vec![
        "Members: 2,048".to_string(),
        "Difficulty (SoterG): 0.0421".to_string(),
        "Hashrate (SoterG): GH/s 1.235".to_string(),
        "Block: 1,048,576".to_string(),
        "Supply: 2,500.00B SOTER".to_string(),
        "Price: $0.000123 (▲ +2.00% 24h)".to_string(),
        "24h Volume: $ 4,522".to_string(),
        "Market Cap: $ 310,000".to_string(),
    ]
}
