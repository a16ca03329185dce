//! Chat platform integration.
//!
//! Defines the `ChatPlatform` trait — the handful of guild and channel
//! operations the stats cycle needs — and the Discord REST implementation.

pub mod discord;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A server the bot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Category,
    Voice,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
    /// Id of the enclosing category, if any.
    pub parent_id: Option<String>,
}

impl Channel {
    /// Whether this is a voice channel directly inside `category`.
    pub fn is_voice_in(&self, category: &Channel) -> bool {
        self.kind == ChannelKind::Voice && self.parent_id.as_deref() == Some(category.id.as_str())
    }
}

/// The identity the bot is connected as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: String,
    pub username: String,
}

/// Abstraction over the chat platform's display surface.
///
/// All calls are independent; callers decide how failures are isolated.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Authenticate and report the connected identity. No other call
    /// should be made before this succeeds.
    async fn ready(&self) -> Result<BotIdentity>;

    /// Every guild the bot currently belongs to.
    async fn guilds(&self) -> Result<Vec<Guild>>;

    /// Member count of a guild, if the platform reports one.
    async fn member_count(&self, guild_id: &str) -> Result<Option<u64>>;

    /// All category channels in a guild.
    async fn categories(&self, guild_id: &str) -> Result<Vec<Channel>>;

    async fn create_category(&self, guild_id: &str, name: &str) -> Result<Channel>;

    /// Voice channels whose parent is `category_id`.
    async fn voice_channels(&self, guild_id: &str, category_id: &str) -> Result<Vec<Channel>>;

    async fn create_voice_channel(
        &self,
        guild_id: &str,
        category_id: &str,
        name: &str,
    ) -> Result<Channel>;

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<()>;

    /// Deny the connect permission to the guild's default role on a channel.
    async fn deny_connect(&self, guild_id: &str, channel_id: &str) -> Result<()>;

    /// Platform name for logging.
    fn name(&self) -> &str;
}
