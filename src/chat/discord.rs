//! Discord REST integration.
//!
//! Drives guild categories and voice channels through the HTTP API only;
//! no gateway session is opened. `ready` resolves the bot's identity, which
//! is the first call to fail if the token is wrong.
//!
//! API docs: https://discord.com/developers/docs/resources/channel
//! Base URL: https://discord.com/api/v10
//! Auth: `Authorization: Bot {token}`
//! Rate limit: per-route buckets; a 429 carries `retry_after` seconds.
//! Channel renames are limited to 2 per 10 minutes per channel.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{BotIdentity, Channel, ChannelKind, ChatPlatform, Guild};
use crate::config::BotConfig;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const PLATFORM_NAME: &str = "discord";

/// `GUILD_CATEGORY` channel type.
const CHANNEL_TYPE_CATEGORY: u8 = 4;

/// `GUILD_VOICE` channel type.
const CHANNEL_TYPE_VOICE: u8 = 2;

/// `CONNECT` permission bit.
const PERMISSION_CONNECT: u64 = 1 << 20;

/// Permission overwrite target type for roles.
const OVERWRITE_TYPE_ROLE: u8 = 0;

/// Page size for `/users/@me/guilds` (API maximum).
const GUILD_PAGE_LIMIT: usize = 200;

const AUDIT_REASON: &str = "Soteria network stats update";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct DiscordGuild {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    approximate_member_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DiscordChannel {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
}

impl From<DiscordChannel> for Channel {
    fn from(c: DiscordChannel) -> Self {
        let kind = match c.kind {
            CHANNEL_TYPE_CATEGORY => ChannelKind::Category,
            CHANNEL_TYPE_VOICE => ChannelKind::Voice,
            _ => ChannelKind::Other,
        };
        Channel {
            id: c.id,
            name: c.name.unwrap_or_default(),
            kind,
            parent_id: c.parent_id,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateChannel<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RateLimited {
    #[serde(default)]
    retry_after: f64,
    #[serde(default)]
    global: bool,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Discord bot client over the REST API.
pub struct DiscordClient {
    http: Client,
    base_url: String,
    token: SecretString,
}

impl DiscordClient {
    pub fn new(config: &BotConfig, token: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent("DiscordBot (https://soteria-network.site, 0.1.0)")
            .build()
            .context("Failed to build HTTP client for Discord")?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    // -- Internal helpers ------------------------------------------------

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        debug!(method = %method, url = %url, "Discord request");
        self.http
            .request(method, url)
            .header("Authorization", format!("Bot {}", self.token.expose_secret()))
    }

    /// Attach the audit-log reason shown in the guild's audit log.
    fn mutation(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path)
            .header("X-Audit-Log-Reason", urlencoding::encode(AUDIT_REASON).into_owned())
    }

    /// Send and turn non-success statuses into errors.
    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let resp = builder
            .send()
            .await
            .with_context(|| format!("Discord {what} request failed"))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        if status.as_u16() == 429 {
            let limit: Option<RateLimited> = serde_json::from_str(&body).ok();
            let (retry_after, global) = limit.map(|l| (l.retry_after, l.global)).unwrap_or((0.0, false));
            warn!(what, retry_after, global, "Discord rate limit hit");
            anyhow::bail!("Discord {what} rate limited (retry after {retry_after:.1}s)");
        }
        anyhow::bail!("Discord {what} failed {status}: {body}");
    }

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>> {
        let resp = self
            .send(
                self.request(Method::GET, &format!("/guilds/{guild_id}/channels")),
                "list channels",
            )
            .await?;
        let channels: Vec<DiscordChannel> = resp
            .json()
            .await
            .context("Failed to parse Discord channel list")?;
        Ok(channels.into_iter().map(Channel::from).collect())
    }

    async fn create_channel(&self, guild_id: &str, body: CreateChannel<'_>) -> Result<Channel> {
        let resp = self
            .send(
                self.mutation(Method::POST, &format!("/guilds/{guild_id}/channels"))
                    .json(&body),
                "create channel",
            )
            .await?;
        let channel: DiscordChannel = resp
            .json()
            .await
            .context("Failed to parse created Discord channel")?;
        Ok(channel.into())
    }
}

/// Overwrite body denying `CONNECT` to a role and allowing nothing.
fn deny_connect_overwrite() -> serde_json::Value {
    json!({
        "type": OVERWRITE_TYPE_ROLE,
        "allow": "0",
        "deny": PERMISSION_CONNECT.to_string(),
    })
}

// ---------------------------------------------------------------------------
// ChatPlatform trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn ready(&self) -> Result<BotIdentity> {
        let resp = self
            .send(self.request(Method::GET, "/users/@me"), "identify")
            .await?;
        let user: DiscordUser = resp
            .json()
            .await
            .context("Failed to parse Discord user")?;
        info!(bot_id = %user.id, username = %user.username, "Bot is ready");
        Ok(BotIdentity { id: user.id, username: user.username })
    }

    /// Page through `/users/@me/guilds` until a short page comes back.
    async fn guilds(&self) -> Result<Vec<Guild>> {
        let mut all = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut path = format!("/users/@me/guilds?limit={GUILD_PAGE_LIMIT}");
            if let Some(last) = &after {
                path.push_str(&format!("&after={last}"));
            }
            let resp = self.send(self.request(Method::GET, &path), "list guilds").await?;
            let page: Vec<DiscordGuild> = resp
                .json()
                .await
                .context("Failed to parse Discord guild list")?;

            let page_len = page.len();
            after = page.last().map(|g| g.id.clone());
            all.extend(page.into_iter().map(|g| Guild { id: g.id, name: g.name }));

            if page_len < GUILD_PAGE_LIMIT {
                break;
            }
        }

        debug!(count = all.len(), "Discord guilds listed");
        Ok(all)
    }

    async fn member_count(&self, guild_id: &str) -> Result<Option<u64>> {
        let resp = self
            .send(
                self.request(Method::GET, &format!("/guilds/{guild_id}?with_counts=true")),
                "get guild",
            )
            .await?;
        let guild: DiscordGuild = resp
            .json()
            .await
            .context("Failed to parse Discord guild")?;
        Ok(guild.approximate_member_count)
    }

    async fn categories(&self, guild_id: &str) -> Result<Vec<Channel>> {
        Ok(self
            .guild_channels(guild_id)
            .await?
            .into_iter()
            .filter(|c| c.kind == ChannelKind::Category)
            .collect())
    }

    async fn create_category(&self, guild_id: &str, name: &str) -> Result<Channel> {
        let category = self
            .create_channel(
                guild_id,
                CreateChannel { name, kind: CHANNEL_TYPE_CATEGORY, parent_id: None },
            )
            .await?;
        info!(guild_id, category_id = %category.id, name, "Discord category created");
        Ok(category)
    }

    async fn voice_channels(&self, guild_id: &str, category_id: &str) -> Result<Vec<Channel>> {
        Ok(self
            .guild_channels(guild_id)
            .await?
            .into_iter()
            .filter(|c| c.kind == ChannelKind::Voice && c.parent_id.as_deref() == Some(category_id))
            .collect())
    }

    async fn create_voice_channel(
        &self,
        guild_id: &str,
        category_id: &str,
        name: &str,
    ) -> Result<Channel> {
        let channel = self
            .create_channel(
                guild_id,
                CreateChannel { name, kind: CHANNEL_TYPE_VOICE, parent_id: Some(category_id) },
            )
            .await?;
        info!(guild_id, channel_id = %channel.id, name, "Discord voice channel created");
        Ok(channel)
    }

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<()> {
        self.send(
            self.mutation(Method::PATCH, &format!("/channels/{channel_id}"))
                .json(&json!({ "name": name })),
            "rename channel",
        )
        .await?;
        Ok(())
    }

    /// The @everyone role shares its id with the guild.
    async fn deny_connect(&self, guild_id: &str, channel_id: &str) -> Result<()> {
        self.send(
            self.mutation(Method::PUT, &format!("/channels/{channel_id}/permissions/{guild_id}"))
                .json(&deny_connect_overwrite()),
            "edit permissions",
        )
        .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        PLATFORM_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
