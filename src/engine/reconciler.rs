//! Channel reconciliation.
//!
//! Makes a guild's stats category match the rendered values: one voice
//! channel per display key, named `"<label> <value>"`, all closed to the
//! default role. Channels are found by label prefix rather than by stored
//! id, so nothing has to survive between cycles. Nothing is ever deleted.

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::pacer::MutationPacer;
use crate::chat::{Channel, ChatPlatform, Guild};
use crate::types::{DisplayKey, GuildReport};

/// What happened to a single display channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    Created,
    Renamed,
    Unchanged,
}

pub struct Reconciler<'a> {
    platform: &'a dyn ChatPlatform,
    category_name: &'a str,
    pacer: &'a mut MutationPacer,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        platform: &'a dyn ChatPlatform,
        category_name: &'a str,
        pacer: &'a mut MutationPacer,
    ) -> Self {
        Self { platform, category_name, pacer }
    }

    /// Find the stats category by exact name, creating it if absent.
    ///
    /// Returns the category and whether it was created.
    pub async fn resolve_category(&mut self, guild_id: &str) -> Result<(Channel, bool)> {
        let categories = self
            .platform
            .categories(guild_id)
            .await
            .context("Failed to list categories")?;

        if let Some(existing) = categories.into_iter().find(|c| c.name == self.category_name) {
            debug!(guild_id, category_id = %existing.id, "Stats category found");
            return Ok((existing, false));
        }

        info!(guild_id, name = self.category_name, "Creating category");
        self.pacer.wait().await;
        let created = self
            .platform
            .create_category(guild_id, self.category_name)
            .await
            .with_context(|| format!("Failed to create category '{}'", self.category_name))?;
        Ok((created, true))
    }

    /// Find the channel for `key` inside `category`, creating one named
    /// after the bare label if none matches.
    async fn find_or_create(
        &mut self,
        guild_id: &str,
        category: &Channel,
        key: DisplayKey,
    ) -> Result<(Channel, bool)> {
        let channels = self
            .platform
            .voice_channels(guild_id, &category.id)
            .await
            .context("Failed to list voice channels")?;

        if let Some(existing) = channels
            .into_iter()
            .find(|c| c.is_voice_in(category) && key.matches(&c.name))
        {
            return Ok((existing, false));
        }

        self.pacer.wait().await;
        let created = self
            .platform
            .create_voice_channel(guild_id, &category.id, key.label())
            .await
            .with_context(|| format!("Failed to create channel for {key}"))?;
        Ok((created, true))
    }

    /// Ensure the channel for `key` exists and shows `value`.
    pub async fn reconcile(
        &mut self,
        guild_id: &str,
        category: &Channel,
        key: DisplayKey,
        value: &str,
    ) -> Result<ChannelOutcome> {
        let (channel, created) = self.find_or_create(guild_id, category, key).await?;
        let target = key.channel_name(value);

        if channel.name == target {
            debug!(channel_id = %channel.id, name = %target, "Channel already up to date");
            return Ok(if created { ChannelOutcome::Created } else { ChannelOutcome::Unchanged });
        }

        self.pacer.wait().await;
        self.platform
            .rename_channel(&channel.id, &target)
            .await
            .with_context(|| format!("Failed to rename channel for {key}"))?;
        debug!(channel_id = %channel.id, name = %target, "Channel renamed");

        Ok(if created { ChannelOutcome::Created } else { ChannelOutcome::Renamed })
    }

    /// Deny connect to the default role on every voice channel in the
    /// category. Returns `(locked, failed)`.
    pub async fn lock_category(&mut self, guild_id: &str, category: &Channel) -> (usize, usize) {
        let channels = match self.platform.voice_channels(guild_id, &category.id).await {
            Ok(channels) => channels,
            Err(e) => {
                error!(guild_id, error = %e, "Failed to list channels for locking");
                return (0, 1);
            }
        };

        let (mut locked, mut failed) = (0, 0);
        for channel in channels {
            if !channel.is_voice_in(category) {
                debug!(channel_id = %channel.id, "Skipping channel outside stats category");
                continue;
            }
            self.pacer.wait().await;
            match self.platform.deny_connect(guild_id, &channel.id).await {
                Ok(()) => locked += 1,
                Err(e) => {
                    error!(channel_id = %channel.id, error = %e, "Error setting channel private");
                    failed += 1;
                }
            }
        }
        (locked, failed)
    }

    /// Reconcile every rendered value for one guild, then lock the category.
    ///
    /// Only a category that can be neither found nor created aborts the
    /// guild; each channel failure is logged and counted.
    pub async fn reconcile_guild(
        &mut self,
        guild: &Guild,
        values: &[(DisplayKey, String)],
    ) -> Result<GuildReport> {
        let mut report = GuildReport::new(&guild.id, &guild.name);

        let (category, created) = self.resolve_category(&guild.id).await?;
        report.category_created = created;

        for (key, value) in values {
            match self.reconcile(&guild.id, &category, *key, value).await {
                Ok(ChannelOutcome::Created) => report.channels_created += 1,
                Ok(ChannelOutcome::Renamed) => report.channels_renamed += 1,
                Ok(ChannelOutcome::Unchanged) => report.channels_unchanged += 1,
                Err(e) => {
                    error!(guild = %guild.name, key = %key, error = format!("{e:#}"), "Error updating channel");
                    report.channels_failed += 1;
                }
            }
        }

        let (locked, lock_failures) = self.lock_category(&guild.id, &category).await;
        report.channels_locked = locked;
        report.lock_failures = lock_failures;

        if report.channels_failed > 0 || lock_failures > 0 {
            warn!(
                guild = %guild.name,
                channels_failed = report.channels_failed,
                lock_failures,
                "Guild updated with failures"
            );
        }

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
