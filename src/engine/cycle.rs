//! One refresh cycle.
//!
//! Holds the explicit context a cycle needs (platform handle, stats
//! source, category name, pacer) and walks every guild sequentially:
//! fetch → format → reconcile. A failing guild is logged and skipped.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::pacer::MutationPacer;
use super::reconciler::Reconciler;
use crate::chat::{ChatPlatform, Guild};
use crate::config::BotConfig;
use crate::format;
use crate::sources::StatsSource;
use crate::types::{CycleReport, GuildReport};

pub struct StatsCycle {
    platform: Arc<dyn ChatPlatform>,
    source: Arc<dyn StatsSource>,
    category_name: String,
    pacer: MutationPacer,
    cycle_count: u64,
}

impl StatsCycle {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        source: Arc<dyn StatsSource>,
        config: &BotConfig,
    ) -> Self {
        Self {
            platform,
            source,
            category_name: config.category_name.clone(),
            pacer: MutationPacer::new(config.mutation_delay()),
            cycle_count: 0,
        }
    }

    pub fn platform(&self) -> &dyn ChatPlatform {
        self.platform.as_ref()
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Fetch, format and reconcile a single guild.
    pub async fn update_guild(&mut self, guild: &Guild) -> Result<GuildReport> {
        let stats = self.source.collect().await;

        let members = match self.platform.member_count(&guild.id).await {
            Ok(count) => count,
            Err(e) => {
                warn!(guild = %guild.name, error = %e, "Member count unavailable");
                None
            }
        };

        let values = format::render(&stats, members);

        let mut reconciler =
            Reconciler::new(self.platform.as_ref(), &self.category_name, &mut self.pacer);
        let mut report = reconciler.reconcile_guild(guild, &values).await?;
        report.failed_sources = stats.failed_sources();
        Ok(report)
    }

    /// Run one cycle across every guild the bot belongs to.
    ///
    /// Fails only if the guild list itself cannot be read.
    pub async fn run(&mut self) -> Result<CycleReport> {
        self.cycle_count += 1;
        let started_at = Utc::now();
        info!(cycle = self.cycle_count, "Starting cycle");

        let guilds = self
            .platform
            .guilds()
            .await
            .context("Failed to list guilds")?;

        let mut reports = Vec::with_capacity(guilds.len());
        let mut guilds_failed = 0;

        for guild in &guilds {
            info!(guild = %guild.name, guild_id = %guild.id, "Updating stats for guild");
            match self.update_guild(guild).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(
                        guild = %guild.name,
                        guild_id = %guild.id,
                        error = format!("{e:#}"),
                        "Error updating stats channels"
                    );
                    guilds_failed += 1;
                }
            }
        }

        Ok(CycleReport {
            cycle_number: self.cycle_count,
            started_at,
            finished_at: Utc::now(),
            guilds: reports,
            guilds_failed,
        })
    }
}
