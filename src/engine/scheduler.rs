//! Cycle scheduler.
//!
//! Waits for the chat platform to report ready, then runs a cycle
//! immediately and once per interval until the shutdown future resolves.
//! Cycles never overlap: a slow cycle delays the next tick.

use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::cycle::StatsCycle;
use crate::types::CycleReport;

pub struct Scheduler {
    cycle: StatsCycle,
    interval: Duration,
}

impl Scheduler {
    pub fn new(cycle: StatsCycle, interval: Duration) -> Self {
        Self { cycle, interval }
    }

    /// Run until `shutdown` resolves. Returns the number of cycles run.
    pub async fn run<F>(mut self, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        let identity = self
            .cycle
            .platform()
            .ready()
            .await
            .with_context(|| format!("{} never became ready", self.cycle.platform().name()))?;

        info!(
            bot = %identity.username,
            interval_secs = self.interval.as_secs(),
            "Entering update loop. Press Ctrl+C to stop."
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.cycle.run().await {
                        Ok(report) => log_cycle_report(&report),
                        Err(e) => error!(error = format!("{e:#}"), "Cycle failed — continuing to next"),
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received.");
                    break;
                }
            }
        }

        Ok(self.cycle.cycle_count())
    }
}

/// Log a one-line cycle summary.
fn log_cycle_report(report: &CycleReport) {
    let created: usize = report.guilds.iter().map(|g| g.channels_created).sum();
    let renamed: usize = report.guilds.iter().map(|g| g.channels_renamed).sum();
    let locked: usize = report.guilds.iter().map(|g| g.channels_locked).sum();
    info!(
        cycle = report.cycle_number,
        guilds = report.guilds.len(),
        guilds_failed = report.guilds_failed,
        created,
        renamed,
        locked,
        channels_failed = report.channels_failed(),
        duration = format!("{:.1}s", report.duration_secs()),
        "Cycle complete"
    );
}
