//! soteria-stats — Soteria network stats bridge
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects to Discord and runs the refresh loop with graceful shutdown.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use soteria_stats::chat::discord::DiscordClient;
use soteria_stats::config::AppConfig;
use soteria_stats::engine::cycle::StatsCycle;
use soteria_stats::engine::scheduler::Scheduler;
use soteria_stats::sources::SoteriaSources;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let cfg = AppConfig::from_env()?;
    let token = cfg.bot_token()?;

    info!(
        category = %cfg.bot.category_name,
        interval_secs = cfg.bot.update_interval_secs,
        mutation_delay_ms = cfg.bot.mutation_delay_ms,
        "soteria-stats starting up"
    );

    let platform = Arc::new(DiscordClient::new(&cfg.bot, token)?);
    let sources = Arc::new(SoteriaSources::new(&cfg.sources)?);
    let cycle = StatsCycle::new(platform, sources, &cfg.bot);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let cycles = Scheduler::new(cycle, cfg.bot.update_interval())
        .run(shutdown)
        .await?;

    info!(cycles, "soteria-stats shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("soteria_stats=info"));

    let json_logging = std::env::var("SOTERIA_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
