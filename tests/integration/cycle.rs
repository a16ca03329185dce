//! Full-cycle reconciliation tests.

use std::sync::Arc;
use tokio_test::assert_ok;

use soteria_stats::chat::ChannelKind;
use soteria_stats::config::BotConfig;
use soteria_stats::engine::cycle::StatsCycle;
use soteria_stats::types::{FetchError, RawStats};

use crate::mock_chat::{expected_healthy_names, healthy_stats, FixedStats, MockChat};

fn test_config() -> BotConfig {
    BotConfig { mutation_delay_ms: 0, ..BotConfig::default() }
}

fn cycle_with(chat: &Arc<MockChat>, stats: RawStats) -> StatsCycle {
    StatsCycle::new(chat.clone(), Arc::new(FixedStats::new(stats)), &test_config())
}

#[tokio::test]
async fn test_first_cycle_builds_category_and_channels() {
    let chat = Arc::new(MockChat::single());
    let mut cycle = cycle_with(&chat, healthy_stats());

    let report = assert_ok!(cycle.run().await);

    assert_eq!(report.cycle_number, 1);
    assert_eq!(report.guilds_failed, 0);
    assert_eq!(report.guilds.len(), 1);
    let guild = &report.guilds[0];
    assert!(guild.category_created);
    assert_eq!(guild.channels_created, 8);
    assert_eq!(guild.channels_failed, 0);
    assert_eq!(guild.channels_locked, 8);
    assert_eq!(guild.failed_sources, 0);

    assert_eq!(chat.categories_in("g1")[0].name, "Soteria Server Stats");
    assert_eq!(chat.display_names("g1"), expected_healthy_names());
}

#[tokio::test]
async fn test_repeated_cycles_are_idempotent() {
    let chat = Arc::new(MockChat::single());
    let mut cycle = cycle_with(&chat, healthy_stats());

    assert_ok!(cycle.run().await);
    let renames_after_first = chat.renames();
    let report = assert_ok!(cycle.run().await);

    assert_eq!(chat.categories_created(), 1);
    assert_eq!(chat.channels_created(), 8);
    assert_eq!(chat.display_names("g1"), expected_healthy_names());

    let guild = &report.guilds[0];
    assert!(!guild.category_created);
    assert_eq!(guild.channels_created, 0);
    assert_eq!(guild.channels_unchanged, 8);
    assert_eq!(chat.renames(), renames_after_first);
}

#[tokio::test]
async fn test_category_created_once_for_all_keys() {
    let chat = Arc::new(MockChat::single());
    let mut cycle = cycle_with(&chat, healthy_stats());

    assert_ok!(cycle.run().await);

    assert_eq!(chat.categories_created(), 1);
    assert_eq!(chat.categories_in("g1").len(), 1);
}

#[tokio::test]
async fn test_existing_channels_are_reused_after_rename() {
    let chat = Arc::new(MockChat::single());
    let cat = chat.insert("g1", "Soteria Server Stats", ChannelKind::Category, None);
    let members = chat.insert("g1", "members : 3", ChannelKind::Voice, Some(&cat));
    let block = chat.insert("g1", "BLOCK: 17", ChannelKind::Voice, Some(&cat));

    let mut cycle = cycle_with(&chat, healthy_stats());
    let report = assert_ok!(cycle.run().await);

    let guild = &report.guilds[0];
    assert!(!guild.category_created);
    assert_eq!(guild.channels_created, 6);
    assert_eq!(guild.channels_renamed, 2);
    assert_eq!(chat.categories_created(), 0);

    let voice = chat.voice_in("g1", &cat);
    assert_eq!(voice.len(), 8);
    let name_of = |id: &str| voice.iter().find(|c| c.id == id).unwrap().name.clone();
    assert_eq!(name_of(members.as_str()), "Members: 2,048");
    assert_eq!(name_of(block.as_str()), "Block: 1,048,576");
}

#[tokio::test]
async fn test_failed_rename_does_not_block_other_keys() {
    let chat = Arc::new(MockChat::single());
    chat.fail_renames_starting_with("Price:");
    let mut cycle = cycle_with(&chat, healthy_stats());

    let report = assert_ok!(cycle.run().await);

    let guild = &report.guilds[0];
    assert_eq!(guild.channels_failed, 1);
    // The price channel still exists under its bare label
    let names = chat.display_names("g1");
    assert!(names.contains(&"Price:".to_string()));
    assert!(names.contains(&"Market Cap: $ 310,000".to_string()));
    assert_eq!(names.len(), 8);
}

#[tokio::test]
async fn test_lock_only_touches_voice_channels_in_category() {
    let chat = Arc::new(MockChat::single());
    let cat = chat.insert("g1", "Soteria Server Stats", ChannelKind::Category, None);
    let other_cat = chat.insert("g1", "General", ChannelKind::Category, None);
    let text = chat.insert("g1", "stats-chat", ChannelKind::Other, Some(&cat));
    let lounge = chat.insert("g1", "Lounge", ChannelKind::Voice, Some(&other_cat));
    let extra = chat.insert("g1", "Manual voice", ChannelKind::Voice, Some(&cat));

    let mut cycle = cycle_with(&chat, healthy_stats());
    let report = assert_ok!(cycle.run().await);

    assert!(!chat.is_denied(&text));
    assert!(!chat.is_denied(&lounge));
    // Voice channels in the category are locked whoever created them
    assert!(chat.is_denied(&extra));
    assert_eq!(report.guilds[0].channels_locked, 9);
    for channel in chat.voice_in("g1", &cat) {
        assert!(chat.is_denied(&channel.id), "{} not locked", channel.name);
    }
}

#[tokio::test]
async fn test_supply_failure_keeps_market_channels() {
    let chat = Arc::new(MockChat::single());
    let mut stats = healthy_stats();
    stats.supply = Err(FetchError::Transport {
        source_name: "supply".into(),
        message: "connection reset".into(),
    });
    let mut cycle = cycle_with(&chat, stats);

    let report = assert_ok!(cycle.run().await);
    assert_eq!(report.guilds[0].failed_sources, 1);

    let names = chat.display_names("g1");
    assert!(names.contains(&"Supply: N/A".to_string()));
    assert!(names.contains(&"Price: $0.000123 (▲ +2.00% 24h)".to_string()));
    assert!(names.contains(&"24h Volume: $ 4,522".to_string()));
    assert!(names.contains(&"Market Cap: $ 310,000".to_string()));
}

#[tokio::test]
async fn test_all_sources_down_shows_sentinels() {
    let chat = Arc::new(MockChat::single().with_member_count(None));
    let stats = RawStats::unavailable(FetchError::Missing("everything".into()));
    let mut cycle = cycle_with(&chat, stats);

    assert_ok!(cycle.run().await);

    let names = chat.display_names("g1");
    assert_eq!(names.len(), 8);
    assert!(names.iter().all(|n| n.ends_with("N/A")), "{names:?}");
}

#[tokio::test]
async fn test_failing_guild_does_not_stop_others() {
    let chat = Arc::new(MockChat::new(&[("g1", "Broken"), ("g2", "Healthy")]));
    chat.fail_guild("g1");
    let source = Arc::new(FixedStats::new(healthy_stats()));
    let mut cycle = StatsCycle::new(chat.clone(), source.clone(), &test_config());

    let report = assert_ok!(cycle.run().await);

    assert_eq!(report.guilds_failed, 1);
    assert_eq!(report.guilds.len(), 1);
    assert_eq!(report.guilds[0].guild_id, "g2");
    assert_eq!(chat.display_names("g2"), expected_healthy_names());
    assert!(chat.categories_in("g1").is_empty());
    // Sources are fetched once per guild
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_guilds_are_independent() {
    let chat = Arc::new(MockChat::new(&[("g1", "One"), ("g2", "Two")]));
    let mut cycle = cycle_with(&chat, healthy_stats());

    let report = assert_ok!(cycle.run().await);

    assert_eq!(report.guilds.len(), 2);
    assert_eq!(chat.categories_created(), 2);
    assert_eq!(chat.display_names("g1"), chat.display_names("g2"));
}
