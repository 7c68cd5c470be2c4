use anyhow::{Context, Result};
use chat_topics::config::AppConfig;
use chat_topics::storage::MessageStore;

/// `purge`: drop stale cache entries and archived messages.
pub fn run(config: &AppConfig, cache_days: Option<u32>, message_days: Option<u32>) -> Result<()> {
    let cache_days = cache_days.unwrap_or(config.storage.cache_retention_days);
    let message_days = message_days.unwrap_or(config.storage.message_retention_days);

    let analyzer = super::build_analyzer(config)?;
    let cache_removed = analyzer.cleanup(cache_days).context("Failed to purge analysis cache")?;

    let store = MessageStore::open(&config.storage.database).context("Failed to open message archive")?;
    let messages_removed = store.purge(message_days).context("Failed to purge messages")?;

    println!("Cache entries removed: {} (older than {}d)", cache_removed, cache_days);
    println!("Messages removed:      {} (older than {}d)", messages_removed, message_days);
    Ok(())
}
