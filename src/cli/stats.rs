use anyhow::{Context, Result};
use chat_topics::config::AppConfig;

/// `stats --chat ID`: message and participant counts, never cached.
pub fn run(config: &AppConfig, chat_id: i64, period: Option<&str>) -> Result<()> {
    let analyzer = super::build_analyzer(config)?;
    let stats = analyzer
        .chat_statistics(chat_id, period)
        .context("Failed to compute chat statistics")?;

    println!("Chat {} (last {}d)", chat_id, stats.period_days);
    println!("====================");
    println!("Messages:      {:>6}", stats.message_count);
    println!("Participants:  {:>6}", stats.participants_count);
    println!("Required:      {:>6}", stats.min_required);
    println!(
        "Ready:         {:>6}",
        if stats.has_sufficient_data { "yes" } else { "no" }
    );
    Ok(())
}
