use anyhow::Result;
use chat_topics::config::AppConfig;
use chat_topics::AnalysisError;

/// `topics --chat ID`: run (or fetch cached) topic analysis.
pub fn run(config: &AppConfig, chat_id: i64, period: Option<&str>, force: bool, json: bool) -> Result<()> {
    let analyzer = super::build_analyzer(config)?;

    match analyzer.analyze_chat(chat_id, period, force) {
        Ok(report) if json => println!("{}", serde_json::to_string_pretty(&report)?),
        Ok(report) => {
            println!("Topics for chat {} (last {})", chat_id, report.period_key);
            println!("==============================");
            if report.topics.is_empty() {
                println!("No distinct topics found.");
            }
            for (i, topic) in report.topics.iter().enumerate() {
                println!("{}. {}", i + 1, topic.title);
                println!("   {}", topic.summary);
            }
            println!();
            println!("Messages:  {:>6}", report.message_count);
            println!("Clusters:  {:>6}", report.cluster_count);
            if report.cached {
                println!("Source:    cached");
            } else {
                println!("Time:      {:>6.2}s", report.processing_time);
            }
        }
        Err(err) if json => println!("{}", serde_json::to_string_pretty(&err)?),
        Err(AnalysisError::InsufficientData {
            message_count,
            min_required,
        }) => {
            println!(
                "Not enough messages to analyze: {} found, {} required.",
                message_count, min_required
            );
        }
        Err(err) => anyhow::bail!(err),
    }
    Ok(())
}
