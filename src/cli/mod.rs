pub mod config;
pub mod import;
pub mod purge;
pub mod stats;
pub mod topics;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chat_topics::config::AppConfig;
use chat_topics::storage::{MessageStore, SqliteAnalysisCache};
use chat_topics::{AnalyzerParts, TopicsAnalyzer};

/// Load the effective configuration: explicit path, default file, env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    AppConfig::load(path).context("Failed to load configuration")
}

/// Analyzer over the local message archive, caching into the same database.
pub fn build_analyzer(config: &AppConfig) -> Result<TopicsAnalyzer> {
    let db = &config.storage.database;
    let history = MessageStore::open(db)
        .with_context(|| format!("Failed to open message archive {}", db.display()))?;
    let cache = SqliteAnalysisCache::open(db)
        .with_context(|| format!("Failed to open analysis cache {}", db.display()))?;
    let parts = AnalyzerParts::from_config(config, Arc::new(history), Arc::new(cache))
        .context("Failed to build analysis pipeline")?;
    Ok(TopicsAnalyzer::new(parts))
}
