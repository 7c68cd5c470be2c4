use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use chat_topics::config::AppConfig;
use chat_topics::storage::MessageStore;

/// `import FILE`: load a JSON array of messages into the archive.
pub fn run(config: &AppConfig, file: &Path) -> Result<()> {
    let reader = File::open(file)
        .map(BufReader::new)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let store = MessageStore::open(&config.storage.database).context("Failed to open message archive")?;
    let count = store
        .import_json(reader)
        .with_context(|| format!("Failed to import {}", file.display()))?;
    println!("Imported {} messages into {}", count, config.storage.database.display());
    Ok(())
}
