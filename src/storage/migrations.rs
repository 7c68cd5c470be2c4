use crate::{TopicsError, TopicsResult};
use rusqlite::Connection;

/// Schema version written by `migrate`.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Applied schema version, 0 when the version table does not exist yet.
pub fn get_schema_version(conn: &Connection) -> TopicsResult<u32> {
    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |r| r.get(0),
        )
        .map_err(|e| TopicsError::Storage(e.to_string()))?;

    if !exists {
        return Ok(0);
    }

    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .map_err(|e| TopicsError::Storage(e.to_string()))?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: u32) -> TopicsResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        rusqlite::params![version],
    )
    .map_err(|e| TopicsError::Storage(e.to_string()))?;
    Ok(())
}

const V1_MESSAGES: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS messages (
    chat_id INTEGER NOT NULL,
    message_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL DEFAULT 0,
    timestamp TEXT NOT NULL,
    text TEXT NOT NULL,
    is_bot INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (chat_id, message_id)
);
CREATE INDEX IF NOT EXISTS idx_messages_chat_time ON messages(chat_id, timestamp);
";

const V2_ANALYSIS_CACHE: &str = "
CREATE TABLE IF NOT EXISTS analysis_cache (
    chat_id INTEGER NOT NULL,
    period TEXT NOT NULL,
    topics TEXT NOT NULL DEFAULT '[]',
    message_count INTEGER NOT NULL DEFAULT 0,
    cluster_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    PRIMARY KEY (chat_id, period)
);
CREATE INDEX IF NOT EXISTS idx_analysis_cache_created ON analysis_cache(created_at);
";

/// Apply pending migrations. Idempotent.
pub fn migrate(conn: &Connection) -> TopicsResult<()> {
    let version = get_schema_version(conn)?;

    if version < 1 {
        conn.execute_batch(V1_MESSAGES)
            .map_err(|e| TopicsError::Storage(format!("Migration v1 failed: {}", e)))?;
        set_schema_version(conn, 1)?;
    }
    if version < 2 {
        conn.execute_batch(V2_ANALYSIS_CACHE)
            .map_err(|e| TopicsError::Storage(format!("Migration v2 failed: {}", e)))?;
        set_schema_version(conn, 2)?;
    }

    if version < CURRENT_SCHEMA_VERSION {
        tracing::info!(from = version, to = CURRENT_SCHEMA_VERSION, "Database migrated");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        let tables: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('messages', 'analysis_cache')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
