use crate::constants::SQLITE_BUSY_TIMEOUT_MS;
use crate::{TopicsError, TopicsResult};
use rusqlite::Connection;

/// Open the topics database with the standard pragmas and run migrations.
pub fn open_connection(path: &std::path::Path) -> TopicsResult<Connection> {
    // Create parent directories if needed
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)
        .map_err(|e| TopicsError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    tracing::debug!(path = %path.display(), "Database connection opened");

    configure(&conn)?;
    super::migrations::migrate(&conn)?;
    Ok(conn)
}

/// In-memory database (tests, throwaway runs). Same schema, no WAL.
pub fn open_in_memory() -> TopicsResult<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| TopicsError::Storage(format!("Failed to configure pragmas: {}", e)))?;
    super::migrations::migrate(&conn)?;
    Ok(conn)
}

/// Pragmas:
/// - journal_mode = WAL (readers never block the cache writer)
/// - busy_timeout = SQLITE_BUSY_TIMEOUT_MS (constants.rs)
/// - synchronous = NORMAL
/// - foreign_keys = ON
/// - temp_store = MEMORY
fn configure(conn: &Connection) -> TopicsResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = {};
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA temp_store = MEMORY;",
        SQLITE_BUSY_TIMEOUT_MS,
    ))
    .map_err(|e| TopicsError::Storage(format!("Failed to configure pragmas: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_db_path() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.db");
        (dir, path)
    }

    #[test]
    fn test_open_connection_creates_parent() {
        let (_dir, path) = tmp_db_path();
        let conn = open_connection(&path);
        assert!(conn.is_ok(), "open_connection should not error");
        assert!(path.exists());
    }

    #[test]
    fn test_busy_timeout_set_correctly() {
        let (_dir, path) = tmp_db_path();
        let conn = open_connection(&path).unwrap();
        let timeout: u32 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, SQLITE_BUSY_TIMEOUT_MS);
    }

    #[test]
    fn test_wal_enabled() {
        let (_dir, path) = tmp_db_path();
        let conn = open_connection(&path).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
