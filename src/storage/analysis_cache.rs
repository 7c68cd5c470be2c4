use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::database::open_connection;
use crate::constants::MAX_CACHE_CONNECTIONS;
use crate::time_utils;
use crate::topic::Topic;
use crate::{TopicsError, TopicsResult};

/// Last computed result for one (chat, period) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisCacheEntry {
    pub chat_id: i64,
    pub period_key: String,
    pub topics: Vec<Topic>,
    pub message_count: usize,
    pub cluster_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Keyed result store. Entries come back verbatim; `put` is last-write-wins.
/// Operations on one key never wait on another key's lock.
pub trait AnalysisCache: Send + Sync {
    fn get(&self, chat_id: i64, period_key: &str) -> TopicsResult<Option<AnalysisCacheEntry>>;

    fn put(
        &self,
        chat_id: i64,
        period_key: &str,
        topics: &[Topic],
        message_count: usize,
        cluster_count: usize,
    ) -> TopicsResult<()>;

    /// Delete entries created more than `older_than_days` days ago.
    fn purge(&self, older_than_days: u32) -> TopicsResult<usize>;
}

type CacheKey = (i64, String);
type SharedConnection = Arc<Mutex<Connection>>;

struct PoolEntry {
    conn: SharedConnection,
    last_used: Instant,
}

/// `analysis_cache` table. Each (chat, period) key gets its own lazily
/// opened WAL connection; the pool map is locked only for lookup/insert and
/// a key's connection only for a single statement.
pub struct SqliteAnalysisCache {
    path: PathBuf,
    pool: Mutex<HashMap<CacheKey, PoolEntry>>,
    max_connections: usize,
}

impl SqliteAnalysisCache {
    /// Open (and migrate) the database at `path`.
    pub fn open(path: &Path) -> TopicsResult<Self> {
        open_connection(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            pool: Mutex::new(HashMap::new()),
            max_connections: MAX_CACHE_CONNECTIONS,
        })
    }

    fn lock_pool(&self) -> TopicsResult<MutexGuard<'_, HashMap<CacheKey, PoolEntry>>> {
        self.pool
            .lock()
            .map_err(|_| TopicsError::Storage("Cache pool lock poisoned".into()))
    }

    /// Connection dedicated to one key, opened on first use. When the pool
    /// is full the least recently used idle connection is evicted.
    fn connection(&self, chat_id: i64, period_key: &str) -> TopicsResult<SharedConnection> {
        let key = (chat_id, period_key.to_string());
        {
            let mut pool = self.lock_pool()?;
            if let Some(entry) = pool.get_mut(&key) {
                entry.last_used = Instant::now();
                return Ok(entry.conn.clone());
            }
        }

        // Opened outside the pool lock.
        let conn = Arc::new(Mutex::new(open_connection(&self.path)?));

        let mut pool = self.lock_pool()?;
        if pool.len() >= self.max_connections {
            let idle = pool
                .iter()
                .filter(|(_, e)| Arc::strong_count(&e.conn) == 1)
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(evicted) = idle {
                pool.remove(&evicted);
                tracing::debug!(chat_id = evicted.0, period = %evicted.1, "Cache connection evicted");
            }
        }
        let entry = pool.entry(key).or_insert(PoolEntry {
            conn,
            last_used: Instant::now(),
        });
        entry.last_used = Instant::now();
        Ok(entry.conn.clone())
    }

    fn lock(conn: &SharedConnection) -> TopicsResult<MutexGuard<'_, Connection>> {
        conn.lock()
            .map_err(|_| TopicsError::Storage("Analysis cache connection lock poisoned".into()))
    }

    #[cfg(test)]
    fn open_connections(&self) -> usize {
        self.pool.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl AnalysisCache for SqliteAnalysisCache {
    fn get(&self, chat_id: i64, period_key: &str) -> TopicsResult<Option<AnalysisCacheEntry>> {
        let handle = self.connection(chat_id, period_key)?;
        let row = {
            let conn = Self::lock(&handle)?;
            conn.query_row(
                "SELECT topics, message_count, cluster_count, created_at
                 FROM analysis_cache WHERE chat_id = ?1 AND period = ?2",
                params![chat_id, period_key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?
        };

        let Some((topics_json, message_count, cluster_count, created_at)) = row else {
            return Ok(None);
        };

        Ok(Some(AnalysisCacheEntry {
            chat_id,
            period_key: period_key.to_string(),
            topics: serde_json::from_str(&topics_json)?,
            message_count: message_count.max(0) as usize,
            cluster_count: cluster_count.max(0) as usize,
            created_at: time_utils::from_sqlite(&created_at)?,
        }))
    }

    fn put(
        &self,
        chat_id: i64,
        period_key: &str,
        topics: &[Topic],
        message_count: usize,
        cluster_count: usize,
    ) -> TopicsResult<()> {
        let topics_json = serde_json::to_string(topics)?;
        let created_at = time_utils::to_sqlite(&time_utils::now());

        let handle = self.connection(chat_id, period_key)?;
        let conn = Self::lock(&handle)?;
        conn.execute(
            "INSERT OR REPLACE INTO analysis_cache
                (chat_id, period, topics, message_count, cluster_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chat_id,
                period_key,
                topics_json,
                message_count as i64,
                cluster_count as i64,
                created_at,
            ],
        )?;

        tracing::debug!(chat_id, period = %period_key, topics = topics.len(), "Analysis cached");
        Ok(())
    }

    fn purge(&self, older_than_days: u32) -> TopicsResult<usize> {
        let cutoff = time_utils::to_sqlite(&time_utils::days_ago(older_than_days));
        let conn = open_connection(&self.path)?;
        let removed = conn.execute(
            "DELETE FROM analysis_cache WHERE created_at < ?1",
            params![cutoff],
        )?;
        if removed > 0 {
            tracing::info!(removed, older_than_days, "Analysis cache purged");
        }
        Ok(removed)
    }
}
