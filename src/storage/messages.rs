//! Message archive: the local `ChatHistory` backed by SQLite.
//!
//! Filled by `import` from JSON exports; windowed reads skip bot authors and
//! blank texts so every consumer sees the same population.

use std::io::Read;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::history::ChatHistory;
use crate::message::RawMessage;
use crate::time_utils;
use crate::{TopicsError, TopicsResult};

pub struct MessageStore {
    conn: Mutex<Connection>,
}

fn message_from_row(row: &Row) -> rusqlite::Result<RawMessage> {
    let ts_str: String = row.get("timestamp")?;
    let timestamp = time_utils::from_sqlite(&ts_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(RawMessage {
        chat_id: row.get("chat_id")?,
        message_id: row.get("message_id")?,
        user_id: row.get("user_id")?,
        timestamp,
        text: row.get("text")?,
        is_bot: row.get::<_, i32>("is_bot")? != 0,
    })
}

impl MessageStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &std::path::Path) -> TopicsResult<Self> {
        Ok(Self::new(super::database::open_connection(path)?))
    }

    pub fn in_memory() -> TopicsResult<Self> {
        Ok(Self::new(super::database::open_in_memory()?))
    }

    fn lock(&self) -> TopicsResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TopicsError::Storage("Message store lock poisoned".into()))
    }

    /// Upsert messages keyed by (chat_id, message_id), in one transaction.
    pub fn insert_many(&self, messages: &[RawMessage]) -> TopicsResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO messages
                    (chat_id, message_id, user_id, timestamp, text, is_bot)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for msg in messages {
                stmt.execute(params![
                    msg.chat_id,
                    msg.message_id,
                    msg.user_id,
                    time_utils::to_sqlite(&msg.timestamp),
                    msg.text,
                    msg.is_bot as i32,
                ])?;
            }
        }
        tx.commit()?;
        tracing::info!(count = messages.len(), "Messages stored");
        Ok(messages.len())
    }

    /// Import a JSON array of messages.
    pub fn import_json<R: Read>(&self, reader: R) -> TopicsResult<usize> {
        let messages: Vec<RawMessage> = serde_json::from_reader(reader)?;
        self.insert_many(&messages)
    }

    /// Drop archived messages older than `older_than_days`.
    pub fn purge(&self, older_than_days: u32) -> TopicsResult<usize> {
        let cutoff = time_utils::to_sqlite(&time_utils::days_ago(older_than_days));
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM messages WHERE timestamp < ?1", params![cutoff])?;
        if removed > 0 {
            tracing::info!(removed, older_than_days, "Message archive purged");
        }
        Ok(removed)
    }
}

impl ChatHistory for MessageStore {
    fn fetch(&self, chat_id: i64, days: u32) -> TopicsResult<Vec<RawMessage>> {
        let cutoff = time_utils::to_sqlite(&time_utils::days_ago(days));
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT chat_id, message_id, user_id, timestamp, text, is_bot
             FROM messages
             WHERE chat_id = ?1 AND timestamp >= ?2 AND is_bot = 0 AND TRIM(text) != ''
             ORDER BY timestamp ASC, message_id ASC",
        )?;
        let messages = stmt
            .query_map(params![chat_id, cutoff], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(chat_id, days, count = messages.len(), "Messages fetched");
        Ok(messages)
    }

    fn count_messages(&self, chat_id: i64, days: u32) -> TopicsResult<usize> {
        let cutoff = time_utils::to_sqlite(&time_utils::days_ago(days));
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages
             WHERE chat_id = ?1 AND timestamp >= ?2 AND is_bot = 0 AND TRIM(text) != ''",
            params![chat_id, cutoff],
            |r| r.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    fn participant_count(&self, chat_id: i64) -> TopicsResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM messages WHERE chat_id = ?1 AND is_bot = 0",
            params![chat_id],
            |r| r.get(0),
        )?;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::message_at;

    fn store_with(messages: &[RawMessage]) -> MessageStore {
        let store = MessageStore::in_memory().unwrap();
        store.insert_many(messages).unwrap();
        store
    }

    #[test]
    fn test_fetch_window_and_order() {
        let store = store_with(&[
            message_at(1, 3, 10, 2, "newer message text"),
            message_at(1, 1, 10, 5, "older message text"),
            message_at(1, 2, 11, 20, "outside the window"),
            message_at(2, 4, 10, 1, "other chat message"),
        ]);
        let msgs = store.fetch(1, 7).unwrap();
        let ids: Vec<i64> = msgs.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(store.count_messages(1, 7).unwrap(), 2);
        assert_eq!(store.count_messages(1, 30).unwrap(), 3);
    }

    #[test]
    fn test_fetch_skips_bots_and_blank() {
        let mut bot = message_at(1, 1, 99, 1, "automated announcement");
        bot.is_bot = true;
        let store = store_with(&[bot, message_at(1, 2, 10, 1, "   "), message_at(1, 3, 10, 1, "real text")]);
        let msgs = store.fetch(1, 7).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].text, "real text");
        assert_eq!(store.participant_count(1).unwrap(), 1);
    }

    #[test]
    fn test_upsert_by_message_id() {
        let store = store_with(&[message_at(1, 1, 10, 1, "first version")]);
        store.insert_many(&[message_at(1, 1, 10, 1, "edited version")]).unwrap();
        let msgs = store.fetch(1, 7).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].text, "edited version");
    }

    #[test]
    fn test_import_json() {
        let store = MessageStore::in_memory().unwrap();
        let ts = time_utils::to_sqlite(&time_utils::days_ago(1));
        let json = format!(
            r#"[{{"chat_id": 7, "message_id": 1, "user_id": 3, "timestamp": "{ts}", "text": "hello from json"}},
                {{"chat_id": 7, "message_id": 2, "timestamp": "{ts}", "text": "bot says hi", "is_bot": true}}]"#
        );
        assert_eq!(store.import_json(json.as_bytes()).unwrap(), 2);
        assert_eq!(store.fetch(7, 7).unwrap().len(), 1);
    }

    #[test]
    fn test_import_rejects_malformed() {
        let store = MessageStore::in_memory().unwrap();
        let err = store.import_json(&b"{not json"[..]).unwrap_err();
        assert!(matches!(err, TopicsError::Serialization(_)));
    }

    #[test]
    fn test_purge_old_messages() {
        let store = store_with(&[
            message_at(1, 1, 10, 40, "ancient message"),
            message_at(1, 2, 10, 1, "recent message"),
        ]);
        assert_eq!(store.purge(30).unwrap(), 1);
        assert_eq!(store.count_messages(1, 365).unwrap(), 1);
    }
}
