use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::analysis_cache::{AnalysisCache, AnalysisCacheEntry};
use crate::time_utils;
use crate::topic::Topic;
use crate::{TopicsError, TopicsResult};

type Slot = Arc<RwLock<Option<AnalysisCacheEntry>>>;
type SlotMap = HashMap<(i64, String), Slot>;

/// Process-local cache for tests and one-shot runs.
///
/// Each key owns a slot with its own lock. The slot map is locked only to
/// find or create a slot, never while an entry is read or written.
#[derive(Default)]
pub struct MemoryAnalysisCache {
    slots: RwLock<SlotMap>,
}

fn poisoned() -> TopicsError {
    TopicsError::Storage("Memory cache lock poisoned".into())
}

fn read_slot(slot: &Slot) -> TopicsResult<RwLockReadGuard<'_, Option<AnalysisCacheEntry>>> {
    slot.read().map_err(|_| poisoned())
}

fn write_slot(slot: &Slot) -> TopicsResult<RwLockWriteGuard<'_, Option<AnalysisCacheEntry>>> {
    slot.write().map_err(|_| poisoned())
}

impl MemoryAnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.snapshot()
            .map(|slots| {
                slots
                    .iter()
                    .filter(|slot| read_slot(slot).map(|e| e.is_some()).unwrap_or(false))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> TopicsResult<Vec<Slot>> {
        Ok(self.slots.read().map_err(|_| poisoned())?.values().cloned().collect())
    }

    fn slot(&self, chat_id: i64, period_key: &str) -> TopicsResult<Option<Slot>> {
        let slots = self.slots.read().map_err(|_| poisoned())?;
        Ok(slots.get(&(chat_id, period_key.to_string())).cloned())
    }

    fn slot_or_insert(&self, chat_id: i64, period_key: &str) -> TopicsResult<Slot> {
        if let Some(slot) = self.slot(chat_id, period_key)? {
            return Ok(slot);
        }
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        Ok(slots
            .entry((chat_id, period_key.to_string()))
            .or_default()
            .clone())
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, chat_id: i64, period_key: &str, days: u32) {
        if let Ok(Some(slot)) = self.slot(chat_id, period_key) {
            if let Ok(mut entry) = write_slot(&slot) {
                if let Some(entry) = entry.as_mut() {
                    entry.created_at = time_utils::days_ago(days);
                }
            }
        }
    }
}

impl AnalysisCache for MemoryAnalysisCache {
    fn get(&self, chat_id: i64, period_key: &str) -> TopicsResult<Option<AnalysisCacheEntry>> {
        match self.slot(chat_id, period_key)? {
            Some(slot) => Ok(read_slot(&slot)?.clone()),
            None => Ok(None),
        }
    }

    fn put(
        &self,
        chat_id: i64,
        period_key: &str,
        topics: &[Topic],
        message_count: usize,
        cluster_count: usize,
    ) -> TopicsResult<()> {
        let entry = AnalysisCacheEntry {
            chat_id,
            period_key: period_key.to_string(),
            topics: topics.to_vec(),
            message_count,
            cluster_count,
            created_at: time_utils::now(),
        };
        let slot = self.slot_or_insert(chat_id, period_key)?;
        *write_slot(&slot)? = Some(entry);
        Ok(())
    }

    /// Stale slots are emptied in place; the slot map itself is only
    /// touched to drop empty slots nobody is holding.
    fn purge(&self, older_than_days: u32) -> TopicsResult<usize> {
        let cutoff = time_utils::days_ago(older_than_days);
        let mut removed = 0;
        for slot in self.snapshot()? {
            let mut entry = write_slot(&slot)?;
            if entry.as_ref().is_some_and(|e| e.created_at < cutoff) {
                *entry = None;
                removed += 1;
            }
        }

        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || slot.try_read().map(|e| e.is_some()).unwrap_or(true)
        });
        Ok(removed)
    }
}
