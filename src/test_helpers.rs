//! Shared test utilities: builders and stub capabilities.
//!
//! Available only under `#[cfg(test)]`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::clustering::Cluster;
use crate::history::{AdminGate, ChatHistory};
use crate::message::RawMessage;
use crate::processing::{Embedder, TopicGenerator};
use crate::storage::{AnalysisCache, AnalysisCacheEntry, MemoryAnalysisCache};
use crate::topic::Topic;
use crate::time_utils;
use crate::{TopicsError, TopicsResult};

// ============================================================================
// Builders
// ============================================================================

/// Cluster with `size` placeholder members and the given keywords.
pub fn cluster_with(id: usize, size: usize, keywords: &[&str]) -> Cluster {
    let member_texts: Vec<String> = (0..size)
        .map(|i| format!("{} message {}", keywords.join(" "), i))
        .collect();
    Cluster {
        id,
        size,
        representative_texts: member_texts.iter().take(3).cloned().collect(),
        member_texts,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        centroid: vec![0.0; 4],
    }
}

pub fn message_at(chat_id: i64, message_id: i64, user_id: i64, days_ago: u32, text: &str) -> RawMessage {
    RawMessage {
        chat_id,
        message_id,
        user_id,
        timestamp: time_utils::days_ago(days_ago),
        text: text.to_string(),
        is_bot: false,
    }
}

/// Chat history with three discussion threads of the given sizes
/// (python, meetup, hiring), one hour old, authors cycling over five users.
pub fn topic_messages(chat_id: i64, sizes: [usize; 3]) -> Vec<RawMessage> {
    const THREADS: [&str; 3] = [
        "python code question",
        "meetup talk schedule",
        "hiring jobs remote",
    ];
    let mut messages = Vec::new();
    for (thread, &size) in THREADS.iter().zip(sizes.iter()) {
        for i in 0..size {
            let id = messages.len() as i64 + 1;
            messages.push(RawMessage {
                chat_id,
                message_id: id,
                user_id: id % 5,
                timestamp: time_utils::now() - chrono::Duration::hours(1),
                text: format!("{} item{}", thread, i),
                is_bot: false,
            });
        }
    }
    messages
}

// ============================================================================
// Stub capabilities
// ============================================================================

/// Maps the three `topic_messages` threads onto separate axes; the trailing
/// item number becomes a small offset so members stay distinct.
pub struct StubEmbedder {
    calls: AtomicUsize,
    failing: bool,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: false,
        }
    }

    /// Every `embed` call fails with a provider error.
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for StubEmbedder {
    fn embed(&self, texts: &[String]) -> TopicsResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(TopicsError::Provider("embedding backend unreachable".into()));
        }
        Ok(texts
            .iter()
            .map(|text| {
                let axis = if text.contains("python") {
                    0
                } else if text.contains("meetup") {
                    1
                } else if text.contains("hiring") {
                    2
                } else {
                    3
                };
                let item: f32 = text
                    .rsplit("item")
                    .next()
                    .and_then(|n| n.trim().parse().ok())
                    .unwrap_or(0.0);
                let mut v = vec![0.0f32; 5];
                v[axis] = 10.0;
                v[4] = item * 0.01;
                v
            })
            .collect())
    }
}

pub struct StubGenerator {
    reply: Result<String, String>,
    calls: AtomicUsize,
}

impl StubGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TopicGenerator for StubGenerator {
    fn generate(&self, _prompt: &str) -> TopicsResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(TopicsError::Provider)
    }
}

/// In-memory history. The first `rate_limited` fetches fail with a
/// zero-length wait; `broken` makes every fetch fail outright.
pub struct StubHistory {
    messages: Vec<RawMessage>,
    rate_limited: usize,
    broken: bool,
    fetches: AtomicUsize,
    last_days: Mutex<Option<u32>>,
}

impl StubHistory {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            messages,
            rate_limited: 0,
            broken: false,
            fetches: AtomicUsize::new(0),
            last_days: Mutex::new(None),
        }
    }

    pub fn rate_limited(mut self, times: usize) -> Self {
        self.rate_limited = times;
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Window requested by the most recent fetch.
    pub fn last_days(&self) -> Option<u32> {
        *self.last_days.lock().unwrap()
    }
}

impl ChatHistory for StubHistory {
    fn fetch(&self, chat_id: i64, days: u32) -> TopicsResult<Vec<RawMessage>> {
        let attempt = self.fetches.fetch_add(1, Ordering::SeqCst);
        *self.last_days.lock().unwrap() = Some(days);
        if self.broken {
            return Err(TopicsError::Storage("history unavailable".into()));
        }
        if attempt < self.rate_limited {
            return Err(TopicsError::RateLimited {
                wait: Duration::from_millis(0),
            });
        }
        Ok(self
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect())
    }

    fn count_messages(&self, chat_id: i64, _days: u32) -> TopicsResult<usize> {
        Ok(self.messages.iter().filter(|m| m.chat_id == chat_id).count())
    }

    fn participant_count(&self, chat_id: i64) -> TopicsResult<usize> {
        let mut users: Vec<i64> = self
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.user_id)
            .collect();
        users.sort_unstable();
        users.dedup();
        Ok(users.len())
    }
}

pub struct DenyAll;

impl AdminGate for DenyAll {
    fn is_privileged(&self, _chat_id: i64, _principal_id: i64) -> TopicsResult<bool> {
        Ok(false)
    }
}

/// Memory cache whose `get` or `put` fails on demand.
pub struct BrokenCache {
    inner: MemoryAnalysisCache,
    fail_get: bool,
    fail_put: bool,
}

impl BrokenCache {
    pub fn failing_get() -> Self {
        Self {
            inner: MemoryAnalysisCache::new(),
            fail_get: true,
            fail_put: false,
        }
    }

    pub fn failing_put() -> Self {
        Self {
            inner: MemoryAnalysisCache::new(),
            fail_get: false,
            fail_put: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl AnalysisCache for BrokenCache {
    fn get(&self, chat_id: i64, period_key: &str) -> TopicsResult<Option<AnalysisCacheEntry>> {
        if self.fail_get {
            return Err(TopicsError::Storage("cache read failed".into()));
        }
        self.inner.get(chat_id, period_key)
    }

    fn put(
        &self,
        chat_id: i64,
        period_key: &str,
        topics: &[Topic],
        message_count: usize,
        cluster_count: usize,
    ) -> TopicsResult<()> {
        if self.fail_put {
            return Err(TopicsError::Storage("cache write failed".into()));
        }
        self.inner.put(chat_id, period_key, topics, message_count, cluster_count)
    }

    fn purge(&self, older_than_days: u32) -> TopicsResult<usize> {
        self.inner.purge(older_than_days)
    }
}
