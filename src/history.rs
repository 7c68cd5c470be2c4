//! Chat-side capabilities: history retrieval and the admin gate.

use std::collections::HashSet;

use crate::config::{GateConfig, GateMode};
use crate::message::RawMessage;
use crate::TopicsResult;

/// Source of chat messages. `fetch` may fail with
/// `TopicsError::RateLimited`; callers wait and retry.
pub trait ChatHistory: Send + Sync {
    /// Non-bot, non-blank messages of the last `days` days, oldest first.
    fn fetch(&self, chat_id: i64, days: u32) -> TopicsResult<Vec<RawMessage>>;

    /// Number of messages `fetch` would return.
    fn count_messages(&self, chat_id: i64, days: u32) -> TopicsResult<usize>;

    /// Distinct human authors known for the chat.
    fn participant_count(&self, chat_id: i64) -> TopicsResult<usize>;
}

/// Does `principal_id` hold administrative capability in `chat_id`?
pub trait AdminGate: Send + Sync {
    fn is_privileged(&self, chat_id: i64, principal_id: i64) -> TopicsResult<bool>;
}

pub struct AllowAll;

impl AdminGate for AllowAll {
    fn is_privileged(&self, _chat_id: i64, _principal_id: i64) -> TopicsResult<bool> {
        Ok(true)
    }
}

/// Only the listed principals pass, in every chat.
pub struct AllowList {
    principals: HashSet<i64>,
}

impl AllowList {
    pub fn new(principals: impl IntoIterator<Item = i64>) -> Self {
        Self {
            principals: principals.into_iter().collect(),
        }
    }
}

impl AdminGate for AllowList {
    fn is_privileged(&self, chat_id: i64, principal_id: i64) -> TopicsResult<bool> {
        let allowed = self.principals.contains(&principal_id);
        if !allowed {
            tracing::debug!(chat_id, principal_id, "Principal not in allow list");
        }
        Ok(allowed)
    }
}

pub fn gate_from_config(cfg: &GateConfig) -> Box<dyn AdminGate> {
    match cfg.mode {
        GateMode::AllowAll => Box::new(AllowAll),
        GateMode::AllowList => Box::new(AllowList::new(cfg.privileged_principals.iter().copied())),
    }
}
