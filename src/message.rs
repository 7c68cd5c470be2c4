use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as delivered by the history transport. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub chat_id: i64,
    pub message_id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    /// Messages authored by bots are excluded from analysis.
    #[serde(default)]
    pub is_bot: bool,
}

impl RawMessage {
    /// Service messages (joins, pins, media without caption) carry no text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_defaults() {
        let msg: RawMessage = serde_json::from_str(
            r#"{"chat_id": -100, "message_id": 7, "timestamp": "2026-10-01T12:00:00Z", "text": "hello"}"#,
        )
        .unwrap();
        assert_eq!(msg.user_id, 0);
        assert!(!msg.is_bot);
        assert!(msg.has_text());
    }

    #[test]
    fn test_blank_text() {
        let msg = RawMessage {
            chat_id: 1,
            message_id: 1,
            user_id: 1,
            timestamp: Utc::now(),
            text: "   \n".to_string(),
            is_bot: false,
        };
        assert!(!msg.has_text());
    }
}
