use serde::{Deserialize, Serialize};

/// A human-readable discussion topic: short title plus one-sentence summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub summary: String,
}

impl Topic {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
        }
    }

    /// Whitespace-separated words in the title.
    pub fn title_words(&self) -> usize {
        self.title.split_whitespace().count()
    }

    /// Characters in the summary, ignoring surrounding whitespace.
    pub fn summary_chars(&self) -> usize {
        self.summary.trim().chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_measures() {
        let topic = Topic::new("Rust  Async Runtime", "  Tokyo meetup é ");
        assert_eq!(topic.title_words(), 3);
        assert_eq!(topic.summary_chars(), 14);
        assert_eq!(Topic::new("", "").title_words(), 0);
    }
}
