//! Topic validators: the acceptance predicate for generated candidates.
//!
//! A candidate is accepted only if it is an object with string `title` and
//! `summary`, the trimmed title has 1..=max_title_words words, and the
//! trimmed summary length (chars) lies in [min_summary_chars,
//! max_summary_chars]. Failing candidates are dropped, never repaired.

use std::collections::HashSet;

use serde_json::Value;

use crate::config::SynthesisConfig;
use crate::topic::Topic;

/// Validate one raw candidate; returns the trimmed topic when it passes.
pub fn validate_candidate(candidate: &Value, cfg: &SynthesisConfig) -> Option<Topic> {
    let title = candidate.get("title")?.as_str()?.trim();
    let summary = candidate.get("summary")?.as_str()?.trim();
    let topic = Topic::new(title, summary);
    is_valid_topic(&topic, cfg).then_some(topic)
}

pub fn is_valid_topic(topic: &Topic, cfg: &SynthesisConfig) -> bool {
    let words = topic.title_words();
    let chars = topic.summary_chars();
    words > 0
        && words <= cfg.max_title_words
        && chars >= cfg.min_summary_chars
        && chars <= cfg.max_summary_chars
}

/// Validate, drop repeated titles (case-insensitive, first wins), cap.
pub fn accept_candidates(candidates: &[Value], cfg: &SynthesisConfig) -> Vec<Topic> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut accepted = Vec::new();

    for candidate in candidates {
        let Some(topic) = validate_candidate(candidate, cfg) else {
            tracing::debug!(candidate = %candidate, "Rejected topic candidate");
            continue;
        };
        if !seen.insert(topic.title.to_lowercase()) {
            tracing::debug!(title = %topic.title, "Duplicate topic title dropped");
            continue;
        }
        accepted.push(topic);
        if accepted.len() >= cfg.max_topics {
            break;
        }
    }
    accepted
}
