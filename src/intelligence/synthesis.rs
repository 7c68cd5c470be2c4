//! Synthesis -- turn clusters into validated topics.
//!
//! Generated path: prompt → generator → JSON array span → validators.
//! Any failure along it (backend error, timeout, unparsable output, no
//! candidate passing validation) switches to keyword fallback topics.

use serde_json::Value;

use super::prompt::build_prompt;
use super::validators;
use crate::clustering::Cluster;
use crate::config::SynthesisConfig;
use crate::constants::{truncate_chars, FALLBACK_KEYWORD_CHARS};
use crate::processing::TopicGenerator;
use crate::topic::Topic;
use crate::{TopicsError, TopicsResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicSource {
    Generated,
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutcome {
    pub topics: Vec<Topic>,
    pub source: TopicSource,
}

impl SynthesisOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, TopicSource::Fallback { .. })
    }
}

pub struct TopicSynthesizer {
    config: SynthesisConfig,
}

impl TopicSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Clusters are expected largest first, as the engine returns them.
    pub fn synthesize(&self, clusters: &[Cluster], generator: &dyn TopicGenerator) -> SynthesisOutcome {
        if clusters.is_empty() {
            return SynthesisOutcome {
                topics: vec![],
                source: TopicSource::Fallback {
                    reason: "no clusters".into(),
                },
            };
        }

        match self.generate(clusters, generator) {
            Ok(topics) => {
                tracing::info!(mode = "generated", topics = topics.len(), "Topics synthesized");
                SynthesisOutcome {
                    topics,
                    source: TopicSource::Generated,
                }
            }
            Err(e) => {
                let topics = self.fallback_topics(clusters);
                tracing::warn!(
                    error = %e,
                    topics = topics.len(),
                    "Generation unusable, using keyword fallback"
                );
                SynthesisOutcome {
                    topics,
                    source: TopicSource::Fallback {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    fn generate(&self, clusters: &[Cluster], generator: &dyn TopicGenerator) -> TopicsResult<Vec<Topic>> {
        let prompt = build_prompt(clusters, &self.config);
        let raw = generator.generate(&prompt)?;
        let candidates = parse_candidates(&raw)?;
        let topics = validators::accept_candidates(&candidates, &self.config);
        if topics.is_empty() {
            return Err(TopicsError::InvalidInput(format!(
                "None of {} candidates passed validation",
                candidates.len()
            )));
        }
        Ok(topics)
    }

    /// Keyword topics for the largest clusters: title from the top two
    /// keywords, summary from the top three.
    pub fn fallback_topics(&self, clusters: &[Cluster]) -> Vec<Topic> {
        clusters
            .iter()
            .take(self.config.fallback_clusters)
            .filter(|c| !c.keywords.is_empty())
            .map(|cluster| {
                let keywords: Vec<&str> = cluster
                    .keywords
                    .iter()
                    .take(3)
                    .map(|k| truncate_chars(k, FALLBACK_KEYWORD_CHARS))
                    .collect();
                let title = keywords
                    .iter()
                    .take(2)
                    .map(|k| title_case(k))
                    .collect::<Vec<_>>()
                    .join(" ");
                let summary = format!("Discussion of questions related to {}.", keywords.join(", "));
                Topic::new(title, summary)
            })
            .collect()
    }
}

/// Parse the span between the first `[` and the last `]` as a JSON array.
pub fn parse_candidates(raw: &str) -> TopicsResult<Vec<Value>> {
    let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) else {
        return Err(TopicsError::InvalidInput("No JSON array in model output".into()));
    };
    if end < start {
        return Err(TopicsError::InvalidInput("No JSON array in model output".into()));
    }
    Ok(serde_json::from_str(&raw[start..=end])?)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{cluster_with, StubGenerator};

    fn synthesizer() -> TopicSynthesizer {
        TopicSynthesizer::new(SynthesisConfig::default())
    }

    fn scenario_clusters() -> Vec<Cluster> {
        vec![
            cluster_with(0, 40, &["python", "code"]),
            cluster_with(1, 15, &["meetup", "talk"]),
            cluster_with(2, 8, &["hiring", "jobs"]),
        ]
    }

    #[test]
    fn test_timeout_falls_back_to_keyword_titles() {
        let generator = StubGenerator::failing("request timed out");
        let outcome = synthesizer().synthesize(&scenario_clusters(), &generator);
        assert!(outcome.is_fallback());
        let titles: Vec<&str> = outcome.topics.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Python Code", "Meetup Talk", "Hiring Jobs"]);
        let cfg = SynthesisConfig::default();
        for topic in &outcome.topics {
            assert!(validators::is_valid_topic(topic, &cfg), "{:?}", topic);
        }
    }

    #[test]
    fn test_generated_topics_validated() {
        let generator = StubGenerator::replying(
            r#"Here are the topics:
[
  {"title": "Python Tooling", "summary": "Packaging and linting tools for Python projects."},
  {"title": "way too many words in this title", "summary": "Should be dropped by validation."},
  {"title": "Local Meetups", "summary": "short"},
  {"title": "python tooling", "summary": "Duplicate title in a different case."},
  {"title": "Hiring", "summary": "Open backend positions shared by members."}
]
Hope this helps!"#,
        );
        let outcome = synthesizer().synthesize(&scenario_clusters(), &generator);
        assert_eq!(outcome.source, TopicSource::Generated);
        let titles: Vec<&str> = outcome.topics.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Python Tooling", "Hiring"]);
    }

    #[test]
    fn test_unparsable_output_falls_back() {
        let generator = StubGenerator::replying("I cannot help with that.");
        let outcome = synthesizer().synthesize(&scenario_clusters(), &generator);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.topics.len(), 3);
    }

    #[test]
    fn test_all_candidates_invalid_falls_back() {
        let generator = StubGenerator::replying(r#"[{"title": "x"}, 42]"#);
        let outcome = synthesizer().synthesize(&scenario_clusters(), &generator);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.topics[0].title, "Python Code");
    }

    #[test]
    fn test_no_clusters_no_topics() {
        let generator = StubGenerator::replying("[]");
        let outcome = synthesizer().synthesize(&[], &generator);
        assert!(outcome.topics.is_empty());
        assert_eq!(generator.calls(), 0);
    }

    #[test]
    fn test_fallback_caps_and_skips_keywordless() {
        let mut clusters: Vec<Cluster> = (0..7)
            .map(|i| cluster_with(i, 50 - i, &["alpha", "beta", "gamma", "delta"]))
            .collect();
        clusters[1].keywords.clear();
        let topics = synthesizer().fallback_topics(&clusters);
        assert_eq!(topics.len(), 4);
        assert_eq!(topics[0].title, "Alpha Beta");
        assert_eq!(
            topics[0].summary,
            "Discussion of questions related to alpha, beta, gamma."
        );
    }

    #[test]
    fn test_fallback_long_keywords_stay_valid() {
        let long = "x".repeat(120);
        let clusters = vec![cluster_with(0, 10, &[&long, &long, &long])];
        let topics = synthesizer().fallback_topics(&clusters);
        assert!(validators::is_valid_topic(&topics[0], &SynthesisConfig::default()));
    }

    #[test]
    fn test_parse_candidates_span() {
        let err = parse_candidates("noise [1, 2] more [3] tail").unwrap_err();
        assert!(matches!(err, TopicsError::Serialization(_)));
        assert_eq!(parse_candidates("```json\n[1, 2]\n```").unwrap().len(), 2);
        assert!(parse_candidates("] backwards [").is_err());
        assert!(parse_candidates("no brackets").is_err());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("python"), "Python");
        assert_eq!(title_case("ёлка"), "Ёлка");
        assert_eq!(title_case(""), "");
    }
}
