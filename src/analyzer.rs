//! Orchestrator: one topic-discovery request from period string to report.
//!
//! ```text
//! resolve period ─► cache hit? ──yes──► cached report
//!                       │ no (or force)
//!                       ▼
//!                  admin gate ─► fetch (rate-limit retry) ─► enough messages?
//!                       │                                        │ yes
//!                       ▼                                        ▼
//!               admin_required      preprocess ─► embed ─► cluster ─► synthesize ─► cache put
//! ```
//!
//! Every failure past the cache lookup is mapped to an `AnalysisError`;
//! nothing internal escapes to the caller. Only complete results are cached.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::clustering::{ClusterSet, ClusteringEngine, ClusteringOutcome, ClusteringStats};
use crate::config::{AnalysisConfig, AppConfig};
use crate::history::{self, AdminGate, ChatHistory};
use crate::intelligence::{TopicSource, TopicSynthesizer};
use crate::message::RawMessage;
use crate::period::{Period, PeriodPolicy};
use crate::processing::{embeddings, generator, Embedder, Preprocessor, TopicGenerator};
use crate::storage::{AnalysisCache, AnalysisCacheEntry};
use crate::topic::Topic;
use crate::{AnalysisError, TopicsError, TopicsResult};

/// Collaborators handed to the analyzer. Everything is injected so tests can
/// substitute any stage.
pub struct AnalyzerParts {
    pub config: AnalysisConfig,
    pub preprocessor: Arc<Preprocessor>,
    pub engine: ClusteringEngine,
    pub synthesizer: TopicSynthesizer,
    pub history: Arc<dyn ChatHistory>,
    pub gate: Arc<dyn AdminGate>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn TopicGenerator>,
    pub cache: Arc<dyn AnalysisCache>,
}

impl AnalyzerParts {
    /// Build the configured stages around an existing history source and cache.
    pub fn from_config(
        config: &AppConfig,
        history: Arc<dyn ChatHistory>,
        cache: Arc<dyn AnalysisCache>,
    ) -> TopicsResult<Self> {
        let preprocessor = Arc::new(Preprocessor::from_config(config.preprocessing.clone())?);
        Ok(Self {
            config: config.analysis.clone(),
            engine: ClusteringEngine::new(config.clustering.clone(), preprocessor.clone()),
            preprocessor,
            synthesizer: TopicSynthesizer::new(config.synthesis.clone()),
            history,
            gate: Arc::from(history::gate_from_config(&config.gate)),
            embedder: Arc::from(embeddings::from_config(&config.embedder)),
            generator: Arc::from(generator::from_config(&config.generator)),
            cache,
        })
    }
}

/// Successful analysis, fresh or cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub period_key: String,
    pub topics: Vec<Topic>,
    pub message_count: usize,
    pub cluster_count: usize,
    pub cached: bool,
    /// Wall-clock seconds; 0 for cached results.
    pub processing_time: f64,
    /// Absent on cache hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ClusteringStats>,
}

impl AnalysisReport {
    fn from_cache(entry: AnalysisCacheEntry) -> Self {
        Self {
            period_key: entry.period_key,
            topics: entry.topics,
            message_count: entry.message_count,
            cluster_count: entry.cluster_count,
            cached: true,
            processing_time: 0.0,
            stats: None,
        }
    }
}

/// Transport-side counts for a chat, always recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatStatistics {
    pub period_days: u32,
    pub message_count: usize,
    pub participants_count: usize,
    pub min_required: usize,
    pub has_sufficient_data: bool,
}

struct PipelineResult {
    topics: Vec<Topic>,
    cluster_count: usize,
    stats: ClusteringStats,
}

pub struct TopicsAnalyzer {
    periods: PeriodPolicy,
    parts: AnalyzerParts,
}

impl TopicsAnalyzer {
    pub fn new(parts: AnalyzerParts) -> Self {
        Self {
            periods: PeriodPolicy::from_config(&parts.config),
            parts,
        }
    }

    pub fn resolve_period(&self, input: Option<&str>) -> Period {
        self.periods.resolve(input)
    }

    /// Discover topics for `chat_id` over `period` (e.g. `"7d"`).
    /// `force` skips the cache lookup but still writes the fresh result.
    pub fn analyze_chat(
        &self,
        chat_id: i64,
        period: Option<&str>,
        force: bool,
    ) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();
        let period = self.periods.resolve(period);
        let key = period.key();
        tracing::info!(chat_id, period = %key, force, "Topic analysis requested");

        if !force {
            let cached = self
                .parts
                .cache
                .get(chat_id, &key)
                .map_err(|e| processing_error(chat_id, "cache lookup", e))?;
            if let Some(entry) = cached {
                tracing::info!(chat_id, period = %key, topics = entry.topics.len(), "Cache hit");
                return Ok(AnalysisReport::from_cache(entry));
            }
        }

        let privileged = self
            .parts
            .gate
            .is_privileged(chat_id, self.parts.config.principal_id)
            .map_err(|e| processing_error(chat_id, "admin check", e))?;
        if !privileged {
            tracing::warn!(chat_id, principal_id = self.parts.config.principal_id, "Admin rights missing");
            return Err(AnalysisError::AdminRequired);
        }

        let messages = self
            .fetch_with_retry(chat_id, period.days())
            .map_err(|e| processing_error(chat_id, "history fetch", e))?;
        let texts: Vec<&str> = messages
            .iter()
            .filter(|m| !m.is_bot && m.has_text())
            .map(|m| m.text.as_str())
            .collect();

        let min_required = self.parts.config.min_messages;
        if texts.len() < min_required {
            tracing::info!(chat_id, message_count = texts.len(), min_required, "Not enough messages");
            return Err(AnalysisError::InsufficientData {
                message_count: texts.len(),
                min_required,
            });
        }

        let result = self
            .run_pipeline(&texts)
            .map_err(|e| processing_error(chat_id, "analysis", e))?;

        self.parts
            .cache
            .put(chat_id, &key, &result.topics, texts.len(), result.cluster_count)
            .map_err(|e| processing_error(chat_id, "cache write", e))?;

        let processing_time = started.elapsed().as_secs_f64();
        tracing::info!(
            chat_id,
            period = %key,
            messages = texts.len(),
            clusters = result.cluster_count,
            topics = result.topics.len(),
            processing_time,
            "Topic analysis complete"
        );

        Ok(AnalysisReport {
            period_key: key,
            topics: result.topics,
            message_count: texts.len(),
            cluster_count: result.cluster_count,
            cached: false,
            processing_time,
            stats: Some(result.stats),
        })
    }

    /// Message and participant counts for the resolved period.
    pub fn chat_statistics(&self, chat_id: i64, period: Option<&str>) -> TopicsResult<ChatStatistics> {
        let period = self.periods.resolve(period);
        let message_count = self.parts.history.count_messages(chat_id, period.days())?;
        let participants_count = self.parts.history.participant_count(chat_id)?;
        let min_required = self.parts.config.min_messages;
        Ok(ChatStatistics {
            period_days: period.days(),
            message_count,
            participants_count,
            min_required,
            has_sufficient_data: message_count >= min_required,
        })
    }

    /// Purge cached analyses older than `retention_days`.
    pub fn cleanup(&self, retention_days: u32) -> TopicsResult<usize> {
        self.parts.cache.purge(retention_days)
    }

    fn fetch_with_retry(&self, chat_id: i64, days: u32) -> TopicsResult<Vec<RawMessage>> {
        let max_attempts = self.parts.config.max_fetch_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.parts.history.fetch(chat_id, days) {
                Err(TopicsError::RateLimited { wait }) if attempt < max_attempts => {
                    tracing::warn!(
                        chat_id,
                        attempt,
                        wait_secs = wait.as_secs_f64(),
                        "History fetch rate limited, waiting"
                    );
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn run_pipeline(&self, texts: &[&str]) -> TopicsResult<PipelineResult> {
        let filtered = self.parts.preprocessor.filter(texts);
        let unique = self.parts.preprocessor.deduplicate(&filtered);

        if unique.len() < self.parts.config.min_unique_texts {
            tracing::info!(
                unique = unique.len(),
                min_unique = self.parts.config.min_unique_texts,
                "Too few unique texts, no topics"
            );
            return Ok(self.empty_result(unique.len()));
        }

        let vectors = self.parts.embedder.embed(&unique)?;
        if vectors.is_empty() {
            tracing::warn!(texts = unique.len(), "Embedder returned no vectors");
            return Ok(self.empty_result(unique.len()));
        }

        let set = match self.parts.engine.run(&vectors, &unique) {
            ClusteringOutcome::Clustered(set) => set,
            ClusteringOutcome::Empty(set) => {
                let stats = self.parts.engine.stats(&set);
                return Ok(PipelineResult {
                    topics: vec![],
                    cluster_count: 0,
                    stats,
                });
            }
            ClusteringOutcome::Failed { reason } => {
                tracing::warn!(reason = %reason, "Clustering failed, no topics");
                return Ok(self.empty_result(unique.len()));
            }
        };

        let outcome = self
            .parts
            .synthesizer
            .synthesize(&set.clusters, self.parts.generator.as_ref());
        if let TopicSource::Fallback { ref reason } = outcome.source {
            tracing::info!(reason = %reason, topics = outcome.topics.len(), "Using keyword topics");
        }

        Ok(PipelineResult {
            topics: outcome.topics,
            cluster_count: set.clusters.len(),
            stats: self.parts.engine.stats(&set),
        })
    }

    fn empty_result(&self, total: usize) -> PipelineResult {
        let set = ClusterSet {
            clusters: vec![],
            noise_count: total,
            total_messages: total,
        };
        PipelineResult {
            topics: vec![],
            cluster_count: 0,
            stats: self.parts.engine.stats(&set),
        }
    }
}

fn processing_error(chat_id: i64, stage: &str, err: TopicsError) -> AnalysisError {
    tracing::error!(chat_id, stage, error = %err, "Topic analysis failed");
    AnalysisError::processing(format!("{}: {}", stage, err))
}
