//! Preprocessor: normalize, filter and deduplicate chat texts; keyword tables.
//!
//! Similarity is word-level Jaccard over lemmatized, stop-word-filtered
//! token sets. Deduplication is greedy and order-preserving: a text is kept
//! only if it is at most `threshold`-similar to every text kept before it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::cleaner;
use super::lemmatizer::{DictionaryLemmatizer, IdentityLemmatizer, Lemmatizer};
use super::stop_words;
use crate::config::PreprocessingConfig;
use crate::TopicsResult;

pub struct Preprocessor {
    config: PreprocessingConfig,
    lemmatizer: Arc<dyn Lemmatizer>,
    stop_words: HashSet<String>,
}

impl Preprocessor {
    pub fn new(config: PreprocessingConfig, lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        let stop_words = stop_words::RUSSIAN
            .iter()
            .chain(stop_words::ENGLISH.iter())
            .map(|w| w.to_string())
            .chain(config.extra_stop_words.iter().map(|w| w.to_lowercase()))
            .collect();
        Self {
            config,
            lemmatizer,
            stop_words,
        }
    }

    /// Uses the configured lemma dictionary when one is set.
    pub fn from_config(config: PreprocessingConfig) -> TopicsResult<Self> {
        let lemmatizer: Arc<dyn Lemmatizer> = match config.lemma_dictionary {
            Some(ref path) => {
                let dict = DictionaryLemmatizer::load(path)?;
                tracing::info!(path = %path.display(), forms = dict.len(), "Lemma dictionary loaded");
                Arc::new(dict)
            }
            None => Arc::new(IdentityLemmatizer),
        };
        Ok(Self::new(config, lemmatizer))
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Strip emoji/URLs/mentions/hashtags, lower-case, collapse whitespace.
    /// Empty when the text is too short to be worth analysing.
    pub fn normalize(&self, text: &str) -> String {
        cleaner::normalize(text, self.config.min_chars)
    }

    /// Normalize each text and keep those with at least `min_words` words.
    pub fn filter<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        let filtered: Vec<String> = texts
            .iter()
            .map(|t| self.normalize(t.as_ref()))
            .filter(|n| !n.is_empty() && cleaner::word_count(n) >= self.config.min_words)
            .collect();
        tracing::debug!(input = texts.len(), kept = filtered.len(), "Messages filtered");
        filtered
    }

    /// Lemmatized content tokens of `text`, in order, duplicates kept.
    /// Short and purely numeric tokens are dropped before lemmatization,
    /// stop words after.
    pub fn lemmatize(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(cleaner::trim_token)
            .filter(|t| t.chars().count() >= self.config.min_token_chars)
            .filter(|t| !t.chars().all(|c| c.is_numeric()))
            .map(|t| self.lemmatizer.lemma(t))
            .filter(|lemma| !lemma.is_empty() && !self.stop_words.contains(lemma))
            .collect()
    }

    fn token_set(&self, text: &str) -> HashSet<String> {
        let normalized = self.normalize(text);
        if normalized.is_empty() {
            return HashSet::new();
        }
        self.lemmatize(&normalized).into_iter().collect()
    }

    /// Jaccard similarity of the two texts' token sets; 0 if either is empty.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        jaccard(&self.token_set(a), &self.token_set(b))
    }

    /// Greedy near-duplicate removal with the configured threshold.
    pub fn deduplicate<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        self.deduplicate_with(texts, self.config.dedup_threshold)
    }

    /// Keep the first text; keep each later text only if its similarity to
    /// every already-kept text is `<= threshold`. Order is preserved.
    pub fn deduplicate_with<S: AsRef<str>>(&self, texts: &[S], threshold: f64) -> Vec<String> {
        let mut kept: Vec<String> = Vec::new();
        let mut kept_sets: Vec<HashSet<String>> = Vec::new();

        for text in texts {
            let text = text.as_ref();
            let tokens = self.token_set(text);
            let is_duplicate = kept_sets
                .iter()
                .any(|existing| jaccard(&tokens, existing) > threshold);
            if !is_duplicate {
                kept.push(text.to_string());
                kept_sets.push(tokens);
            }
        }

        tracing::debug!(
            input = texts.len(),
            unique = kept.len(),
            threshold = threshold,
            "Near-duplicates removed"
        );
        kept
    }

    /// Top `max_keywords` lemmas across `texts` by descending frequency,
    /// ties broken by first appearance.
    pub fn extract_keywords<S: AsRef<str>>(&self, texts: &[S], max_keywords: usize) -> Vec<String> {
        // lemma -> (count, first_seen)
        let mut freq: HashMap<String, (usize, usize)> = HashMap::new();
        let mut order = 0usize;

        for text in texts {
            let normalized = self.normalize(text.as_ref());
            if normalized.is_empty() {
                continue;
            }
            for word in self.lemmatize(&normalized) {
                if word.chars().count() < self.config.min_token_chars {
                    continue;
                }
                let entry = freq.entry(word).or_insert_with(|| {
                    order += 1;
                    (0, order)
                });
                entry.0 += 1;
            }
        }

        let mut ranked: Vec<(String, usize, usize)> = freq
            .into_iter()
            .map(|(word, (count, first_seen))| (word, count, first_seen))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked
            .into_iter()
            .take(max_keywords)
            .map(|(word, _, _)| word)
            .collect()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessingConfig::default(), Arc::new(IdentityLemmatizer))
    }
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}
