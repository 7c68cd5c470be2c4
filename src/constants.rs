// === Analysis gates ===
pub const MIN_MESSAGES: usize = 50;
pub const MIN_UNIQUE_TEXTS: usize = 10;
pub const DEFAULT_PERIOD: &str = "7d";
pub const MAX_PERIOD: &str = "14d";
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

// === Preprocessing ===
pub const MIN_TEXT_CHARS: usize = 10;
pub const MIN_WORDS: usize = 3;
pub const MIN_TOKEN_CHARS: usize = 3;
pub const DEDUP_THRESHOLD: f64 = 0.7;

// === Clustering ===
pub const MIN_CLUSTER_SIZE_FLOOR: usize = 8;
pub const MIN_SAMPLES: usize = 2;
pub const MIN_CLUSTER_MEMBERS: usize = 3;
pub const CLUSTER_KEYWORDS: usize = 8;
pub const CLUSTER_REPRESENTATIVES: usize = 5;
pub const KMEANS_SEED: u64 = 42;
pub const KMEANS_RESTARTS: usize = 10;
pub const KMEANS_MAX_ITERATIONS: usize = 300;
pub const KMEANS_TOLERANCE: f64 = 1e-4;
pub const KMEANS_MAX_CLUSTERS: usize = 12;

// === Synthesis ===
pub const PROMPT_MAX_CLUSTERS: usize = 7;
pub const PROMPT_KEYWORDS: usize = 5;
pub const PROMPT_EXAMPLES: usize = 3;
pub const PROMPT_EXAMPLE_CHARS: usize = 100;
pub const MAX_TOPICS: usize = 7;
pub const MAX_TITLE_WORDS: usize = 5;
pub const MIN_SUMMARY_CHARS: usize = 10;
pub const MAX_SUMMARY_CHARS: usize = 199;
pub const FALLBACK_CLUSTERS: usize = 5;
pub const FALLBACK_KEYWORD_CHARS: usize = 40;

// === Generation backend ===
pub const LLM_TIMEOUT_SECS: u64 = 120;
pub const LLM_MAX_NEW_TOKENS: u32 = 256;
pub const LLM_TEMPERATURE: f64 = 0.7;
pub const LLM_TOP_P: f64 = 0.9;

// === Embeddings ===
pub const EMBEDDING_DIM: usize = 384;
pub const EMBEDDING_TIMEOUT_SECS: u64 = 60;

// === Retention ===
pub const CACHE_RETENTION_DAYS: u32 = 7;
pub const MESSAGE_RETENTION_DAYS: u32 = 30;

// === SQLite Tuning ===
pub const SQLITE_BUSY_TIMEOUT_MS: u32 = 5_000;
pub const MAX_CACHE_CONNECTIONS: usize = 16;

/// Truncate a string to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
