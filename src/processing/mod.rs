//! Text processing: cleaning, lemmatization, deduplication, and the model
//! capabilities (embedding, generation) consumed by the pipeline.

pub mod cleaner;
pub mod embeddings;
pub mod generator;
pub mod lemmatizer;
pub mod llm_subprocess;
pub mod preprocessor;
pub mod stop_words;

pub use embeddings::{Embedder, HashEmbedder, HttpEmbedder};
pub use generator::{DisabledGenerator, HttpGenerator, TopicGenerator};
pub use lemmatizer::{DictionaryLemmatizer, IdentityLemmatizer, Lemmatizer};
pub use llm_subprocess::CommandGenerator;
pub use preprocessor::Preprocessor;

/// Bearer token read from the named environment variable, if set and non-empty.
pub(crate) fn api_key(env_var: Option<&str>) -> Option<String> {
    let name = env_var?;
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => {
            tracing::warn!(var = %name, "API key variable not set");
            None
        }
    }
}
