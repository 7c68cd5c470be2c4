//! Topic synthesis: prompt construction, candidate validation, fallback.

pub mod prompt;
pub mod synthesis;
pub mod validators;

pub use synthesis::{SynthesisOutcome, TopicSource, TopicSynthesizer};
