//! Chat Topics: discover discussion topics in group-chat history.
//!
//! Single-crate library: text preprocessing, embedding, density/centroid
//! clustering, topic synthesis with keyword fallback, and a SQLite-backed
//! analysis cache, wired together by the `analyzer` orchestrator.

// Foundation types
pub mod time_utils;
pub mod config;
pub mod constants;
pub mod error;
pub mod message;
pub mod period;
pub mod topic;

// Sub-systems
pub mod analyzer;
pub mod clustering;
pub mod history;
pub mod intelligence;
pub mod processing;
pub mod storage;
pub mod tracing_init;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-exports for convenience
pub use analyzer::{AnalysisReport, AnalyzerParts, ChatStatistics, TopicsAnalyzer};
pub use error::{AnalysisError, TopicsError, TopicsResult};
