//! SQLite persistence: connection setup, migrations, the message archive and
//! the analysis cache.

pub mod analysis_cache;
pub mod database;
pub mod memory_cache;
pub mod messages;
pub mod migrations;
pub mod path_utils;

pub use analysis_cache::{AnalysisCache, AnalysisCacheEntry, SqliteAnalysisCache};
pub use memory_cache::MemoryAnalysisCache;
pub use messages::MessageStore;
