use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopicsError {
    /// Business-logic storage errors (missing table, bad row, poisoned lock)
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Embedding / generation backend failures
    #[error("Provider error: {0}")]
    Provider(String),

    /// The chat transport asked us to back off before retrying.
    #[error("Rate limited: retry after {}s", wait.as_secs())]
    RateLimited { wait: Duration },

    /// A backend call exceeded its deadline and was abandoned.
    #[error("Timed out after {}s", after.as_secs_f64())]
    Timeout { after: Duration },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Raw database errors from rusqlite
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Date parse errors from chrono
    #[error("Date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),
}

pub type TopicsResult<T> = Result<T, TopicsError>;

/// Terminal failures reported by the analyzer to its caller.
///
/// Serialized with an `error_type` tag so the presentation layer can branch
/// on `admin_required` / `insufficient_data` / `processing_error`.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum AnalysisError {
    #[error("administrative rights are required in this chat")]
    AdminRequired,

    #[error("not enough messages to analyze: {message_count} < {min_required}")]
    InsufficientData {
        message_count: usize,
        min_required: usize,
    },

    #[serde(rename = "processing_error")]
    #[error("temporary problem while analyzing the chat")]
    Processing { message: String },
}

impl AnalysisError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::AdminRequired => "admin_required",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::Processing { .. } => "processing_error",
        }
    }
}
