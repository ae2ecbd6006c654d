//! Error types for the decision engine and its collaborators

use thiserror::Error;

/// Failures of a single decision evaluation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    /// No forecast sample covers the evaluation instant
    #[error("no forecast data")]
    NoForecast,

    /// An absolute timestamp or recurrence expression could not be parsed
    #[error("invalid schedule {input:?}: {message}")]
    ScheduleParse { input: String, message: String },

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}

impl DecisionError {
    pub fn schedule(input: impl Into<String>, message: impl ToString) -> Self {
        DecisionError::ScheduleParse {
            input: input.into(),
            message: message.to_string(),
        }
    }
}

/// Failures while fetching forecast data
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("failed to read forecast from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse forecast from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("forecast source unavailable: {0}")]
    Unavailable(String),
}

/// Failures while loading an eco policy document
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures while reading or updating the scaled target
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("scale target {0} not found")]
    NotFound(String),

    #[error("scale target {name} rejected update: {message}")]
    UpdateRejected { name: String, message: String },
}
