//! Error types for Tracklab

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Tracklab error types
#[derive(Error, Debug)]
pub enum Error {
    /// Tabulation requested before any comparison produced scores
    #[error("no scores to compare")]
    NoScores,

    /// A run reached evaluation without a cached model
    #[error("run `{0}` did not cache a model")]
    ModelNotCached(String),

    /// Metric evaluation failed for one run
    #[error("failed to generate statistics for run `{run}`: {reason}")]
    Evaluation {
        /// Name of the run being evaluated
        run: String,
        /// What went wrong
        reason: String,
    },

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
