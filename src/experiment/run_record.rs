//! Run Record - one scoped attempt within an experiment

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Placeholder token replacing model references wherever a record is
/// rendered or serialized.
pub const MODEL_PLACEHOLDER: &str = "<MODEL>";

/// Prediction capability required of anything cached on a run.
///
/// Any trained model participating in comparison exposes exactly one
/// operation: features in, predictions out. The trait bound replaces a
/// runtime capability probe; a record without a model is simply skipped
/// at evaluation time.
pub trait Model {
    /// Predict one label per feature row.
    fn predict(&self, features: &[Vec<f64>]) -> Vec<f64>;
}

/// Run Record captures one run's identity, timing, outcome message, and
/// optional cached model.
///
/// A record is handed out mutably while its run scope is open, then
/// committed into the parent experiment's run table exactly once at scope
/// exit, on both the success and the failure path.
pub struct RunRecord {
    name: String,
    run_id: String,
    started_at: DateTime<Utc>,
    runtime_ms: Option<i64>,
    message: Option<String>,
    model: Option<Box<dyn Model>>,
    model_save_file: Option<PathBuf>,
}

impl RunRecord {
    /// Create a new record at scope open, stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run_id: run_id.into(),
            started_at: Utc::now(),
            runtime_ms: None,
            message: None,
            model: None,
            model_save_file: None,
        }
    }

    /// Get the run name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the start timestamp.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Elapsed wall-clock time in milliseconds, set only when the scope
    /// body completed normally.
    #[must_use]
    pub const fn runtime_ms(&self) -> Option<i64> {
        self.runtime_ms
    }

    /// Outcome message, set at scope close on both paths.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Cache a trained model on this record.
    ///
    /// The record takes exclusive ownership; the model is required for this
    /// run to participate in comparison.
    pub fn cache_model(&mut self, model: Box<dyn Model>) {
        self.model = Some(model);
    }

    /// Get the cached model, if any.
    #[must_use]
    pub fn model(&self) -> Option<&dyn Model> {
        self.model.as_deref()
    }

    /// Whether a model has been cached on this record.
    #[must_use]
    pub const fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Where the model blob was written, assigned only during persistence.
    #[must_use]
    pub fn model_save_file(&self) -> Option<&Path> {
        self.model_save_file.as_deref()
    }

    pub(crate) fn set_model_save_file(&mut self, path: PathBuf) {
        self.model_save_file = Some(path);
    }

    /// Close the scope on the success path: record elapsed runtime and a
    /// human-readable success message.
    pub(crate) fn finish_success(&mut self) {
        let elapsed = (Utc::now() - self.started_at).num_milliseconds();
        self.runtime_ms = Some(elapsed);
        self.message = Some(format!(
            "run `{}` successful, finished in {}",
            self.name,
            format_runtime(elapsed)
        ));
    }

    /// Close the scope on the failure path: the record stays partial
    /// (no runtime) but carries the error text.
    pub(crate) fn finish_failure(&mut self, error: &str) {
        self.message = Some(format!("error {error} at run `{}`", self.name));
    }
}

impl fmt::Debug for RunRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRecord")
            .field("name", &self.name)
            .field("run_id", &self.run_id)
            .field("started_at", &self.started_at)
            .field("runtime_ms", &self.runtime_ms)
            .field("message", &self.message)
            .field("model", &self.model.as_ref().map(|_| MODEL_PLACEHOLDER))
            .field("model_save_file", &self.model_save_file)
            .finish()
    }
}

/// Render elapsed milliseconds as minutes and seconds.
fn format_runtime(ms: i64) -> String {
    let total_secs = ms / 1000;
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}
