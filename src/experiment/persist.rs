//! Persistence: statistics snapshot, model blobs, and the console report
//!
//! `save` writes one directory per experiment containing a model blob per
//! modeled run plus `experiment_statistics.json`. Persistence failures are
//! logged and swallowed; the only signals are log output and missing files.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::Result;

use super::compare::RunScores;
use super::lifecycle::{Experiment, ExperimentStatus};
use super::run_record::{Model, RunRecord, MODEL_PLACEHOLDER};

/// File name of the statistics document inside the experiment directory.
pub const STATISTICS_FILE: &str = "experiment_statistics.json";

/// Model-persistence collaborator.
///
/// Writes one trained model to one file. The serialization format is the
/// collaborator's concern; the harness only decides the path.
pub trait ModelStore {
    /// Write `model` to `path`.
    ///
    /// # Errors
    ///
    /// Any failure writing the blob.
    fn dump(&self, model: &dyn Model, path: &Path) -> anyhow::Result<()>;
}

/// Serializable snapshot of one committed run.
///
/// The model reference is not serializable; when present it is replaced by
/// the [`MODEL_PLACEHOLDER`] token so the document always serializes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    /// Run name, the key in the run table.
    pub name: String,
    /// Opaque run identifier.
    pub run_id: String,
    /// When the run scope opened.
    pub started_at: DateTime<Utc>,
    /// Elapsed milliseconds; absent for runs that failed.
    pub runtime_ms: Option<i64>,
    /// Outcome message from scope close.
    pub message: Option<String>,
    /// [`MODEL_PLACEHOLDER`] when the run cached a model, `None` otherwise.
    pub model: Option<String>,
    /// Where the model blob was written, assigned during persistence.
    pub model_save_file: Option<PathBuf>,
}

impl From<&RunRecord> for RunSummary {
    fn from(record: &RunRecord) -> Self {
        Self {
            name: record.name().to_string(),
            run_id: record.run_id().to_string(),
            started_at: record.started_at(),
            runtime_ms: record.runtime_ms(),
            message: record.message().map(str::to_string),
            model: record.has_model().then(|| MODEL_PLACEHOLDER.to_string()),
            model_save_file: record.model_save_file().map(Path::to_path_buf),
        }
    }
}

/// The persisted statistics document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentStats {
    /// When the experiment lifecycle opened.
    pub experiment_start: DateTime<Utc>,
    /// Experiment identifier.
    pub experiment_id: String,
    /// Lifecycle status at snapshot time.
    pub experiment_status: ExperimentStatus,
    /// Configured task type, if any.
    pub task_type: Option<String>,
    /// Comparison scores, present when computed or computable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<RunScores>>,
    /// The full run table.
    pub runs: Vec<RunSummary>,
}

impl Experiment {
    /// Assemble the statistics snapshot.
    ///
    /// Reuses the scores of the last comparison when present; otherwise,
    /// when both metrics and runs exist, runs a comparison first. The
    /// snapshot never fails: an uncomputable comparison just leaves
    /// `scores` absent.
    pub fn stats(&mut self) -> ExperimentStats {
        if self.computed_scores.is_none() && !self.metrics.is_empty() && !self.runs.is_empty() {
            if let Err(err) = self.compare(None) {
                warn!(error = %err, "could not compute scores for statistics");
            }
        }
        ExperimentStats {
            experiment_start: self.started_at,
            experiment_id: self.experiment_id.clone(),
            experiment_status: self.status,
            task_type: self.task_type.clone(),
            scores: self
                .computed_scores
                .as_ref()
                .filter(|scores| !scores.is_empty())
                .cloned(),
            runs: self.runs.iter().map(RunSummary::from).collect(),
        }
    }

    /// Persist the experiment under `<root>/experiments/<name>/`.
    ///
    /// Every run with a cached model gets its blob written via `store` to a
    /// path derived from the run name, then the statistics document is
    /// written alongside. Never raises: any failure in the sequence is
    /// logged and swallowed, so callers must not rely on `save` to signal
    /// success.
    pub fn save(&mut self, root: impl AsRef<Path>, store: &dyn ModelStore) {
        if let Err(err) = self.try_save(root.as_ref(), store) {
            error!(error = %err, "could not write experiment to disk");
        }
    }

    fn try_save(&mut self, root: &Path, store: &dyn ModelStore) -> anyhow::Result<()> {
        let dir = root.join("experiments").join(sanitize_name(&self.name));
        fs::create_dir_all(&dir)?;

        for run in &mut self.runs {
            if run.has_model() {
                run.set_model_save_file(dir.join(format!("{}_run.model", run.name())));
            }
        }
        for run in &self.runs {
            if let (Some(model), Some(path)) = (run.model(), run.model_save_file()) {
                store.dump(model, path)?;
            }
        }

        let stats = self.stats();
        fs::write(dir.join(STATISTICS_FILE), serde_json::to_string_pretty(&stats)?)?;
        Ok(())
    }

    /// The statistics document pretty-printed with sorted keys, for console
    /// inspection.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the snapshot cannot be rendered.
    pub fn info(&mut self) -> Result<String> {
        // through Value so map keys come out sorted
        let value = serde_json::to_value(self.stats())?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

/// Directory-safe experiment name: lowercase, spaces replaced.
fn sanitize_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}
