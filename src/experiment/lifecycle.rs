//! Experiment lifecycle and the scoped-run protocol
//!
//! An [`Experiment`] is opened with [`Experiment::start`], populated through
//! one or more scoped runs, and closed with [`Experiment::finish`]. The two
//! scopes handle errors asymmetrically: an error in the lifecycle body is
//! logged and re-raised (fail fast at the top level), while an error inside a
//! run scope is logged and absorbed, committing a partial record so no run is
//! silently dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::metrics::Metric;

use super::compare::RunScores;
use super::evaluator::EvalData;
use super::run_record::RunRecord;

/// Terminal status of an experiment.
///
/// `Pending` until the lifecycle closes, then exactly one transition to
/// `Success` or `Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperimentStatus {
    /// Lifecycle is still open.
    Pending,
    /// Lifecycle body completed normally.
    Success,
    /// Lifecycle body carried an error out.
    Fail,
}

impl std::fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Configuration for opening an experiment.
pub struct ExperimentConfig {
    pub(crate) name: String,
    pub(crate) task_type: Option<String>,
    pub(crate) metrics: Vec<Box<dyn Metric>>,
    pub(crate) data: Option<Box<dyn EvalData>>,
}

impl ExperimentConfig {
    /// Create a configuration with the given experiment name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_type: None,
            metrics: Vec::new(),
            data: None,
        }
    }

    /// Set the task type (e.g. "classification"), recorded in the
    /// statistics document. Metric-vs-task-type mismatch is not validated.
    #[must_use]
    pub fn task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    /// Register one metric for comparison.
    #[must_use]
    pub fn metric(mut self, metric: Box<dyn Metric>) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Register several metrics for comparison.
    #[must_use]
    pub fn metrics(mut self, metrics: Vec<Box<dyn Metric>>) -> Self {
        self.metrics.extend(metrics);
        self
    }

    /// Attach the validation-data collaborator used by comparison.
    #[must_use]
    pub fn data(mut self, data: Box<dyn EvalData>) -> Self {
        self.data = Some(data);
        self
    }
}

/// An open experiment: identity, run table, registered metrics, and cached
/// comparison scores.
///
/// Owned by exactly one lifecycle invocation; not meant to be shared across
/// threads or nested. One run scope at a time is a usage invariant, not a
/// runtime-enforced lock.
pub struct Experiment {
    pub(crate) name: String,
    pub(crate) experiment_id: String,
    pub(crate) user: String,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) status: ExperimentStatus,
    pub(crate) task_type: Option<String>,
    pub(crate) metrics: Vec<Box<dyn Metric>>,
    pub(crate) data: Option<Box<dyn EvalData>>,
    /// Insertion-ordered run table; committed records are replaced in place
    /// on name reuse so iteration order stays stable.
    pub(crate) runs: Vec<RunRecord>,
    /// Last comparison result. Never invalidated automatically; recompute is
    /// always an explicit `compare` call.
    pub(crate) computed_scores: Option<Vec<RunScores>>,
}

impl Experiment {
    /// Open the lifecycle: assign an experiment id, the invoking user, and
    /// the start timestamp.
    #[must_use]
    pub fn start(config: ExperimentConfig) -> Self {
        let experiment_id = generate_id();
        let user = current_user();
        info!(
            experiment = %config.name,
            experiment_id = %experiment_id,
            user = %user,
            "experiment started"
        );
        Self {
            name: config.name,
            experiment_id,
            user,
            started_at: Utc::now(),
            status: ExperimentStatus::Pending,
            task_type: config.task_type,
            metrics: config.metrics,
            data: config.data,
            runs: Vec::new(),
            computed_scores: None,
        }
    }

    /// Close the lifecycle with the body's outcome.
    ///
    /// A normal outcome marks the experiment `Success`. An error outcome
    /// marks it `Fail`, logs the error, and hands the error back to the
    /// caller: top-level failures are never swallowed.
    ///
    /// # Errors
    ///
    /// Re-raises the error carried in `outcome`.
    pub fn finish(&mut self, outcome: anyhow::Result<()>) -> anyhow::Result<()> {
        match outcome {
            Ok(()) => {
                self.status = ExperimentStatus::Success;
                info!(experiment_id = %self.experiment_id, "experiment finished");
                Ok(())
            }
            Err(err) => {
                self.status = ExperimentStatus::Fail;
                error!(
                    experiment_id = %self.experiment_id,
                    error = %err,
                    "error occurred while running the experiment"
                );
                Err(err)
            }
        }
    }

    /// Run `body` inside a scoped lifecycle: start, execute, finish.
    ///
    /// # Errors
    ///
    /// Propagates any error the body returns, after the experiment has been
    /// marked `Fail` and the error logged.
    pub fn track<F>(config: ExperimentConfig, body: F) -> anyhow::Result<Self>
    where
        F: FnOnce(&mut Self) -> anyhow::Result<()>,
    {
        let mut experiment = Self::start(config);
        let outcome = body(&mut experiment);
        experiment.finish(outcome)?;
        Ok(experiment)
    }

    /// Open a run scope named `name` and hand the mutable record to `body`.
    ///
    /// On a normal return the record gets its runtime and a success message;
    /// on an error the record stays partial but carries the error text. In
    /// both cases the record is committed into the run table, and a reused
    /// name overwrites the earlier record in place (last write wins).
    ///
    /// Unlike the lifecycle, an error here is absorbed: the experiment
    /// continues with the next run.
    pub fn run<F>(&mut self, name: &str, body: F) -> &RunRecord
    where
        F: FnOnce(&mut RunRecord) -> anyhow::Result<()>,
    {
        let mut record = RunRecord::new(name, generate_id());
        match body(&mut record) {
            Ok(()) => {
                record.finish_success();
                info!(run = name, outcome = record.message().unwrap_or(""), "run completed");
            }
            Err(err) => {
                error!(run = name, error = %err, "run failed");
                record.finish_failure(&err.to_string());
            }
        }
        self.commit(record)
    }

    /// Commit a closed record under its name, replacing in place on reuse.
    fn commit(&mut self, record: RunRecord) -> &RunRecord {
        let index = match self.runs.iter().position(|r| r.name() == record.name()) {
            Some(index) => {
                debug!(run = record.name(), "run name reused, overwriting earlier record");
                self.runs[index] = record;
                index
            }
            None => {
                self.runs.push(record);
                self.runs.len() - 1
            }
        };
        &self.runs[index]
    }

    /// Append metrics to the registered list. The list only ever grows.
    pub fn add_metrics(&mut self, metrics: Vec<Box<dyn Metric>>) {
        self.metrics.extend(metrics);
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the experiment ID, assigned at start and immutable thereafter.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the invoking user recorded at start.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Get the start timestamp.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Get the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ExperimentStatus {
        self.status
    }

    /// Get the task type, if one was configured.
    #[must_use]
    pub fn task_type(&self) -> Option<&str> {
        self.task_type.as_deref()
    }

    /// Committed runs in insertion order.
    #[must_use]
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// Look up a committed run by name.
    #[must_use]
    pub fn get_run(&self, name: &str) -> Option<&RunRecord> {
        self.runs.iter().find(|r| r.name() == name)
    }

    /// Registered metrics in registration order.
    #[must_use]
    pub fn metrics(&self) -> &[Box<dyn Metric>] {
        &self.metrics
    }

    /// Scores from the last comparison, if one has run.
    #[must_use]
    pub fn computed_scores(&self) -> Option<&[RunScores]> {
        self.computed_scores.as_deref()
    }
}

impl std::fmt::Debug for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment")
            .field("name", &self.name)
            .field("experiment_id", &self.experiment_id)
            .field("user", &self.user)
            .field("started_at", &self.started_at)
            .field("status", &self.status)
            .field("task_type", &self.task_type)
            .field(
                "metrics",
                &self.metrics.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("data", &self.data.as_ref().map(|_| "<DATA>"))
            .field("runs", &self.runs)
            .field("computed_scores", &self.computed_scores)
            .finish()
    }
}

/// Collision-resistant opaque token; the exact algorithm is not load-bearing.
fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| String::from("unknown"))
}
