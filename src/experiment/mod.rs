//! Experiment lifecycle and metrics aggregation
//!
//! This module is the core of the harness: the state machine governing
//! experiment and run start/success/failure transitions, the scoped-run
//! protocol, and the comparison pass that turns cached per-run models into
//! a tabulated score matrix.
//!
//! ## Structure
//!
//! ```text
//! Experiment (1) ──< RunRecord (N)
//!      │                  └── Option<Box<dyn Model>>
//!      ├── Vec<Box<dyn Metric>>     registered for comparison
//!      └── Option<Vec<RunScores>>   last comparison result
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tracklab::experiment::{Experiment, ExperimentConfig};
//! use tracklab::metrics::{F1Score, PrecisionScore};
//!
//! let config = ExperimentConfig::new("spam filter")
//!     .task_type("classification")
//!     .metrics(vec![Box::new(PrecisionScore), Box::new(F1Score)]);
//!
//! let mut experiment = Experiment::track(config, |exp| {
//!     exp.run("naive bayes", |run| {
//!         // train, then run.cache_model(...)
//!         Ok(())
//!     });
//!     Ok(())
//! })?;
//!
//! let table = experiment.compare(None)?;
//! println!("{table}");
//! # Ok::<(), anyhow::Error>(())
//! ```

mod compare;
mod evaluator;
mod lifecycle;
mod persist;
mod run_record;

pub use compare::{RunScores, ScoreTable};
pub use evaluator::{EvalData, DEFAULT_BINARY_METRICS};
pub use lifecycle::{Experiment, ExperimentConfig, ExperimentStatus};
pub use persist::{ExperimentStats, ModelStore, RunSummary, STATISTICS_FILE};
pub use run_record::{Model, RunRecord, MODEL_PLACEHOLDER};
