//! # Tracklab: Experiment Tracking Harness
//!
//! Tracklab scopes a sequence of named runs (model-training attempts) under
//! one experiment, records timing and outcome metadata for each run, computes
//! evaluation metrics against cached models, tabulates the results for
//! comparison, and persists experiment state to disk.
//!
//! Designed for a single practitioner and a single process: strictly local,
//! sequential execution with no concurrency primitives in the core.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tracklab::experiment::{Experiment, ExperimentConfig};
//! use tracklab::metrics::PrecisionScore;
//!
//! let config = ExperimentConfig::new("churn baseline")
//!     .task_type("classification")
//!     .metric(Box::new(PrecisionScore));
//!
//! let experiment = Experiment::track(config, |exp| {
//!     exp.run("logistic", |run| {
//!         // train a model, then cache it on the record
//!         Ok(())
//!     });
//!     Ok(())
//! })?;
//! # Ok::<(), anyhow::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod experiment;
pub mod metrics;
pub mod observability;

pub use error::{Error, Result};
