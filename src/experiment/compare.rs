//! Comparison engine: per-run scores and the tabulated score matrix
//!
//! `compare` walks the committed run table, evaluates every registered
//! metric against each run's cached model, and tabulates the results with
//! one row per scored run. Runs without a model and runs whose evaluation
//! errors are logged and excluded; the rest of the comparison proceeds.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::metrics::Metric;

use super::evaluator::evaluate_run;
use super::lifecycle::Experiment;

/// Metric scores for one evaluated run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunScores {
    run_name: String,
    scores: HashMap<String, f64>,
}

impl RunScores {
    pub(crate) fn new(run_name: impl Into<String>, scores: HashMap<String, f64>) -> Self {
        Self {
            run_name: run_name.into(),
            scores,
        }
    }

    /// Name of the evaluated run.
    #[must_use]
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Value of one metric, if it was computed for this run.
    #[must_use]
    pub fn get(&self, metric_name: &str) -> Option<f64> {
        self.scores.get(metric_name).copied()
    }

    /// All metric values for this run.
    #[must_use]
    pub const fn scores(&self) -> &HashMap<String, f64> {
        &self.scores
    }
}

/// Tabulated comparison: one row per scored run, one column per metric in
/// registration order, preceded by the run name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ScoreTable {
    fn build(scores: &[RunScores], metric_names: &[String]) -> Self {
        let mut headers = Vec::with_capacity(metric_names.len() + 1);
        headers.push(String::from("run_name"));
        headers.extend(metric_names.iter().cloned());

        let rows = scores
            .iter()
            .map(|run| {
                let mut row = Vec::with_capacity(headers.len());
                row.push(run.run_name().to_string());
                for name in metric_names {
                    row.push(
                        run.get(name)
                            .map(|value| format!("{value:.4}"))
                            .unwrap_or_default(),
                    );
                }
                row
            })
            .collect();

        Self { headers, rows }
    }

    /// Column headers: `run_name` followed by metric names.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// One row per scored run.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

impl fmt::Display for ScoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.headers.iter().map(String::len).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let render = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            for (i, (cell, width)) in cells.iter().zip(widths.iter().copied()).enumerate() {
                if i > 0 {
                    write!(f, "  ")?;
                }
                write!(f, "{cell:<width$}")?;
            }
            writeln!(f)
        };

        render(f, &self.headers)?;
        for row in &self.rows {
            render(f, row)?;
        }
        Ok(())
    }
}

impl Experiment {
    /// Evaluate every committed run and tabulate the scores.
    ///
    /// `extra_metrics`, when given, are appended to the registered list
    /// before evaluation. Empty metric or run tables are logged, not errors.
    /// Each call recomputes from scratch; nothing is reused across calls.
    ///
    /// Runs without a cached model and runs whose evaluation fails are
    /// logged and excluded; the remaining runs still produce rows. An
    /// experiment with nothing evaluated yields a table with headers and no
    /// rows.
    ///
    /// # Errors
    ///
    /// Per-run evaluation failures are absorbed, so comparison itself does
    /// not fail; the `Result` mirrors [`Experiment::draw`].
    pub fn compare(&mut self, extra_metrics: Option<Vec<Box<dyn Metric>>>) -> Result<ScoreTable> {
        if let Some(extra) = extra_metrics {
            self.metrics.extend(extra);
        }
        if self.metrics.is_empty() {
            warn!("no metrics available for compute");
        }
        if self.runs.is_empty() {
            info!("no runs available for compute");
        }

        let mut scores = Vec::new();
        for run in &self.runs {
            let Some(data) = self.data.as_deref() else {
                warn!(run = run.name(), "no validation data attached, skipping evaluation");
                continue;
            };
            match evaluate_run(run, data, &self.metrics) {
                Ok(run_scores) => scores.push(RunScores::new(run.name(), run_scores)),
                Err(Error::ModelNotCached(name)) => {
                    info!(run = %name, "run did not cache a model");
                }
                Err(err) => {
                    error!(run = run.name(), error = %err, "failed to generate statistics");
                }
            }
        }

        let table = ScoreTable::build(&scores, &self.metric_names());
        self.computed_scores = Some(scores);
        Ok(table)
    }

    /// Tabulate the scores from the last comparison.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoScores`] when no comparison has produced scores.
    pub fn draw(&self) -> Result<ScoreTable> {
        let scores = self
            .computed_scores
            .as_deref()
            .filter(|scores| !scores.is_empty())
            .ok_or(Error::NoScores)?;
        Ok(ScoreTable::build(scores, &self.metric_names()))
    }

    fn metric_names(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::evaluator::EvalData;
    use super::super::lifecycle::ExperimentConfig;
    use super::super::run_record::Model;
    use super::*;
    use crate::metrics::{AccuracyScore, PrecisionScore, RecallScore};

    struct ConstantModel(f64);

    impl Model for ConstantModel {
        fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
            vec![self.0; features.len()]
        }
    }

    struct MemoryData {
        features: Vec<Vec<f64>>,
        labels: Vec<f64>,
    }

    impl EvalData for MemoryData {
        fn validation_features(&self) -> &[Vec<f64>] {
            &self.features
        }

        fn validation_labels(&self) -> &[f64] {
            &self.labels
        }
    }

    fn binary_data() -> Box<dyn EvalData> {
        Box::new(MemoryData {
            features: vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]],
            labels: vec![0.0, 1.0, 1.0, 0.0],
        })
    }

    fn config() -> ExperimentConfig {
        ExperimentConfig::new("compare tests")
            .metric(Box::new(PrecisionScore))
            .data(binary_data())
    }

    #[test]
    fn test_compare_with_nothing_registered_logs_and_returns() {
        let mut experiment = Experiment::start(ExperimentConfig::new("empty"));
        let table = experiment.compare(None).unwrap();
        assert_eq!(table.headers(), ["run_name"]);
        assert!(table.rows().is_empty());
    }

    #[test]
    fn test_compare_skips_runs_without_models() {
        let mut experiment = Experiment::start(config());
        experiment.run("modeled", |run| {
            run.cache_model(Box::new(ConstantModel(1.0)));
            Ok(())
        });
        experiment.run("bare", |_| Ok(()));

        let table = experiment.compare(None).unwrap();
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0][0], "modeled");
    }

    #[test]
    fn test_compare_isolates_evaluation_errors() {
        // returns too few predictions, so its evaluation errors out
        struct ShortModel;
        impl Model for ShortModel {
            fn predict(&self, _features: &[Vec<f64>]) -> Vec<f64> {
                vec![1.0]
            }
        }

        let mut experiment = Experiment::start(config());
        experiment.run("broken", |run| {
            run.cache_model(Box::new(ShortModel));
            Ok(())
        });
        experiment.run("healthy", |run| {
            run.cache_model(Box::new(ConstantModel(1.0)));
            Ok(())
        });

        let table = experiment.compare(None).unwrap();
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0][0], "healthy");
    }

    #[test]
    fn test_compare_rows_follow_run_order() {
        let mut experiment = Experiment::start(config());
        experiment.run("zebra", |run| {
            run.cache_model(Box::new(ConstantModel(1.0)));
            Ok(())
        });
        experiment.run("aardvark", |run| {
            run.cache_model(Box::new(ConstantModel(0.0)));
            Ok(())
        });

        let table = experiment.compare(None).unwrap();
        let names: Vec<&str> = table.rows().iter().map(|row| row[0].as_str()).collect();
        assert_eq!(names, ["zebra", "aardvark"]);
    }

    #[test]
    fn test_compare_appends_extra_metrics() {
        let mut experiment = Experiment::start(config());
        experiment.run("modeled", |run| {
            run.cache_model(Box::new(ConstantModel(1.0)));
            Ok(())
        });

        let table = experiment
            .compare(Some(vec![Box::new(RecallScore), Box::new(AccuracyScore)]))
            .unwrap();
        assert_eq!(
            table.headers(),
            ["run_name", "precision_score", "recall_score", "accuracy_score"]
        );
        assert_eq!(experiment.metrics().len(), 3);
    }

    #[test]
    fn test_draw_before_compare_is_an_error() {
        let experiment = Experiment::start(config());
        assert!(matches!(experiment.draw(), Err(Error::NoScores)));
    }

    #[test]
    fn test_draw_reuses_cached_scores() {
        let mut experiment = Experiment::start(config());
        experiment.run("modeled", |run| {
            run.cache_model(Box::new(ConstantModel(1.0)));
            Ok(())
        });
        experiment.compare(None).unwrap();

        // a run added after compare is invisible until the next compare
        experiment.run("late", |run| {
            run.cache_model(Box::new(ConstantModel(0.0)));
            Ok(())
        });
        assert_eq!(experiment.draw().unwrap().rows().len(), 1);
        assert_eq!(experiment.compare(None).unwrap().rows().len(), 2);
    }

    #[test]
    fn test_compare_without_data_skips_every_run() {
        let mut experiment =
            Experiment::start(ExperimentConfig::new("no data").metric(Box::new(PrecisionScore)));
        experiment.run("modeled", |run| {
            run.cache_model(Box::new(ConstantModel(1.0)));
            Ok(())
        });

        let table = experiment.compare(None).unwrap();
        assert!(table.rows().is_empty());
    }

    #[test]
    fn test_display_renders_headers_and_rows() {
        let mut experiment = Experiment::start(config());
        experiment.run("modeled", |run| {
            run.cache_model(Box::new(ConstantModel(1.0)));
            Ok(())
        });

        let rendered = experiment.compare(None).unwrap().to_string();
        let mut lines = rendered.lines();
        assert!(lines.next().unwrap().starts_with("run_name"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("modeled"));
        assert!(row.contains("0.5000"));
    }
}
