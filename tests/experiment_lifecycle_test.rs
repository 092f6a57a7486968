//! Experiment lifecycle integration tests
//!
//! Exercises the public API end to end: scoped runs, comparison, and the
//! persistence round-trip.

use std::fs;
use std::path::Path;

use anyhow::anyhow;
use tempfile::TempDir;

use tracklab::experiment::{
    EvalData, Experiment, ExperimentConfig, ExperimentStatus, Model, ModelStore,
    MODEL_PLACEHOLDER, STATISTICS_FILE,
};
use tracklab::metrics::{AccuracyScore, F1Score, PrecisionScore, RecallScore};
use tracklab::Error;

struct ConstantModel(f64);

impl Model for ConstantModel {
    fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
        vec![self.0; features.len()]
    }
}

/// Predicts the first feature of every row, thresholded at 0.5.
struct ThresholdModel;

impl Model for ThresholdModel {
    fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
        features
            .iter()
            .map(|row| f64::from(row.first().copied().unwrap_or_default() > 0.5))
            .collect()
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
        features: vec![vec![0.0], vec![1.0], vec![0.9], vec![0.1]],
        labels: vec![0.0, 1.0, 1.0, 0.0],
    })
}

struct StubStore;

impl ModelStore for StubStore {
    fn dump(&self, _model: &dyn Model, path: &Path) -> anyhow::Result<()> {
        fs::write(path, b"blob")?;
        Ok(())
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_lifecycle_success() {
    let experiment = Experiment::track(ExperimentConfig::new("happy path"), |exp| {
        exp.run("a", |_| Ok(()));
        exp.run("b", |_| Ok(()));
        Ok(())
    })
    .expect("lifecycle should succeed");

    assert_eq!(experiment.status(), ExperimentStatus::Success);
    assert_eq!(experiment.runs().len(), 2);
    for run in experiment.runs() {
        assert!(run.runtime_ms().is_some());
        assert!(run.message().unwrap().contains("successful"));
    }
}

#[test]
fn test_lifecycle_body_error_is_reraised() {
    let result = Experiment::track(ExperimentConfig::new("doomed"), |exp| {
        exp.run("fine", |_| Ok(()));
        Err(anyhow!("top level failure"))
    });

    assert_eq!(result.unwrap_err().to_string(), "top level failure");
}

#[test]
fn test_lifecycle_failure_status_via_explicit_pair() {
    let mut experiment = Experiment::start(ExperimentConfig::new("doomed"));
    let result = experiment.finish(Err(anyhow!("top level failure")));

    assert!(result.is_err());
    assert_eq!(experiment.status(), ExperimentStatus::Fail);
}

// =============================================================================
// Run scopes
// =============================================================================

#[test]
fn test_failed_run_commits_partial_record() {
    let experiment = Experiment::track(ExperimentConfig::new("partial"), |exp| {
        exp.run("broken", |_| Err(anyhow!("fit diverged")));
        Ok(())
    })
    .unwrap();

    let record = experiment.get_run("broken").expect("failed run must still be committed");
    assert!(record.runtime_ms().is_none());
    assert!(record.message().unwrap().contains("fit diverged"));
}

#[test]
fn test_reused_run_name_leaves_one_record() {
    let experiment = Experiment::track(ExperimentConfig::new("collisions"), |exp| {
        exp.run("same", |_| Ok(()));
        exp.run("same", |_| Ok(()));
        exp.run("same", |_| Err(anyhow!("third time unlucky")));
        Ok(())
    })
    .unwrap();

    assert_eq!(experiment.runs().len(), 1);
    // last write wins
    assert!(experiment.runs()[0].runtime_ms().is_none());
}

// =============================================================================
// Comparison
// =============================================================================

#[test]
fn test_compare_scores_only_modeled_runs() {
    let mut experiment = Experiment::start(
        ExperimentConfig::new("comparison")
            .metrics(vec![
                Box::new(PrecisionScore),
                Box::new(RecallScore),
                Box::new(F1Score),
            ])
            .data(binary_data()),
    );
    experiment.run("threshold", |run| {
        run.cache_model(Box::new(ThresholdModel));
        Ok(())
    });
    experiment.run("untrained", |_| Ok(()));

    let table = experiment.compare(None).unwrap();
    assert_eq!(
        table.headers(),
        ["run_name", "precision_score", "recall_score", "f1_score"]
    );
    assert_eq!(table.rows().len(), 1);
    assert_eq!(table.rows()[0][0], "threshold");

    // perfect separator on this data, micro-averaged
    let scores = experiment.computed_scores().unwrap();
    assert!((scores[0].get("precision_score").unwrap() - 1.0).abs() < f64::EPSILON);
    assert!((scores[0].get("f1_score").unwrap() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_compare_with_nothing_to_do_does_not_fail() {
    let mut experiment = Experiment::start(ExperimentConfig::new("empty"));
    let table = experiment.compare(None).unwrap();
    assert!(table.rows().is_empty());
}

#[test]
fn test_draw_without_scores_errors() {
    let experiment = Experiment::start(ExperimentConfig::new("undrawn"));
    assert!(matches!(experiment.draw(), Err(Error::NoScores)));
}

// =============================================================================
// Persistence round-trip
// =============================================================================

#[test]
fn test_save_round_trip() {
    let tmp = TempDir::new().unwrap();

    let mut experiment = Experiment::track(
        ExperimentConfig::new("Round Trip")
            .task_type("classification")
            .metric(Box::new(AccuracyScore))
            .data(binary_data()),
        |exp| {
            exp.run("constant", |run| {
                run.cache_model(Box::new(ConstantModel(1.0)));
                Ok(())
            });
            Ok(())
        },
    )
    .unwrap();

    experiment.save(tmp.path(), &StubStore);

    let dir = tmp.path().join("experiments").join("round_trip");
    assert!(dir.join("constant_run.model").exists());

    let doc = fs::read_to_string(dir.join(STATISTICS_FILE)).unwrap();
    let stats: serde_json::Value = serde_json::from_str(&doc).unwrap();

    assert_eq!(
        stats["experiment_id"].as_str().unwrap(),
        experiment.experiment_id()
    );
    assert_eq!(stats["experiment_status"].as_str().unwrap(), "SUCCESS");
    assert_eq!(stats["task_type"].as_str().unwrap(), "classification");

    let runs = stats["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["name"].as_str().unwrap(), "constant");
    assert_eq!(runs[0]["model"].as_str().unwrap(), MODEL_PLACEHOLDER);

    let scores = stats["scores"].as_array().unwrap();
    assert_eq!(scores[0]["run_name"].as_str().unwrap(), "constant");
}

#[test]
fn test_console_report_is_valid_json() {
    let mut experiment = Experiment::track(
        ExperimentConfig::new("report").data(binary_data()),
        |exp| {
            exp.run("only", |_| Ok(()));
            Ok(())
        },
    )
    .unwrap();

    let report = experiment.info().unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(value["experiment_status"], "SUCCESS");
}
