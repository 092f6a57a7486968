//! Classification metrics
//!
//! A [`Metric`] is a callable taking true labels and predictions and producing
//! a scalar score, optionally under an [`Average`] policy that adapts binary
//! metrics to multiclass labels. Class labels are carried as `f64`; binary
//! metrics treat `1.0` as the positive class.
//!
//! Whether a metric fits the task type of the experiment is not validated
//! here; a regression metric applied to a classification run scores garbage
//! rather than erroring.

/// Averaging policy for adapting binary metrics to multiclass labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Average {
    /// Pool true-positive/false-positive/false-negative counts across all
    /// classes before dividing.
    Micro,
    /// Unweighted mean of the per-class scores.
    Macro,
}

/// A scalar evaluation metric over true labels and predictions.
pub trait Metric {
    /// Metric name used for score-table columns and binary-set dispatch.
    fn name(&self) -> &str;

    /// Score `predictions` against `labels`.
    ///
    /// `average` is `None` for plain binary scoring; metrics that have no
    /// notion of averaging ignore it.
    fn score(&self, labels: &[f64], predictions: &[f64], average: Option<Average>) -> f64;
}

/// Per-class confusion counts.
#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    tp: u64,
    fp: u64,
    fn_: u64,
}

impl Counts {
    fn precision(self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    fn f1(self) -> f64 {
        harmonic(self.precision(), self.recall())
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn harmonic(p: f64, r: f64) -> f64 {
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

/// Distinct classes present in either labels or predictions, sorted.
fn classes(labels: &[f64], predictions: &[f64]) -> Vec<f64> {
    let mut all: Vec<f64> = labels.iter().chain(predictions.iter()).copied().collect();
    all.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    all.dedup();
    all
}

fn counts_for(class: f64, labels: &[f64], predictions: &[f64]) -> Counts {
    let mut counts = Counts::default();
    for (&label, &pred) in labels.iter().zip(predictions) {
        let actual = (label - class).abs() < f64::EPSILON;
        let predicted = (pred - class).abs() < f64::EPSILON;
        match (actual, predicted) {
            (true, true) => counts.tp += 1,
            (false, true) => counts.fp += 1,
            (true, false) => counts.fn_ += 1,
            (false, false) => {}
        }
    }
    counts
}

/// Pooled counts across every class (micro averaging).
fn pooled(labels: &[f64], predictions: &[f64]) -> Counts {
    let mut total = Counts::default();
    for class in classes(labels, predictions) {
        let c = counts_for(class, labels, predictions);
        total.tp += c.tp;
        total.fp += c.fp;
        total.fn_ += c.fn_;
    }
    total
}

fn averaged<F>(labels: &[f64], predictions: &[f64], average: Option<Average>, per_counts: F) -> f64
where
    F: Fn(Counts) -> f64,
{
    match average {
        None => per_counts(counts_for(1.0, labels, predictions)),
        Some(Average::Micro) => per_counts(pooled(labels, predictions)),
        Some(Average::Macro) => {
            let all = classes(labels, predictions);
            if all.is_empty() {
                return 0.0;
            }
            let sum: f64 = all
                .iter()
                .map(|&class| per_counts(counts_for(class, labels, predictions)))
                .sum();
            sum / all.len() as f64
        }
    }
}

/// Precision: fraction of predicted positives that are true positives.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecisionScore;

impl Metric for PrecisionScore {
    fn name(&self) -> &str {
        "precision_score"
    }

    fn score(&self, labels: &[f64], predictions: &[f64], average: Option<Average>) -> f64 {
        averaged(labels, predictions, average, Counts::precision)
    }
}

/// Recall: fraction of actual positives that were predicted.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecallScore;

impl Metric for RecallScore {
    fn name(&self) -> &str {
        "recall_score"
    }

    fn score(&self, labels: &[f64], predictions: &[f64], average: Option<Average>) -> f64 {
        averaged(labels, predictions, average, Counts::recall)
    }
}

/// F1: harmonic mean of precision and recall.
#[derive(Debug, Clone, Copy, Default)]
pub struct F1Score;

impl Metric for F1Score {
    fn name(&self) -> &str {
        "f1_score"
    }

    fn score(&self, labels: &[f64], predictions: &[f64], average: Option<Average>) -> f64 {
        averaged(labels, predictions, average, Counts::f1)
    }
}

/// Accuracy: fraction of predictions matching labels. Ignores `average`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccuracyScore;

impl Metric for AccuracyScore {
    fn name(&self) -> &str {
        "accuracy_score"
    }

    fn score(&self, labels: &[f64], predictions: &[f64], _average: Option<Average>) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        let correct = labels
            .iter()
            .zip(predictions)
            .filter(|(l, p)| (**l - **p).abs() < f64::EPSILON)
            .count();
        correct as f64 / labels.len() as f64
    }
}
