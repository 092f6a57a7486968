//! Metric evaluation for a single run
//!
//! Given one committed run and the experiment's validation data, produce a
//! metric-name to value mapping. Metrics in the default binary set are
//! invoked under micro averaging so they hold up on multiclass labels;
//! everything else is invoked plainly with (labels, predictions).

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::metrics::{Average, Metric};

use super::run_record::RunRecord;

/// Metrics that need an explicit averaging policy beyond strict binary
/// classification.
pub const DEFAULT_BINARY_METRICS: [&str; 3] = ["precision_score", "f1_score", "recall_score"];

/// Validation-data collaborator.
///
/// The core reads exactly two attributes and never mutates them. How the
/// container splits train/validation/test is its own business.
pub trait EvalData {
    /// Validation feature rows.
    fn validation_features(&self) -> &[Vec<f64>];
    /// Validation labels, one per feature row.
    fn validation_labels(&self) -> &[f64];
}

/// Evaluate every registered metric for one run.
///
/// # Errors
///
/// Returns [`Error::ModelNotCached`] when the run has no model (the caller
/// logs and skips, it is not a comparison failure) and [`Error::Evaluation`]
/// when predictions do not line up with the validation labels.
pub(crate) fn evaluate_run(
    record: &RunRecord,
    data: &dyn EvalData,
    metrics: &[Box<dyn Metric>],
) -> Result<HashMap<String, f64>> {
    let Some(model) = record.model() else {
        return Err(Error::ModelNotCached(record.name().to_string()));
    };

    let labels = data.validation_labels();
    let predictions = model.predict(data.validation_features());
    if predictions.len() != labels.len() {
        return Err(Error::Evaluation {
            run: record.name().to_string(),
            reason: format!(
                "expected {} predictions, model returned {}",
                labels.len(),
                predictions.len()
            ),
        });
    }

    let mut scores = HashMap::new();
    for metric in metrics {
        let average = DEFAULT_BINARY_METRICS
            .contains(&metric.name())
            .then_some(Average::Micro);
        let value = metric.score(labels, &predictions, average);
        scores.insert(metric.name().to_string(), value);
    }
    Ok(scores)
}
