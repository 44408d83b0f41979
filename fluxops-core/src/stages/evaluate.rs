//! Mean-of-predictions evaluator.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use crate::capability::Evaluator;
use crate::error::StageError;
use crate::types::{EvaluationResult, ModelOutput};

pub const MEAN_METRIC: &str = "mean";
pub const COUNT_METRIC: &str = "count";

/// Reports the mean and number of predictions. The mean of no predictions is 0.
/// Non-finite predictions fail the stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanEvaluator;

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[async_trait]
impl Evaluator for MeanEvaluator {
    async fn evaluate(
        &self,
        output: &ModelOutput,
        _cancel: &CancellationToken,
    ) -> Result<EvaluationResult, StageError> {
        let predictions = output.predictions();
        if let Some(position) = predictions.iter().position(|p| !p.is_finite()) {
            return Err(StageError::evaluation(format!(
                "prediction {} is not a finite number",
                position
            )));
        }
        let mean = mean(predictions);

        let mut metrics = BTreeMap::new();
        metrics.insert(MEAN_METRIC.to_string(), mean);
        metrics.insert(COUNT_METRIC.to_string(), predictions.len() as f64);

        tracing::info!(mean, "Evaluated model output");
        Ok(EvaluationResult::new(true, metrics, Some("basic".to_string())))
    }
}
