//! Stand-in model that sums its inputs.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::ModelExecutor;
use crate::error::StageError;
use crate::types::{FeatureSet, ModelOutput};

/// Metadata attached to every [`SumModelExecutor`] output.
pub const SUM_MODEL_METADATA: &str = "mock";

/// Emits a single prediction equal to the sum of the feature values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumModelExecutor;

#[async_trait]
impl ModelExecutor for SumModelExecutor {
    async fn execute(
        &self,
        features: &FeatureSet,
        _cancel: &CancellationToken,
    ) -> Result<ModelOutput, StageError> {
        let sum: f64 = features.features().iter().sum();
        tracing::info!(sum, "Executed sum model");
        Ok(ModelOutput::new(
            vec![sum],
            Some(SUM_MODEL_METADATA.to_string()),
        ))
    }
}
