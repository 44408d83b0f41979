//! Stage capability contracts.
//!
//! The orchestrator only knows these traits. Each has one canonical operation
//! that receives the previous stage's artifact by reference and an explicit
//! cancellation token. Implementations must be safe to share across
//! concurrent runs.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::StageError;
use crate::types::{DataBatch, EvaluationResult, FeatureSet, IngestionSpec, ModelOutput};

/// Reads raw records described by an [`IngestionSpec`].
#[async_trait]
pub trait DataIngestion: Send + Sync {
    /// Validate `spec` for its source type and produce a batch.
    ///
    /// Fails with [`StageError::SpecValidation`] when a required field is
    /// missing, [`StageError::Ingestion`] / [`StageError::Io`] when the source
    /// cannot be read, and [`StageError::Cancelled`] when `cancel` fires
    /// mid-read.
    async fn ingest(
        &self,
        spec: &IngestionSpec,
        cancel: &CancellationToken,
    ) -> Result<DataBatch, StageError>;
}

/// Turns raw records into numeric features. An empty batch is valid input.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    async fn preprocess(
        &self,
        batch: &DataBatch,
        cancel: &CancellationToken,
    ) -> Result<FeatureSet, StageError>;
}

/// Produces predictions for a feature set.
#[async_trait]
pub trait ModelExecutor: Send + Sync {
    /// Fails with [`StageError::Model`] when the underlying model is unavailable.
    async fn execute(
        &self,
        features: &FeatureSet,
        cancel: &CancellationToken,
    ) -> Result<ModelOutput, StageError>;
}

/// Computes metrics from predictions.
///
/// Implementations must return a defined result for an empty prediction set
/// rather than failing.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        output: &ModelOutput,
        cancel: &CancellationToken,
    ) -> Result<EvaluationResult, StageError>;
}

/// Side-effect sink that receives every artifact of a completed run.
#[async_trait]
pub trait ArtifactRouter: Send + Sync {
    async fn route(
        &self,
        batch: &DataBatch,
        features: &FeatureSet,
        output: &ModelOutput,
        evaluation: &EvaluationResult,
        cancel: &CancellationToken,
    ) -> Result<(), StageError>;
}
