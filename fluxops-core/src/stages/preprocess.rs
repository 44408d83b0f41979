//! Record-length feature extraction.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::Preprocessor;
use crate::error::StageError;
use crate::types::{DataBatch, FeatureSet};

/// Maps every record to its length in characters, one feature per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthPreprocessor;

#[async_trait]
impl Preprocessor for LengthPreprocessor {
    async fn preprocess(
        &self,
        batch: &DataBatch,
        _cancel: &CancellationToken,
    ) -> Result<FeatureSet, StageError> {
        let features: Vec<f64> = batch
            .records()
            .iter()
            .map(|record| record.chars().count() as f64)
            .collect();
        tracing::info!(
            records = batch.len(),
            features = features.len(),
            "Preprocessed records into features"
        );
        Ok(FeatureSet::new(features))
    }
}
