//! Artifact routers: a `tracing` summary sink and a JSON-lines file sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::capability::ArtifactRouter;
use crate::error::StageError;
use crate::types::{DataBatch, EvaluationResult, FeatureSet, ModelOutput};

/// File name the [`FileArtifactRouter`] appends to.
pub const ARTIFACT_LOG_FILE: &str = "artifacts.jsonl";

/// Logs a one-line summary of every run's artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogArtifactRouter;

#[async_trait]
impl ArtifactRouter for LogArtifactRouter {
    async fn route(
        &self,
        batch: &DataBatch,
        features: &FeatureSet,
        output: &ModelOutput,
        evaluation: &EvaluationResult,
        _cancel: &CancellationToken,
    ) -> Result<(), StageError> {
        tracing::info!(
            source = batch.source(),
            records = batch.len(),
            features = features.len(),
            predictions = output.predictions().len(),
            metrics = evaluation.metrics().len(),
            "Routing artifacts"
        );
        Ok(())
    }
}

/// One persisted run, as written by [`FileArtifactRouter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub routed_at: DateTime<Utc>,
    pub source: String,
    pub ingested_at: DateTime<Utc>,
    pub record_count: usize,
    pub features: Vec<f64>,
    pub predictions: Vec<f64>,
    pub model_metadata: Option<String>,
    pub evaluation: EvaluationResult,
}

impl ArtifactRecord {
    pub fn from_artifacts(
        batch: &DataBatch,
        features: &FeatureSet,
        output: &ModelOutput,
        evaluation: &EvaluationResult,
    ) -> Self {
        Self {
            routed_at: Utc::now(),
            source: batch.source().to_string(),
            ingested_at: batch.timestamp(),
            record_count: batch.len(),
            features: features.features().to_vec(),
            predictions: output.predictions().to_vec(),
            model_metadata: output.metadata().map(str::to_string),
            evaluation: evaluation.clone(),
        }
    }
}

/// Appends one [`ArtifactRecord`] per run to `<directory>/artifacts.jsonl`.
///
/// Raw records are summarised by count; features, predictions and the
/// evaluation are stored in full. Writes from concurrent runs are serialised.
#[derive(Debug)]
pub struct FileArtifactRouter {
    directory: PathBuf,
    write_lock: Mutex<()>,
}

impl FileArtifactRouter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn log_path(&self) -> PathBuf {
        self.directory.join(ARTIFACT_LOG_FILE)
    }

    async fn append(&self, record: &ArtifactRecord) -> Result<(), StageError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| {
                StageError::routing(format!(
                    "cannot create '{}': {}",
                    self.directory.display(),
                    e
                ))
            })?;
        let path = self.log_path();
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StageError::routing(format!("cannot open '{}': {}", path.display(), e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StageError::routing(format!("cannot write '{}': {}", path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| StageError::routing(format!("cannot flush '{}': {}", path.display(), e)))?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactRouter for FileArtifactRouter {
    async fn route(
        &self,
        batch: &DataBatch,
        features: &FeatureSet,
        output: &ModelOutput,
        evaluation: &EvaluationResult,
        cancel: &CancellationToken,
    ) -> Result<(), StageError> {
        if cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }
        let record = ArtifactRecord::from_artifacts(batch, features, output, evaluation);
        self.append(&record).await?;
        tracing::debug!(path = %self.log_path().display(), source = batch.source(), "Wrote artifact record");
        Ok(())
    }
}
