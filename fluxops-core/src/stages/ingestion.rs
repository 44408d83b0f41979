//! Default ingestion: inline payloads, local files, cloud objects over HTTP,
//! and event bodies.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::capability::DataIngestion;
use crate::config::IngestionConfig;
use crate::error::StageError;
use crate::types::{DataBatch, IngestionSpec, SourceType};

/// Ingestion supporting every [`SourceType`].
///
/// Local files and cloud objects are read as newline-delimited records.
/// Cloud objects are fetched with a plain HTTP(S) `GET`; object stores that
/// need signed requests should sit behind a pre-signed URL. Objects larger
/// than the configured limit are rejected.
#[derive(Debug, Clone)]
pub struct DefaultDataIngestion {
    client: reqwest::Client,
    max_object_bytes: u64,
}

impl Default for DefaultDataIngestion {
    fn default() -> Self {
        Self::from_config(&IngestionConfig::default())
    }
}

impl DefaultDataIngestion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &IngestionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            max_object_bytes: config.max_object_bytes,
        }
    }

    pub fn with_max_object_bytes(mut self, max_object_bytes: u64) -> Self {
        self.max_object_bytes = max_object_bytes;
        self
    }

    pub fn max_object_bytes(&self) -> u64 {
        self.max_object_bytes
    }

    async fn read_local_file(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, StageError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| StageError::ingestion(format!("cannot open '{}': {}", path, e)))?;

        let mut lines = BufReader::new(file).lines();
        let mut records = Vec::new();
        loop {
            if cancel.is_cancelled() {
                return Err(StageError::Cancelled);
            }
            match lines.next_line().await {
                Ok(Some(line)) => records.push(line),
                Ok(None) => break,
                Err(e) => {
                    return Err(StageError::ingestion(format!(
                        "failed reading '{}': {}",
                        path, e
                    )));
                }
            }
        }
        Ok(records)
    }

    async fn fetch_object(
        &self,
        uri: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, StageError> {
        let url = reqwest::Url::parse(uri)
            .map_err(|e| StageError::spec_validation(format!("invalid object URI '{}': {}", uri, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StageError::spec_validation(format!(
                "unsupported object URI scheme '{}'; expected http or https",
                url.scheme()
            )));
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StageError::Cancelled),
            response = self.client.get(url).send() => response?,
        };
        let mut response = response.error_for_status()?;
        let limit = self.max_object_bytes;
        if let Some(length) = response.content_length() {
            if length > limit {
                return Err(StageError::ingestion(format!(
                    "object '{}' is {} bytes, larger than the {} byte limit",
                    uri, length, limit
                )));
            }
        }

        let mut body = Vec::new();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StageError::Cancelled),
                chunk = response.chunk() => chunk?,
            };
            match chunk {
                Some(bytes) => {
                    if (body.len() + bytes.len()) as u64 > limit {
                        return Err(StageError::ingestion(format!(
                            "object '{}' exceeds the {} byte limit",
                            uri, limit
                        )));
                    }
                    body.extend_from_slice(&bytes);
                }
                None => break,
            }
        }

        let text = String::from_utf8(body)
            .map_err(|e| StageError::ingestion(format!("object '{}' is not UTF-8: {}", uri, e)))?;
        Ok(text.lines().map(str::to_string).collect())
    }
}

/// The path or URI for source types that require one.
fn required_location(spec: &IngestionSpec) -> Result<&str, StageError> {
    match spec.path_or_uri.as_deref().map(str::trim) {
        Some(location) if !location.is_empty() => Ok(location),
        _ => Err(StageError::spec_validation(format!(
            "path_or_uri must be provided for {} ingestion",
            spec.source_type
        ))),
    }
}

#[async_trait]
impl DataIngestion for DefaultDataIngestion {
    async fn ingest(
        &self,
        spec: &IngestionSpec,
        cancel: &CancellationToken,
    ) -> Result<DataBatch, StageError> {
        if cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }

        match spec.source_type {
            SourceType::Inline => {
                let records = spec.payload.clone().unwrap_or_default();
                tracing::info!(records = records.len(), "Ingested inline payload");
                Ok(DataBatch::now("inline", records))
            }
            SourceType::LocalFile => {
                let path = required_location(spec)?;
                tracing::info!(path, "Reading local file");
                let records = self.read_local_file(path, cancel).await?;
                Ok(DataBatch::now(path, records))
            }
            SourceType::CloudObject => {
                let uri = required_location(spec)?;
                tracing::info!(uri, "Fetching cloud object");
                let records = self.fetch_object(uri, cancel).await?;
                tracing::debug!(uri, records = records.len(), "Fetched cloud object");
                Ok(DataBatch::now(uri, records))
            }
            SourceType::Event => {
                let source = spec
                    .path_or_uri
                    .as_deref()
                    .filter(|topic| !topic.trim().is_empty())
                    .unwrap_or("event");
                let records = match &spec.payload {
                    Some(payload) => payload.clone(),
                    None => {
                        tracing::warn!(source, "Event ingestion without payload; returning empty batch");
                        Vec::new()
                    }
                };
                tracing::info!(source, records = records.len(), "Ingested event payload");
                Ok(DataBatch::now(source, records))
            }
        }
    }
}
