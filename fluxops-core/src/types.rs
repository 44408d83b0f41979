//! Value types passed between pipeline stages.
//!
//! Every artifact is created once per run by the stage that owns it and only
//! read afterwards; fields are private and exposed through accessors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where an ingestion request reads its records from.
///
/// Serialized by name. Deserialization also accepts the snake_case names and
/// the integer discriminants `0..=3` sent by clients that encode enums as
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SourceTypeRepr")]
pub enum SourceType {
    /// Records supplied directly in the spec payload.
    Inline = 0,
    /// A newline-delimited file on the local filesystem.
    LocalFile = 1,
    /// A newline-delimited object fetched from an object store URL.
    CloudObject = 2,
    /// Event bodies delivered with the request.
    Event = 3,
}

/// Accepted wire forms of [`SourceType`].
#[derive(Deserialize)]
#[serde(untagged)]
enum SourceTypeRepr {
    Index(u64),
    Name(String),
}

impl TryFrom<SourceTypeRepr> for SourceType {
    type Error = String;

    fn try_from(repr: SourceTypeRepr) -> Result<Self, Self::Error> {
        match repr {
            SourceTypeRepr::Index(0) => Ok(SourceType::Inline),
            SourceTypeRepr::Index(1) => Ok(SourceType::LocalFile),
            SourceTypeRepr::Index(2) => Ok(SourceType::CloudObject),
            SourceTypeRepr::Index(3) => Ok(SourceType::Event),
            SourceTypeRepr::Index(other) => {
                Err(format!("unknown source type {}, expected 0-3", other))
            }
            SourceTypeRepr::Name(name) => match name.as_str() {
                "Inline" | "inline" => Ok(SourceType::Inline),
                "LocalFile" | "local_file" => Ok(SourceType::LocalFile),
                "CloudObject" | "cloud_object" => Ok(SourceType::CloudObject),
                "Event" | "event" => Ok(SourceType::Event),
                other => Err(format!("unknown source type '{}'", other)),
            },
        }
    }
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Inline => "inline",
            SourceType::LocalFile => "local_file",
            SourceType::CloudObject => "cloud_object",
            SourceType::Event => "event",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes how a run should ingest its data.
///
/// Which of `path_or_uri` and `payload` is meaningful depends on
/// `source_type`; the ingestion capability validates that, not the
/// orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSpec {
    #[serde(alias = "source_type")]
    pub source_type: SourceType,
    #[serde(default, alias = "path_or_uri", skip_serializing_if = "Option::is_none")]
    pub path_or_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<String>>,
}

impl IngestionSpec {
    pub fn inline<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_type: SourceType::Inline,
            path_or_uri: None,
            payload: Some(records.into_iter().map(Into::into).collect()),
        }
    }

    pub fn local_file(path: impl Into<String>) -> Self {
        Self {
            source_type: SourceType::LocalFile,
            path_or_uri: Some(path.into()),
            payload: None,
        }
    }

    pub fn cloud_object(uri: impl Into<String>) -> Self {
        Self {
            source_type: SourceType::CloudObject,
            path_or_uri: Some(uri.into()),
            payload: None,
        }
    }

    pub fn event<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_type: SourceType::Event,
            path_or_uri: None,
            payload: Some(records.into_iter().map(Into::into).collect()),
        }
    }

    /// Attach a path, URI, or event topic.
    pub fn with_path_or_uri(mut self, path_or_uri: impl Into<String>) -> Self {
        self.path_or_uri = Some(path_or_uri.into());
        self
    }
}

/// A batch of raw records produced by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    source: String,
    timestamp: DateTime<Utc>,
    records: Vec<String>,
}

impl DataBatch {
    pub fn new(source: impl Into<String>, timestamp: DateTime<Utc>, records: Vec<String>) -> Self {
        Self {
            source: source.into(),
            timestamp,
            records,
        }
    }

    /// Create a batch stamped with the current UTC time.
    pub fn now(source: impl Into<String>, records: Vec<String>) -> Self {
        Self::new(source, Utc::now(), records)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn records(&self) -> &[String] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Numeric features derived from a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    features: Vec<f64>,
}

impl FeatureSet {
    pub fn new(features: Vec<f64>) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Predictions emitted by a model executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    predictions: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<String>,
}

impl ModelOutput {
    pub fn new(predictions: Vec<f64>, metadata: Option<String>) -> Self {
        Self {
            predictions,
            metadata,
        }
    }

    pub fn predictions(&self) -> &[f64] {
        &self.predictions
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }
}

/// Metrics computed from model output; the final value of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    succeeded: bool,
    message: Option<String>,
    metrics: BTreeMap<String, f64>,
}

impl EvaluationResult {
    pub fn new(succeeded: bool, metrics: BTreeMap<String, f64>, message: Option<String>) -> Self {
        Self {
            succeeded,
            message,
            metrics,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}
