//! Error types for the FluxOps pipeline core.
//!
//! Uses `thiserror` for public API error types. Capabilities return
//! [`StageError`]; the orchestrator wraps it with the failing [`Stage`] into a
//! [`PipelineError`], keeping cancellation distinct from processing failures.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for the FluxOps core library.
#[derive(Debug, thiserror::Error)]
pub enum FluxError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A step of a pipeline run, used to attach context to failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingest,
    Preprocess,
    Execute,
    Evaluate,
    Route,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Preprocess => "preprocess",
            Stage::Execute => "execute",
            Stage::Evaluate => "evaluate",
            Stage::Route => "route",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a single stage capability.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Invalid ingestion spec: {message}")]
    SpecValidation { message: String },

    #[error("Ingestion failed: {message}")]
    Ingestion { message: String },

    #[error("Model unavailable: {message}")]
    Model { message: String },

    #[error("Evaluation failed: {message}")]
    Evaluation { message: String },

    #[error("Artifact routing failed: {message}")]
    Routing { message: String },

    #[error("Stage was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StageError {
    pub fn spec_validation(msg: impl Into<String>) -> Self {
        Self::SpecValidation {
            message: msg.into(),
        }
    }

    pub fn ingestion(msg: impl Into<String>) -> Self {
        Self::Ingestion {
            message: msg.into(),
        }
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model {
            message: msg.into(),
        }
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation {
            message: msg.into(),
        }
    }

    pub fn routing(msg: impl Into<String>) -> Self {
        Self::Routing {
            message: msg.into(),
        }
    }

    /// Short machine-readable kind, used in HTTP error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::SpecValidation { .. } => "spec_validation",
            StageError::Ingestion { .. } | StageError::Io(_) | StageError::Http(_) => "ingestion",
            StageError::Model { .. } => "model",
            StageError::Evaluation { .. } => "evaluation",
            StageError::Routing { .. } => "routing",
            StageError::Cancelled => "cancelled",
            StageError::Serialization(_) => "serialization",
        }
    }
}

/// Outcome of a failed pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Pipeline cancelled during {stage} stage")]
    Cancelled { stage: Stage },

    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: StageError,
    },
}

impl PipelineError {
    /// Wrap a stage error, folding stage-reported cancellation into `Cancelled`.
    pub fn at(stage: Stage, source: StageError) -> Self {
        match source {
            StageError::Cancelled => Self::Cancelled { stage },
            source => Self::StageFailed { stage, source },
        }
    }

    /// The stage the run stopped at.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Cancelled { stage } | PipelineError::StageFailed { stage, .. } => *stage,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }

    /// The underlying stage error, if this was not a cancellation.
    pub fn stage_error(&self) -> Option<&StageError> {
        match self {
            PipelineError::Cancelled { .. } => None,
            PipelineError::StageFailed { source, .. } => Some(source),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Cancelled { .. } => "cancelled",
            PipelineError::StageFailed { source, .. } => source.kind(),
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `FluxError`.
pub type Result<T> = std::result::Result<T, FluxError>;
