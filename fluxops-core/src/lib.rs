//! # FluxOps Core
//!
//! Core library for the FluxOps pipeline orchestrator.
//! Provides the stage capability contracts, the data model passed between
//! stages, the sequential orchestrator, configuration, reference stage
//! implementations, and the HTTP gateway.

pub mod capability;
pub mod config;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod stages;
pub mod types;

// Re-export commonly used types at the crate root.
pub use capability::{ArtifactRouter, DataIngestion, Evaluator, ModelExecutor, Preprocessor};
pub use config::{
    ArtifactConfig, ArtifactSink, FluxConfig, IngestionConfig, PipelineOptions, load_config,
};
pub use error::{ConfigError, FluxError, PipelineError, Result, Stage, StageError};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use tokio_util::sync::CancellationToken;
pub use types::{DataBatch, EvaluationResult, FeatureSet, IngestionSpec, ModelOutput, SourceType};
