//! Reference stage implementations.
//!
//! Any of them can be swapped for another implementation through
//! [`PipelineBuilder`](crate::pipeline::PipelineBuilder).

pub mod evaluate;
pub mod ingestion;
pub mod model;
pub mod preprocess;
pub mod routing;

pub use evaluate::MeanEvaluator;
pub use ingestion::DefaultDataIngestion;
pub use model::SumModelExecutor;
pub use preprocess::LengthPreprocessor;
pub use routing::{ArtifactRecord, FileArtifactRouter, LogArtifactRouter};

use std::sync::Arc;

use crate::capability::ArtifactRouter;
use crate::config::{ArtifactConfig, ArtifactSink};

/// Build the artifact router selected by configuration.
pub fn artifact_router(config: &ArtifactConfig) -> Arc<dyn ArtifactRouter> {
    match config.sink {
        ArtifactSink::Log => Arc::new(LogArtifactRouter),
        ArtifactSink::File => Arc::new(FileArtifactRouter::new(&config.directory)),
    }
}
