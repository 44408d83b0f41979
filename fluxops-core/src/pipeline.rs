//! Pipeline orchestrator.
//!
//! Runs ingest -> preprocess -> execute -> evaluate strictly in sequence and
//! then, when enabled, hands every artifact to the artifact router. The
//! orchestrator holds no per-run state, so one instance can serve any number
//! of concurrent runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::capability::{ArtifactRouter, DataIngestion, Evaluator, ModelExecutor, Preprocessor};
use crate::config::{FluxConfig, PipelineOptions};
use crate::error::{PipelineError, Stage, StageError};
use crate::stages::{
    self, DefaultDataIngestion, LengthPreprocessor, LogArtifactRouter, MeanEvaluator,
    SumModelExecutor,
};
use crate::types::{EvaluationResult, IngestionSpec};

/// The end-to-end ingest/preprocess/execute/evaluate/route pipeline.
#[derive(Clone)]
pub struct Pipeline {
    ingestion: Arc<dyn DataIngestion>,
    preprocessor: Arc<dyn Preprocessor>,
    model: Arc<dyn ModelExecutor>,
    evaluator: Arc<dyn Evaluator>,
    router: Arc<dyn ArtifactRouter>,
    options: PipelineOptions,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Compose a pipeline from explicit stage implementations.
    pub fn new(
        ingestion: Arc<dyn DataIngestion>,
        preprocessor: Arc<dyn Preprocessor>,
        model: Arc<dyn ModelExecutor>,
        evaluator: Arc<dyn Evaluator>,
        router: Arc<dyn ArtifactRouter>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            ingestion,
            preprocessor,
            model,
            evaluator,
            router,
            options,
        }
    }

    /// Start from the reference stages and replace any of them.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Reference stages wired according to `config`.
    pub fn from_config(config: &FluxConfig) -> Self {
        Self::builder()
            .ingestion(Arc::new(DefaultDataIngestion::from_config(&config.ingestion)))
            .router(stages::artifact_router(&config.artifacts))
            .options(config.pipeline)
            .build()
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Execute one run for `spec`.
    ///
    /// The first failing stage aborts the run and is reported with its
    /// [`Stage`]. Cancelling `cancel` before or during ingest, preprocess,
    /// execute or evaluate stops the run with [`PipelineError::Cancelled`].
    /// Artifact routing is best-effort: a routing failure or a cancellation
    /// while routing is logged and the computed evaluation is still returned.
    pub async fn run(
        &self,
        spec: &IngestionSpec,
        cancel: &CancellationToken,
    ) -> Result<EvaluationResult, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "pipeline_run",
            %run_id,
            source_type = %spec.source_type,
        );
        let started = Instant::now();

        let result = self.run_stages(spec, cancel).instrument(span.clone()).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        span.in_scope(|| match &result {
            Ok(evaluation) => tracing::info!(
                succeeded = evaluation.succeeded(),
                elapsed_ms,
                "Pipeline run completed"
            ),
            Err(PipelineError::Cancelled { stage }) => {
                tracing::warn!(%stage, elapsed_ms, "Pipeline run cancelled")
            }
            Err(err) => tracing::warn!(
                stage = %err.stage(),
                error = %err,
                elapsed_ms,
                "Pipeline run failed"
            ),
        });
        result
    }

    async fn run_stages(
        &self,
        spec: &IngestionSpec,
        cancel: &CancellationToken,
    ) -> Result<EvaluationResult, PipelineError> {
        let batch = guarded(Stage::Ingest, cancel, self.ingestion.ingest(spec, cancel)).await?;
        let features = guarded(
            Stage::Preprocess,
            cancel,
            self.preprocessor.preprocess(&batch, cancel),
        )
        .await?;
        let output = guarded(Stage::Execute, cancel, self.model.execute(&features, cancel)).await?;
        let evaluation =
            guarded(Stage::Evaluate, cancel, self.evaluator.evaluate(&output, cancel)).await?;

        if self.options.enable_artifact_routing {
            let routed = guarded(
                Stage::Route,
                cancel,
                self.router
                    .route(&batch, &features, &output, &evaluation, cancel),
            )
            .await;
            if let Err(err) = routed {
                tracing::warn!(error = %err, "Artifact routing did not complete; returning evaluation");
            }
        } else {
            tracing::debug!("Artifact routing disabled");
        }

        Ok(evaluation)
    }
}

/// Run one stage, racing it against cancellation.
///
/// `fut` is not polled when `cancel` has already fired.
async fn guarded<T, F>(
    stage: Stage,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, StageError>>,
{
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled { stage });
    }

    let started = Instant::now();
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StageError::Cancelled),
        result = fut => result,
    };
    tracing::debug!(
        %stage,
        ok = result.is_ok(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Stage finished"
    );
    result.map_err(|source| PipelineError::at(stage, source))
}

/// Builder that defaults every unset stage to its reference implementation.
#[derive(Default)]
pub struct PipelineBuilder {
    ingestion: Option<Arc<dyn DataIngestion>>,
    preprocessor: Option<Arc<dyn Preprocessor>>,
    model: Option<Arc<dyn ModelExecutor>>,
    evaluator: Option<Arc<dyn Evaluator>>,
    router: Option<Arc<dyn ArtifactRouter>>,
    options: PipelineOptions,
}

impl PipelineBuilder {
    pub fn ingestion(mut self, ingestion: Arc<dyn DataIngestion>) -> Self {
        self.ingestion = Some(ingestion);
        self
    }

    pub fn preprocessor(mut self, preprocessor: Arc<dyn Preprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn model(mut self, model: Arc<dyn ModelExecutor>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn router(mut self, router: Arc<dyn ArtifactRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Pipeline {
        let ingestion: Arc<dyn DataIngestion> = match self.ingestion {
            Some(ingestion) => ingestion,
            None => Arc::new(DefaultDataIngestion::new()),
        };
        let preprocessor: Arc<dyn Preprocessor> = match self.preprocessor {
            Some(preprocessor) => preprocessor,
            None => Arc::new(LengthPreprocessor),
        };
        let model: Arc<dyn ModelExecutor> = match self.model {
            Some(model) => model,
            None => Arc::new(SumModelExecutor),
        };
        let evaluator: Arc<dyn Evaluator> = match self.evaluator {
            Some(evaluator) => evaluator,
            None => Arc::new(MeanEvaluator),
        };
        let router: Arc<dyn ArtifactRouter> = match self.router {
            Some(router) => router,
            None => Arc::new(LogArtifactRouter),
        };
        Pipeline::new(
            ingestion,
            preprocessor,
            model,
            evaluator,
            router,
            self.options,
        )
    }
}
