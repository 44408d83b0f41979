//! HTTP gateway server built on axum.

use super::ServerConfig;
use crate::error::{PipelineError, Stage, StageError};
use crate::pipeline::Pipeline;
use crate::types::{EvaluationResult, IngestionSpec, SourceType};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Shared state for axum handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
}

/// Body of a successful `POST /pipeline/run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    pub succeeded: bool,
    pub message: Option<String>,
    pub metrics: BTreeMap<String, f64>,
}

impl From<EvaluationResult> for RunResponse {
    fn from(evaluation: EvaluationResult) -> Self {
        Self {
            succeeded: evaluation.succeeded(),
            message: evaluation.message().map(str::to_string),
            metrics: evaluation.metrics().clone(),
        }
    }
}

/// Body of a failed `POST /pipeline/run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub succeeded: bool,
    pub message: String,
    pub metrics: BTreeMap<String, f64>,
    pub stage: Stage,
    pub error: String,
}

impl From<&PipelineError> for ErrorBody {
    fn from(err: &PipelineError) -> Self {
        Self {
            succeeded: false,
            message: err.to_string(),
            metrics: BTreeMap::new(),
            stage: err.stage(),
            error: err.kind().to_string(),
        }
    }
}

/// Error body for an HTTP caller.
///
/// Read failures of server-side files are reported without the path or OS
/// error, so callers learn nothing about the host filesystem; the details are
/// logged instead.
fn public_error_body(spec: &IngestionSpec, err: &PipelineError) -> ErrorBody {
    let mut body = ErrorBody::from(err);
    let local_read_failure = spec.source_type == SourceType::LocalFile
        && matches!(
            err.stage_error(),
            Some(StageError::Ingestion { .. } | StageError::Io(_))
        );
    if local_read_failure {
        tracing::warn!(error = %err, "Local file ingestion failed");
        body.message = format!("{} stage failed: local file could not be read", err.stage());
    }
    body
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::StageFailed { source, .. } => match source {
            StageError::SpecValidation { .. } => StatusCode::BAD_REQUEST,
            StageError::Model { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

/// Build an axum Router with `/health` and `/pipeline/run` routes.
pub fn router(pipeline: Arc<Pipeline>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/pipeline/run", post(run_handler))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(pipeline))
}

/// Health check endpoint.
async fn health_handler() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
    })
}

/// Run the pipeline for the posted spec.
///
/// The run is cancelled if the request future is dropped, e.g. when the
/// client disconnects.
async fn run_handler(State(state): State<AppState>, Json(spec): Json<IngestionSpec>) -> Response {
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    match state.pipeline.run(&spec, &cancel).await {
        Ok(evaluation) => Json(RunResponse::from(evaluation)).into_response(),
        Err(err) => (status_for(&err), Json(public_error_body(&spec, &err))).into_response(),
    }
}

/// Serve the gateway until `shutdown` is cancelled.
pub async fn run(
    pipeline: Arc<Pipeline>,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> crate::error::Result<()> {
    let app = router(pipeline, config);
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!("Gateway stopped");
    Ok(())
}
