//! Integration tests for the gateway REST API endpoints.

use async_trait::async_trait;
use axum::body::Body;
use fluxops_core::gateway::{
    ErrorBody, HealthBody, RunResponse, ServerConfig, gateway_router, run_gateway,
};
use fluxops_core::stages::DefaultDataIngestion;
use fluxops_core::{
    CancellationToken, FeatureSet, ModelExecutor, ModelOutput, Pipeline, Stage, StageError,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct OfflineModel;

#[async_trait]
impl ModelExecutor for OfflineModel {
    async fn execute(
        &self,
        _features: &FeatureSet,
        _cancel: &CancellationToken,
    ) -> Result<ModelOutput, StageError> {
        Err(StageError::model("model endpoint unreachable"))
    }
}

fn make_app(pipeline: Pipeline) -> axum::Router {
    gateway_router(Arc::new(pipeline), &ServerConfig::default())
}

fn make_post_request(uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn send(
    app: axum::Router,
    req: axum::http::Request<Body>,
) -> (axum::http::StatusCode, axum::body::Bytes) {
    let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 100_000)
        .await
        .unwrap();
    (status, body)
}

/// Serve `content` at `/data.txt` on an ephemeral local port.
async fn serve_object(content: &'static str) -> (String, CancellationToken) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let app = axum::Router::new().route(
        "/data.txt",
        axum::routing::get(move || async move { content }),
    );
    let stop = shutdown.clone();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
            .unwrap();
    });
    (format!("http://{}/data.txt", addr), shutdown)
}

// --- /health ---

#[tokio::test]
async fn test_health_returns_ok() {
    let req = axum::http::Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(make_app(Pipeline::builder().build()), req).await;
    assert_eq!(status, 200);
    let health: HealthBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "ok");
}

// --- /pipeline/run ---

#[tokio::test]
async fn test_pipeline_run_inline_works() {
    let req = make_post_request(
        "/pipeline/run",
        serde_json::json!({"sourceType": "Inline", "payload": ["abc", "defgh"]}),
    );
    let (status, body) = send(make_app(Pipeline::builder().build()), req).await;
    assert_eq!(status, 200);

    let run: RunResponse = serde_json::from_slice(&body).unwrap();
    assert!(run.succeeded);
    assert_eq!(run.metrics.get("mean"), Some(&8.0));
}

#[tokio::test]
async fn test_pipeline_run_accepts_numeric_source_type() {
    let req = make_post_request(
        "/pipeline/run",
        serde_json::json!({"sourceType": 0, "payload": ["abc", "defgh"]}),
    );
    let (status, body) = send(make_app(Pipeline::builder().build()), req).await;
    assert_eq!(status, 200);

    let run: RunResponse = serde_json::from_slice(&body).unwrap();
    assert!(run.succeeded);
    assert_eq!(run.metrics.get("mean"), Some(&8.0));
}

#[tokio::test]
async fn test_pipeline_run_rejects_unknown_numeric_source_type() {
    let req = make_post_request(
        "/pipeline/run",
        serde_json::json!({"sourceType": 7, "payload": ["abc"]}),
    );
    let (status, _) = send(make_app(Pipeline::builder().build()), req).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_pipeline_run_response_keys() {
    let req = make_post_request(
        "/pipeline/run",
        serde_json::json!({"source_type": "inline", "payload": []}),
    );
    let (status, body) = send(make_app(Pipeline::builder().build()), req).await;
    assert_eq!(status, 200);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["succeeded"], true);
    assert!(json.get("message").is_some());
    assert_eq!(json["metrics"]["mean"], 0.0);
}

#[tokio::test]
async fn test_pipeline_run_model_failure_is_bad_gateway() {
    let pipeline = Pipeline::builder().model(Arc::new(OfflineModel)).build();
    let req = make_post_request(
        "/pipeline/run",
        serde_json::json!({"sourceType": "Inline", "payload": ["abc"]}),
    );
    let (status, body) = send(make_app(pipeline), req).await;
    assert_eq!(status, 502);

    let error: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert!(!error.succeeded);
    assert_eq!(error.stage, Stage::Execute);
    assert_eq!(error.error, "model");
    assert!(error.message.contains("model endpoint unreachable"));
}

#[tokio::test]
async fn test_pipeline_run_missing_file_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.txt");
    let req = make_post_request(
        "/pipeline/run",
        serde_json::json!({"sourceType": "LocalFile", "pathOrUri": missing}),
    );
    let (status, body) = send(make_app(Pipeline::builder().build()), req).await;
    assert_eq!(status, 500);
    let error: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, "ingestion");
    assert!(!error.message.contains("missing.txt"));
    assert!(!error.message.contains(&dir.path().to_string_lossy().to_string()));
}

#[tokio::test]
async fn test_pipeline_run_cloud_object_over_http() {
    let (uri, shutdown) = serve_object("abc\ndefgh\n").await;
    let req = make_post_request(
        "/pipeline/run",
        serde_json::json!({"sourceType": "CloudObject", "pathOrUri": uri}),
    );
    let (status, body) = send(make_app(Pipeline::builder().build()), req).await;
    shutdown.cancel();

    assert_eq!(status, 200);
    let run: RunResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(run.metrics.get("mean"), Some(&8.0));
}

#[tokio::test]
async fn test_pipeline_run_cloud_object_over_limit() {
    let (uri, shutdown) = serve_object("abc\ndefgh\n").await;
    let pipeline = Pipeline::builder()
        .ingestion(Arc::new(DefaultDataIngestion::new().with_max_object_bytes(4)))
        .build();
    let req = make_post_request(
        "/pipeline/run",
        serde_json::json!({"sourceType": "CloudObject", "pathOrUri": uri}),
    );
    let (status, body) = send(make_app(pipeline), req).await;
    shutdown.cancel();

    assert_eq!(status, 500);
    let error: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.stage, Stage::Ingest);
    assert_eq!(error.error, "ingestion");
    assert!(error.message.contains("4 byte limit"));
}

// --- server lifecycle ---

#[tokio::test]
async fn test_run_gateway_stops_on_shutdown() {
    let config = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };
    let shutdown = CancellationToken::new();
    let server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { run_gateway(Arc::new(Pipeline::builder().build()), &config, shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("gateway should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}
