//! # HTTP Gateway
//!
//! Thin axum adapter that exposes a [`Pipeline`](crate::pipeline::Pipeline)
//! over HTTP: a health check and a run endpoint taking a JSON ingestion spec.

mod server;

pub use server::{
    AppState, ErrorBody, HealthBody, RunResponse, router as gateway_router, run as run_gateway,
};

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
