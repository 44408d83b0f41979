//! Configuration system for FluxOps.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> explicit file -> environment. Configuration is loaded
//! from `~/.config/fluxops/config.toml` and/or `.fluxops/config.toml` in the
//! workspace directory.
//!
//! [`PipelineOptions`] is resolved once and handed to the orchestrator by
//! value; nothing here is global or mutated after loading.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::gateway::ServerConfig;

/// Top-level configuration for a FluxOps process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FluxConfig {
    #[serde(default)]
    pub pipeline: PipelineOptions,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Options read by the orchestrator at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Whether the artifact router runs after evaluation.
    pub enable_artifact_routing: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            enable_artifact_routing: true,
        }
    }
}

/// Limits applied by the default ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Largest cloud object, in bytes, a run may download.
    pub max_object_bytes: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_object_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Which artifact router implementation to wire in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSink {
    /// Summarise artifacts through `tracing`.
    #[default]
    Log,
    /// Append one JSON line per run to `artifacts.jsonl` in the directory.
    File,
}

impl std::fmt::Display for ArtifactSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactSink::Log => write!(f, "log"),
            ArtifactSink::File => write!(f, "file"),
        }
    }
}

/// Artifact sink configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub sink: ArtifactSink,
    /// Output directory for the file sink.
    pub directory: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            sink: ArtifactSink::Log,
            directory: PathBuf::from("artifacts"),
        }
    }
}

impl FluxConfig {
    /// Check the configuration for problems. Returns a list of warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.server.port == 0 {
            warnings.push("server.port is 0; the OS will pick an ephemeral port".to_string());
        }
        if self.ingestion.max_object_bytes == 0 {
            warnings.push("ingestion.max_object_bytes is 0; every cloud object will be rejected".into());
        }
        if self.server.max_body_bytes == 0 {
            warnings.push("server.max_body_bytes is 0; every request body will be rejected".into());
        }
        if self.artifacts.sink == ArtifactSink::File
            && self.artifacts.directory.as_os_str().is_empty()
        {
            warnings.push("artifacts.directory must be set when artifacts.sink = \"file\"".into());
        }
        if !self.pipeline.enable_artifact_routing && self.artifacts.sink == ArtifactSink::File {
            warnings.push(
                "artifacts.sink = \"file\" has no effect while pipeline.enable_artifact_routing is false"
                    .into(),
            );
        }
        warnings
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "fluxops", "fluxops")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".fluxops").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `FLUXOPS_`, `__` between sections)
/// 2. Explicit config file (must exist when given)
/// 3. Workspace-local config (`.fluxops/config.toml`)
/// 4. User config (`~/.config/fluxops/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<FluxConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(FluxConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ConfigError::Invalid {
                message: format!("{} is not a file", path.display()),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // FLUXOPS_PIPELINE__ENABLE_ARTIFACT_ROUTING, FLUXOPS_SERVER__PORT, etc.
    figment = figment.merge(Env::prefixed("FLUXOPS_").split("__"));

    Ok(figment.extract()?)
}

/// Config files that [`load_config`] would read, in merge order.
pub fn config_sources(workspace: Option<&Path>) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            sources.push(user_config);
        }
    }
    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            sources.push(ws_config);
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FluxConfig::default();
        assert!(config.pipeline.enable_artifact_routing);
        assert_eq!(config.artifacts.sink, ArtifactSink::Log);
        assert_eq!(config.artifacts.directory, PathBuf::from("artifacts"));
        assert_eq!(config.server.port, 8080);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = FluxConfig::default();
        config.pipeline.enable_artifact_routing = false;
        config.artifacts.sink = ArtifactSink::File;
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: FluxConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: FluxConfig = toml::from_str("[pipeline]\n").unwrap();
        assert!(config.pipeline.enable_artifact_routing);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let fluxops_dir = dir.path().join(".fluxops");
        std::fs::create_dir_all(&fluxops_dir).unwrap();
        std::fs::write(
            fluxops_dir.join("config.toml"),
            r#"
[pipeline]
enable_artifact_routing = false

[artifacts]
sink = "file"
directory = "out/artifacts"

[server]
port = 9191
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert!(!config.pipeline.enable_artifact_routing);
        assert_eq!(config.artifacts.sink, ArtifactSink::File);
        assert_eq!(config.artifacts.directory, PathBuf::from("out/artifacts"));
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config_sources(Some(dir.path())).last(), Some(&fluxops_dir.join("config.toml")));
    }

    #[test]
    fn test_explicit_file_overrides_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let fluxops_dir = dir.path().join(".fluxops");
        std::fs::create_dir_all(&fluxops_dir).unwrap();
        std::fs::write(fluxops_dir.join("config.toml"), "[server]\nport = 9000\n").unwrap();
        let explicit = dir.path().join("prod.toml");
        std::fs::write(&explicit, "[server]\nport = 9500\n").unwrap();

        let config = load_config(Some(dir.path()), Some(&explicit)).unwrap();
        assert_eq!(config.server.port, 9500);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config(None, Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_directory_as_config_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(None, Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("is not a file"));
    }

    #[test]
    fn test_invalid_value_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("bad.toml");
        std::fs::write(&explicit, "[artifacts]\nsink = \"s3\"\n").unwrap();
        let err = load_config(None, Some(&explicit)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_validate_flags_ineffective_file_sink() {
        let mut config = FluxConfig::default();
        config.pipeline.enable_artifact_routing = false;
        config.artifacts.sink = ArtifactSink::File;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("no effect"));
    }

    #[test]
    fn test_ingestion_limit_from_toml() {
        let config: FluxConfig = toml::from_str("[ingestion]\nmax_object_bytes = 4096\n").unwrap();
        assert_eq!(config.ingestion.max_object_bytes, 4096);
        assert_eq!(
            FluxConfig::default().ingestion.max_object_bytes,
            64 * 1024 * 1024
        );

        let mut config = FluxConfig::default();
        config.ingestion.max_object_bytes = 0;
        assert!(config.validate().iter().any(|w| w.contains("max_object_bytes")));
    }

    #[test]
    fn test_validate_empty_directory() {
        let mut config = FluxConfig::default();
        config.artifacts.sink = ArtifactSink::File;
        config.artifacts.directory = PathBuf::new();
        assert!(config.validate().iter().any(|w| w.contains("artifacts.directory")));
    }

    #[test]
    fn test_artifact_sink_display() {
        assert_eq!(ArtifactSink::Log.to_string(), "log");
        assert_eq!(ArtifactSink::File.to_string(), "file");
    }
}
