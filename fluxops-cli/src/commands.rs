//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::RunSource;
use fluxops_core::gateway::{ErrorBody, RunResponse, run_gateway};
use fluxops_core::{CancellationToken, FluxConfig, FluxError, IngestionSpec, Pipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Serve { host, port } => {
            let mut config = load(workspace, config_file)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            handle_serve(config).await
        }
        Commands::Run {
            source,
            topic,
            no_routing,
        } => {
            let mut config = load(workspace, config_file)?;
            if no_routing {
                config.pipeline.enable_artifact_routing = false;
            }
            handle_run(config, ingestion_spec(source, topic)).await
        }
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

/// Load configuration and anchor a relative artifact directory at the workspace.
fn load(workspace: &Path, config_file: Option<&Path>) -> fluxops_core::Result<FluxConfig> {
    let mut config = fluxops_core::load_config(Some(workspace), config_file)?;
    if config.artifacts.directory.is_relative() && !config.artifacts.directory.as_os_str().is_empty()
    {
        config.artifacts.directory = workspace.join(&config.artifacts.directory);
    }
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }
    Ok(config)
}

/// Build the ingestion spec for a single `run` invocation.
fn ingestion_spec(source: RunSource, topic: Option<String>) -> IngestionSpec {
    let RunSource {
        inline,
        file,
        uri,
        event,
    } = source;

    if let Some(path) = file {
        IngestionSpec::local_file(path_string(path))
    } else if let Some(uri) = uri {
        IngestionSpec::cloud_object(uri)
    } else if let Some(events) = event {
        let spec = IngestionSpec::event(events);
        match topic {
            Some(topic) => spec.with_path_or_uri(topic),
            None => spec,
        }
    } else {
        IngestionSpec::inline(inline.unwrap_or_default())
    }
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

/// Cancel `token` when the process receives Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling");
            token.cancel();
        }
    });
}

async fn handle_serve(config: FluxConfig) -> anyhow::Result<()> {
    let pipeline = Arc::new(Pipeline::from_config(&config));
    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    run_gateway(pipeline, &config.server, shutdown).await?;
    Ok(())
}

async fn handle_run(config: FluxConfig, spec: IngestionSpec) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(&config);
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match pipeline.run(&spec, &cancel).await {
        Ok(evaluation) => {
            let body = RunResponse::from(evaluation);
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Err(err) => {
            let body = ErrorBody::from(&err);
            println!("{}", serde_json::to_string_pretty(&body)?);
            Err(FluxError::from(err).into())
        }
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = fluxops_core::load_config(Some(workspace), config_file).map_err(FluxError::from)?;
    match action {
        ConfigAction::Show => {
            for source in fluxops_core::config::config_sources(Some(workspace)) {
                println!("# source: {}", source.display());
            }
            if let Some(path) = config_file {
                println!("# source: {}", path.display());
            }
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
        ConfigAction::Validate => {
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                for warning in &warnings {
                    println!("warning: {}", warning);
                }
            }
            Ok(())
        }
    }
}
