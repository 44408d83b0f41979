//! FluxOps CLI: run the pipeline once or serve it over HTTP.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// FluxOps: a minimal MLOps pipeline orchestrator
#[derive(Parser, Debug)]
#[command(name = "fluxops", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Bind host (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run the pipeline once and print the evaluation as JSON
    Run {
        #[command(flatten)]
        source: RunSource,
        /// Event topic, used as the batch source for --event
        #[arg(long, requires = "event", conflicts_with_all = ["inline", "file", "uri"])]
        topic: Option<String>,
        /// Skip artifact routing for this run
        #[arg(long)]
        no_routing: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Where the records for a single run come from.
#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct RunSource {
    /// Records passed directly on the command line
    #[arg(long, num_args = 0..)]
    inline: Option<Vec<String>>,
    /// Local text file, one record per line
    #[arg(long)]
    file: Option<PathBuf>,
    /// HTTP(S) object URI, one record per line
    #[arg(long)]
    uri: Option<String>,
    /// Event bodies
    #[arg(long, num_args = 0..)]
    event: Option<Vec<String>>,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Show the resolved configuration
    Show,
    /// Check the resolved configuration for problems
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer on stderr; stdout carries command output
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "fluxops", "fluxops")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "fluxops.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref()).await
}
