//! Agora daemon: entry point for running a governance node.

use std::path::PathBuf;

use agora_node::{init_logging, AgoraNode, LogFormat, NodeConfig, StorageBackend};
use agora_utils::{format_duration, parse_duration};
use anyhow::Context;
use clap::Parser;

#[derive(Parser)]
#[command(name = "agora-daemon", about = "Agora DAO governance node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for LMDB storage.
    #[arg(long, env = "AGORA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Storage backend: "lmdb" or "memory".
    #[arg(long, env = "AGORA_STORAGE", value_parser = parse_storage)]
    storage: Option<StorageBackend>,

    /// Interval between governance ticks, e.g. "10s" or "1m".
    #[arg(long, env = "AGORA_TICK_INTERVAL", value_parser = parse_duration)]
    tick_interval: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "AGORA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "AGORA_LOG_FORMAT")]
    log_format: Option<String>,

    /// Collect Prometheus metrics and export them to `<data-dir>/metrics.prom`.
    #[arg(long, env = "AGORA_ENABLE_METRICS")]
    metrics: bool,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Operate the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Print the effective configuration as TOML.
    #[command(name = "config")]
    Config,
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT/SIGTERM.
    Run,
    /// Open storage, print governance statistics as JSON and exit.
    Stats,
    /// Print the metrics last exported by a node using this data directory.
    Metrics,
}

fn parse_storage(s: &str) -> Result<StorageBackend, String> {
    match s.to_lowercase().as_str() {
        "lmdb" => Ok(StorageBackend::Lmdb),
        "memory" => Ok(StorageBackend::Memory),
        other => Err(format!("unknown storage backend {other:?}, expected lmdb or memory")),
    }
}

/// File settings first, then CLI flags and env vars on top.
fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match cli.config {
        Some(ref path) => NodeConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("loading config file {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(ref dir) = cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(storage) = cli.storage {
        config.storage = storage;
    }
    if let Some(secs) = cli.tick_interval {
        config.tick_interval_secs = secs;
    }
    if let Some(ref level) = cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.log_format = format.clone();
    }
    config.enable_metrics |= cli.metrics;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level).context("initialising logging")?;
    if let Some(ref path) = cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Config => {
            println!("{}", config.to_toml_string()?);
        }
        Command::Node { action } => match action {
            NodeAction::Run => {
                tracing::info!(
                    "Starting Agora node (storage: {:?}, data dir: {}, tick every {})",
                    config.storage,
                    config.data_dir.display(),
                    format_duration(config.tick_interval_secs),
                );

                let mut node = AgoraNode::new(config).context("starting node")?;
                let reason = node.run().await;
                tracing::info!(%reason, "stop requested");
                node.stop().await.context("stopping node")?;
            }
            NodeAction::Stats => {
                let node = AgoraNode::new(config).context("opening node")?;
                println!("{}", node.stats_json()?);
            }
            NodeAction::Metrics => {
                let path = config.metrics_path();
                let text = std::fs::read_to_string(&path).with_context(|| {
                    format!(
                        "reading {} (is a node running with --metrics?)",
                        path.display()
                    )
                })?;
                print!("{text}");
            }
        },
    }

    Ok(())
}
