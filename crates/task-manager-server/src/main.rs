//! Task manager API server.
//!
//! Accepts long-running tasks over HTTP, runs them on a bounded worker pool
//! and lets clients poll their status or cancel them.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use task_manager_server::{App, ServerConfig, init_tracing, signal};
use task_manager_worker::CancellationHandle;

#[derive(Parser, Debug, Clone)]
#[command(name = "task-manager", author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of worker loops (overrides config and WORKERS)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Simulated I/O duration per task in milliseconds
    #[arg(long)]
    task_duration_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(port) = cli.port {
        config.http.port = port;
    }
    if let Some(workers) = cli.workers {
        config.app.workers = workers;
    }
    if let Some(duration) = cli.task_duration_ms {
        config.executor.io_duration_ms = duration;
    }
    config.validate()?;

    init_tracing(config.app.env)?;
    info!(
        config_path = ?cli.config,
        env = %config.app.env,
        port = config.http.port,
        "Starting task manager"
    );

    let app = App::new(config)?;

    let shutdown = CancellationHandle::new();
    signal::setup_signal_handlers(shutdown.clone());

    app.run_until(async move { shutdown.cancelled().await }).await?;
    Ok(())
}
