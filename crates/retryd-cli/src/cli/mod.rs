//! CLI for the retryd retry-routing service.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use retryd_core::clock::SystemClock;
use retryd_core::config::{self, RetrydConfig};
use retryd_core::producer::FileOutbox;
use retryd_core::retry::RetryPolicy;
use retryd_core::service::RetryService;
use retryd_core::store::{KeyValueStore, MemoryStore, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;

use commands::{run_ingest, run_process, run_scheduler, run_status, run_sweep};

/// Top-level CLI for retryd.
#[derive(Debug, Parser)]
#[command(name = "retryd")]
#[command(about = "retryd: delayed retry routing for failed messages", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/retryd/config.toml, created on first run).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Retry queue database (default: ~/.local/state/retryd/retry.db).
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "memory")]
    pub db: Option<PathBuf>,

    /// Directory receiving outbound messages, one `<topic>.jsonl` per topic.
    #[arg(long, global = true, value_name = "DIR")]
    pub outbox: Option<PathBuf>,

    /// Keep the retry queue in memory; nothing survives the process.
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Classify and route one message from the retry channel.
    Process {
        /// Message identifier.
        #[arg(long)]
        id: String,

        /// Header as key=value. Repeat for more headers; order is kept.
        #[arg(long = "header", value_name = "KEY=VALUE")]
        headers: Vec<String>,

        /// JSON payload (default: null).
        #[arg(long)]
        payload: Option<String>,
    },

    /// Process a JSON-lines file of messages (stdin when no path is given).
    Ingest {
        /// Path to the JSON-lines file.
        path: Option<PathBuf>,
    },

    /// Run one sweep of the retry queue.
    Sweep {
        /// Sweep as if the time were this many milliseconds since the epoch.
        #[arg(long, value_name = "MS", allow_negative_numbers = true)]
        now: Option<i64>,
    },

    /// Sweep on the configured interval until Ctrl-C.
    Run {
        /// Also ingest this JSON-lines file while sweeping.
        #[arg(long, value_name = "PATH")]
        ingest: Option<PathBuf>,
    },

    /// Show queued retries grouped by attempt.
    Status,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);
        let service = build_service(&cli, &cfg).await?;

        match cli.command {
            CliCommand::Process {
                id,
                headers,
                payload,
            } => run_process(&service, &id, &headers, payload.as_deref()).await?,
            CliCommand::Ingest { path } => {
                run_ingest(&service, path.as_deref()).await?;
            }
            CliCommand::Sweep { now } => run_sweep(&service, now).await,
            CliCommand::Run { ingest } => {
                let interval = cfg.scheduler_interval()?;
                run_scheduler(&service, interval, ingest.as_deref()).await?;
            }
            CliCommand::Status => run_status(&service).await?,
        }

        Ok(())
    }
}

/// Wire the service: policy from config, queue store, file outbox, wall clock.
async fn build_service(cli: &Cli, cfg: &RetrydConfig) -> Result<RetryService> {
    let policy = RetryPolicy::from_config(cfg).context("invalid retry configuration")?;

    let store: Arc<dyn KeyValueStore> = if cli.memory {
        tracing::info!("using in-memory retry queue");
        Arc::new(MemoryStore::new())
    } else {
        let store = match &cli.db {
            Some(path) => SqliteStore::open_at(path, &cfg.retry_info_store_name).await?,
            None => SqliteStore::open_default(&cfg.retry_info_store_name).await?,
        };
        Arc::new(store)
    };

    let outbox_dir = match &cli.outbox {
        Some(dir) => dir.clone(),
        None => FileOutbox::default_dir()?,
    };
    tracing::debug!(outbox = %outbox_dir.display(), "outbound messages go to file outbox");

    let service = RetryService::new(
        policy,
        Arc::new(FileOutbox::new(outbox_dir)),
        Arc::new(SystemClock),
    );
    service.attach_store(store);
    Ok(service)
}

#[cfg(test)]
mod tests;
