//! `retryd run` – sweep on the configured interval until Ctrl-C.

use anyhow::Result;
use retryd_core::service::RetryService;
use std::path::Path;
use std::time::Duration;

use super::ingest::{ingest_source, open_source};

pub async fn run_scheduler(
    service: &RetryService,
    interval: Duration,
    ingest: Option<&Path>,
) -> Result<()> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("could not listen for Ctrl-C, stopping scheduler: {}", e);
        }
    };

    // Open before the scheduler starts so a bad path is reported immediately.
    let source = match ingest {
        Some(path) => Some(open_source(Some(path)).await?),
        None => None,
    };

    // Ingress runs alongside the sweeps; both go through the service's partition lock.
    let ingest_task = async {
        match source {
            Some(source) => ingest_source(service, source).await,
            None => Ok(()),
        }
    };

    println!("retryd running (interval {} ms); press Ctrl-C to stop", interval.as_millis());
    let (ingested, sweeps) = tokio::join!(ingest_task, service.run_scheduler(interval, shutdown));
    tracing::info!("scheduler stopped after {} sweep(s)", sweeps);
    println!("stopped after {sweeps} sweep(s)");
    ingested
}
