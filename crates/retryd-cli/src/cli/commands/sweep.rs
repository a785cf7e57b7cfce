//! `retryd sweep [--now <ms>]` – run one sweep of the retry queue.

use retryd_core::service::RetryService;

pub async fn run_sweep(service: &RetryService, now_ms: Option<i64>) {
    let report = match now_ms {
        Some(now_ms) => service.sweep(now_ms).await,
        None => service.sweep_now().await,
    };
    println!(
        "sweep: {} dispatched, {} failed, {} pending",
        report.dispatched, report.failed, report.pending
    );
}
