//! `retryd status` – list queued retries grouped by attempt.

use anyhow::Result;
use retryd_core::service::RetryService;

pub async fn run_status(service: &RetryService) -> Result<()> {
    let queued = service.queue().queued().await?;
    if queued.is_empty() {
        println!("No messages queued for retry.");
        return Ok(());
    }

    let policy = service.policy();
    println!(
        "{:<8} {:<24} {:<16} {:<16} {}",
        "ATTEMPT", "MESSAGE", "TIMESTAMP_MS", "DUE_MS", "ORIGIN"
    );
    for (id, record) in queued {
        let due = policy
            .due_at(record.attempt, record.timestamp_ms)
            .map(|due| due.to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<8} {:<24} {:<16} {:<16} {}",
            record.attempt, id, record.timestamp_ms, due, record.origin_topic
        );
    }
    Ok(())
}
