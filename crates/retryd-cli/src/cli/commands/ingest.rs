//! `retryd ingest [path]` – process a JSON-lines file (or stdin) of messages.

use anyhow::{bail, Context, Result};
use retryd_core::inbound::InboundMessage;
use retryd_core::processor::ProcessOutcome;
use retryd_core::service::RetryService;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::describe;

/// Per-outcome counts for one ingest run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub queued: usize,
    pub permanently_failed: usize,
    pub dropped: usize,
    pub rejected: usize,
    pub unclassified: usize,
    /// Lines that were not valid message JSON, or whose send/store failed.
    pub errors: usize,
}

impl IngestSummary {
    fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Queued { .. } => self.queued += 1,
            ProcessOutcome::PermanentlyFailed => self.permanently_failed += 1,
            ProcessOutcome::Dropped => self.dropped += 1,
            ProcessOutcome::Rejected(_) => self.rejected += 1,
            ProcessOutcome::Unclassified => self.unclassified += 1,
        }
    }
}

/// Ingest input: a buffered file or stdin.
pub type IngestSource = Box<dyn AsyncBufRead + Unpin + Send>;

/// Open the ingest input up front so a bad path fails before any work starts.
pub async fn open_source(path: Option<&Path>) -> Result<IngestSource> {
    match path {
        Some(p) => {
            let file = tokio::fs::File::open(p)
                .await
                .with_context(|| format!("open ingest file: {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

pub async fn run_ingest(service: &RetryService, path: Option<&Path>) -> Result<()> {
    let source = open_source(path).await?;
    ingest_source(service, source).await
}

/// Process `source` to the end and print the summary. Fails if any line
/// could not be processed, after the rest of the input has been handled.
pub async fn ingest_source(service: &RetryService, source: IngestSource) -> Result<()> {
    let summary = ingest_lines(service, source).await?;
    println!(
        "ingested: {} queued, {} permanently failed, {} dropped, {} rejected, {} unclassified, {} errors",
        summary.queued,
        summary.permanently_failed,
        summary.dropped,
        summary.rejected,
        summary.unclassified,
        summary.errors
    );
    if summary.errors > 0 {
        bail!("{} ingest line(s) could not be processed", summary.errors);
    }
    Ok(())
}

/// Process every line in order. A bad line or a failed send is logged and
/// counted; it does not stop the rest of the input.
async fn ingest_lines<R>(service: &RetryService, reader: R) -> Result<IngestSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = IngestSummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await.context("read ingest input")? {
        line_no += 1;
        let message = match InboundMessage::parse_line(&line) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(line = line_no, "skipping unparsable ingest line: {}", e);
                summary.errors += 1;
                continue;
            }
        };

        let headers = message.headers();
        match service.process(&message.id, &headers, message.payload).await {
            Ok(outcome) => {
                tracing::debug!(line = line_no, message_id = %message.id, "{}", describe(&outcome));
                summary.record(&outcome);
            }
            Err(e) => {
                tracing::error!(line = line_no, message_id = %message.id, "failed to process message: {}", e);
                eprintln!("{}: {}", message.id, e);
                summary.errors += 1;
            }
        }
    }
    Ok(summary)
}
