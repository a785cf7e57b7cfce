//! CLI command handlers. Each command is in its own file.

mod ingest;
mod process;
mod run;
mod status;
mod sweep;

pub use ingest::run_ingest;
pub use process::run_process;
pub use run::run_scheduler;
pub use status::run_status;
pub use sweep::run_sweep;

use retryd_core::processor::ProcessOutcome;

/// One-line summary of what happened to a message.
fn describe(outcome: &ProcessOutcome) -> String {
    match outcome {
        ProcessOutcome::Queued { attempt } => format!("queued for retry attempt {attempt}"),
        ProcessOutcome::PermanentlyFailed => "sent to permanent failure topic".to_string(),
        ProcessOutcome::Dropped => "dropped".to_string(),
        ProcessOutcome::Rejected(reason) => format!("rejected: {reason}"),
        ProcessOutcome::Unclassified => "unclassifiable, discarded".to_string(),
    }
}
