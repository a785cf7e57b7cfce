//! Side effects of a disposition (enqueue, forward, drop) and the scheduled
//! sweep that re-dispatches queued retries to their origin topic.

mod action;
mod scheduled;

pub use action::RetryActionDispatcher;
pub use scheduled::{ScheduledDispatcher, SweepReport};

use thiserror::Error;

use crate::headers::HeaderError;
use crate::producer::SendError;
use crate::store::StoreError;

/// Failure while carrying out a disposition.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed retry headers: {0}")]
    Malformed(#[from] HeaderError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error("retry store: {0}")]
    Store(#[from] StoreError),
}
