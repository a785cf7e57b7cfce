//! Classification failure kinds.

use thiserror::Error;

use crate::headers::HeaderError;

/// Why a message could not be given a disposition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// Required header missing or duplicated, or attempt count unparsable.
    #[error("malformed retry headers: {0}")]
    Malformed(#[from] HeaderError),

    /// None of the drop, retry or permanent-failure rules matched.
    #[error("could not determine if message is retriable, permanently failed or droppable (exception type {exception:?})")]
    Unclassifiable { exception: String },
}
