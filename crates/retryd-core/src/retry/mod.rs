//! Retry policy and header classification.
//!
//! The policy holds the exception taxonomy and the attempt -> delay table;
//! the classifier maps a message's retry headers onto a [`Disposition`] with
//! strict Drop > Retry > PermanentFailure priority.

mod classify;
mod error;
mod policy;

pub use classify::{Disposition, HeaderClassifier};
pub use error::ClassifyError;
pub use policy::RetryPolicy;
