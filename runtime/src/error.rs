//! Error type returned by every [`crate::EventDesk`] operation.

use eventgate_core::error::{Rejection, StoreError};
use thiserror::Error;

/// Outcome of a failed desk operation.
///
/// `Rejected` values are expected results the caller should present to the
/// user. `Storage` is the fatal class: the backend could not complete the
/// request and nothing was committed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeskError {
    /// Expected, recoverable-by-caller outcome.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// Storage failed.
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl DeskError {
    /// The rejection, if this is one.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            Self::Storage(_) => None,
        }
    }

    /// Label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Rejected(r) => r.kind(),
            Self::Storage(_) => "storage_error",
        }
    }
}

impl From<StoreError> for DeskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(rejection) => Self::Rejected(rejection),
            other => Self::Storage(other),
        }
    }
}
