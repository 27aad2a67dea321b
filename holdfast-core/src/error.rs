//! Error taxonomy for the state layer.
//!
//! Every variant signals a programming error in the caller (registration
//! order, missing registration, use-after-dispose). None of them are retried
//! internally; they propagate to the host's error-reporting path.

use thiserror::Error;

use crate::reactive::{NotifierId, ScopeId};

pub type HoldfastResult<T> = Result<T, HoldfastError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HoldfastError {
    #[error("state key `{key}` is already registered")]
    DuplicateRegistration { key: &'static str },

    #[error("state key `{key}` is not registered")]
    NotRegistered { key: &'static str },

    #[error("notifier {id:?} has been disposed")]
    Disposed { id: NotifierId },

    #[error("state key `{key}` does not hold a notifier of type `{expected}`")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
    },

    #[error("reactive scope {id:?} has been torn down")]
    Unmounted { id: ScopeId },
}

impl HoldfastError {
    /// Whether this error reports a lifecycle-ordering bug (use after
    /// dispose or teardown) rather than a registration bug.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Disposed { .. } | Self::Unmounted { .. })
    }
}
