//! Identifier types for the reactive system.
//!
//! Notifiers, scopes and listener registrations each get a unique ID when
//! created. IDs are how the two sides of a subscription refer to each other
//! without holding strong references in both directions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! unique_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Generate a new unique ID.
            ///
            /// Uses an atomic counter to ensure uniqueness across threads.
            pub fn new() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(0);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            /// Get the raw ID value.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

unique_id! {
    /// Unique identifier for a [`StateNotifier`](super::StateNotifier).
    ///
    /// Clones of a notifier handle share the same ID.
    NotifierId
}

unique_id! {
    /// Unique identifier for a [`ReactiveScope`](super::ReactiveScope).
    ScopeId
}

unique_id! {
    /// Handle returned by `add_listener`, used to remove the listener again.
    ListenerId
}
