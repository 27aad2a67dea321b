//! Dependency seam between scopes and notifiers.
//!
//! A [`ReactiveScope`](super::ReactiveScope) subscribes to notifiers of many
//! different value types. It holds them through this object-safe trait so its
//! subscription table does not need to know `T`.

use std::sync::Arc;

use super::{ListenerId, NotifierId, ScopeId};

/// A change callback registered on a notifier.
pub(crate) type Listener = Arc<dyn Fn() + Send + Sync>;

/// A reactive source a scope can subscribe to.
pub(crate) trait Dependency: Send + Sync {
    /// Get the notifier ID of this source.
    fn notifier_id(&self) -> NotifierId;

    /// Link `scope` to this source: record the back-reference and register
    /// `listener` for change notifications.
    ///
    /// Returns `None` if the source has been disposed, in which case nothing
    /// was linked.
    fn attach_scope(&self, scope: ScopeId, listener: Listener) -> Option<ListenerId>;

    /// Undo [`attach_scope`](Self::attach_scope).
    ///
    /// Detaching the last scope from a scoped source disposes it.
    fn detach_scope(&self, scope: ScopeId, listener: ListenerId);

    /// Check if this source has been disposed.
    fn is_disposed(&self) -> bool;
}
