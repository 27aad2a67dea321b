//! StateNotifier Implementation
//!
//! A StateNotifier holds one immutable value and tells its listeners whenever
//! the value is replaced.
//!
//! # How Notifiers Work
//!
//! 1. When `current()` is called while a [`ReactiveScope`](super::ReactiveScope)
//!    is rendering, the notifier and the scope are linked in both directions:
//!    the scope records the notifier as a dependency, and the notifier records
//!    the scope as a subscriber and registers its change listener.
//!
//! 2. When `set()` replaces the value, every listener runs synchronously
//!    before `set()` returns.
//!
//! 3. A notifier realized from a scoped registration disposes itself when its
//!    last subscribing scope detaches, and the [`Locator`](crate::Locator)
//!    forgets it so the next lookup builds a fresh one. Global notifiers live
//!    until disposed explicitly.
//!
//! # Thread Safety
//!
//! The value, the listener map and the subscriber set each sit behind a
//! `parking_lot` lock. No lock is held while listeners run, so a listener may
//! read or replace the value of the notifier that called it.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::context::{ComputeContext, ReactiveContext};
use super::dependency::{Dependency, Listener};
use super::{ListenerId, NotifierId, ScopeId};
use crate::error::{HoldfastError, HoldfastResult};
use crate::locator::LocatorShared;

/// How long a notifier lives.
#[derive(Clone)]
pub(crate) enum Lifecycle {
    /// App lifetime. Never disposed automatically.
    Global,

    /// Lives while at least one scope subscribes. The reference count is the
    /// size of the notifier's subscriber set.
    Scoped {
        key: &'static str,
        locator: Weak<LocatorShared>,
    },
}

struct NotifierInner<T> {
    id: NotifierId,

    /// The current value. Replaced wholesale by `set`, never mutated in place.
    value: RwLock<T>,

    /// Change callbacks, in registration order.
    listeners: RwLock<IndexMap<ListenerId, Listener>>,

    /// Scopes subscribed through a render pass. Back-references only; they
    /// never keep a scope alive.
    scopes: Mutex<IndexSet<ScopeId>>,

    lifecycle: RwLock<Lifecycle>,

    disposed: AtomicBool,
}

impl<T> NotifierInner<T> {
    fn ensure_live(&self) -> HoldfastResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(HoldfastError::Disposed { id: self.id })
        } else {
            Ok(())
        }
    }

    fn insert_listener(&self, listener: Listener) -> HoldfastResult<ListenerId> {
        self.ensure_live()?;
        let id = ListenerId::new();
        self.listeners.write().insert(id, listener);
        Ok(id)
    }

    /// Run every listener. The map is snapshotted first so listeners may add
    /// or remove listeners while being notified. A listener that disposes
    /// this notifier stops the fan-out.
    fn notify(&self) {
        let snapshot: SmallVec<[Listener; 8]> =
            self.listeners.read().values().cloned().collect();

        trace!(notifier = ?self.id, listeners = snapshot.len(), "notifying listeners");

        for listener in snapshot {
            if self.disposed.load(Ordering::SeqCst) {
                trace!(notifier = ?self.id, "disposed mid-notification");
                break;
            }
            listener();
        }
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.listeners.write().clear();
        self.scopes.lock().clear();

        let lifecycle = self.lifecycle.read().clone();
        match lifecycle {
            Lifecycle::Global => {
                debug!(notifier = ?self.id, "disposed notifier");
            }
            Lifecycle::Scoped { key, locator } => match locator.upgrade() {
                Some(locator) => {
                    locator.forget(key, self.id);
                    debug!(notifier = ?self.id, key, "disposed scoped notifier");
                }
                None => {
                    warn!(notifier = ?self.id, key, "scoped notifier outlived its locator");
                }
            },
        }
    }
}

impl<T> Dependency for NotifierInner<T>
where
    T: Send + Sync + 'static,
{
    fn notifier_id(&self) -> NotifierId {
        self.id
    }

    fn attach_scope(&self, scope: ScopeId, listener: Listener) -> Option<ListenerId> {
        let listener_id = self.insert_listener(listener).ok()?;
        self.scopes.lock().insert(scope);

        trace!(notifier = ?self.id, scope = ?scope, "scope subscribed");
        Some(listener_id)
    }

    fn detach_scope(&self, scope: ScopeId, listener: ListenerId) {
        self.listeners.write().shift_remove(&listener);

        let last_detached = {
            let mut scopes = self.scopes.lock();
            scopes.shift_remove(&scope) && scopes.is_empty()
        };

        trace!(notifier = ?self.id, scope = ?scope, "scope unsubscribed");

        if last_detached && matches!(*self.lifecycle.read(), Lifecycle::Scoped { .. }) {
            debug!(notifier = ?self.id, "last subscriber left, disposing scoped notifier");
            self.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// A holder of one immutable value of type `T` plus its change listeners.
///
/// Cloning a `StateNotifier` creates a new handle to the **same** state.
///
/// # Example
///
/// ```rust
/// use holdfast_core::StateNotifier;
///
/// let count = StateNotifier::new(0);
/// count.add_listener(|| println!("changed")).unwrap();
///
/// count.set(5).unwrap(); // prints "changed"
/// assert_eq!(count.current(), 5);
/// ```
pub struct StateNotifier<T> {
    inner: Arc<NotifierInner<T>>,
}

impl<T> StateNotifier<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new notifier holding `initial`.
    ///
    /// Construction fires one notification. No listener can be registered yet,
    /// so it reaches nobody, but every listener added later may rely on the
    /// value having been published at least once.
    pub fn new(initial: T) -> Self {
        let notifier = Self {
            inner: Arc::new(NotifierInner {
                id: NotifierId::new(),
                value: RwLock::new(initial),
                listeners: RwLock::new(IndexMap::new()),
                scopes: Mutex::new(IndexSet::new()),
                lifecycle: RwLock::new(Lifecycle::Global),
                disposed: AtomicBool::new(false),
            }),
        };
        notifier.inner.notify();
        notifier
    }

    /// Get the notifier's unique ID.
    pub fn id(&self) -> NotifierId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If a reactive scope is rendering on this thread, the scope subscribes
    /// to this notifier (once per mount, however many times it reads). If a
    /// `compute_with_tracking` frame is active, the read is recorded there.
    pub fn current(&self) -> T {
        self.track_read();
        self.current_untracked()
    }

    /// Get the current value without subscribing anyone.
    pub fn current_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value, tracking the read like [`current`](Self::current).
    ///
    /// The value stays read-locked while `f` runs, so `f` must not replace the
    /// value of this notifier.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track_read();
        let guard = self.inner.value.read();
        f(&*guard)
    }

    /// Replace the value and notify every listener before returning.
    ///
    /// Listener order is unspecified.
    pub fn set(&self, value: T) -> HoldfastResult<()> {
        self.inner.ensure_live()?;

        *self.inner.value.write() = value;
        self.inner.notify();
        Ok(())
    }

    /// Replace the value with one computed from the current value.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> HoldfastResult<()> {
        self.inner.ensure_live()?;

        let next = {
            let guard = self.inner.value.read();
            f(&*guard)
        };
        self.set(next)
    }

    /// Register a change callback.
    pub fn add_listener<F>(&self, listener: F) -> HoldfastResult<ListenerId>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.insert_listener(Arc::new(listener))
    }

    /// Remove a change callback. Returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.write().shift_remove(&id).is_some()
    }

    /// Run `f` with this notifier as the "currently computing" notifier.
    ///
    /// Calls nest: the previous computing notifier is restored when `f`
    /// returns or unwinds. Reads of other notifiers inside `f` are listed by
    /// [`ComputeContext::dependencies`](super::ComputeContext::dependencies).
    pub fn compute_with_tracking<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ComputeContext::enter(self.inner.id);
        f()
    }

    /// The notifier whose `compute_with_tracking` call is innermost on this
    /// thread, if any.
    pub fn currently_computing() -> Option<NotifierId> {
        ComputeContext::current()
    }

    /// Dispose of the notifier.
    ///
    /// Listeners and subscriber back-references are released, and later
    /// `set`/`add_listener` calls fail. A scoped notifier is also removed from
    /// its locator so the next lookup realizes a new one. Disposing twice is a
    /// no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of registered listeners, including scope listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Get the number of scopes subscribed to this notifier.
    pub fn subscriber_count(&self) -> usize {
        self.inner.scopes.lock().len()
    }

    /// Whether this notifier came from a scoped registration.
    pub fn is_scoped(&self) -> bool {
        matches!(*self.inner.lifecycle.read(), Lifecycle::Scoped { .. })
    }

    /// The locator key this notifier was realized under, for scoped notifiers.
    pub fn registry_key(&self) -> Option<&'static str> {
        match *self.inner.lifecycle.read() {
            Lifecycle::Global => None,
            Lifecycle::Scoped { key, .. } => Some(key),
        }
    }

    /// Whether two handles refer to the same notifier.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// This notifier as a type-erased dependency.
    pub(crate) fn as_dependency(&self) -> Arc<dyn Dependency> {
        self.inner.clone()
    }

    pub(crate) fn bind_scoped(&self, key: &'static str, locator: Weak<LocatorShared>) {
        *self.inner.lifecycle.write() = Lifecycle::Scoped { key, locator };
    }

    fn track_read(&self) {
        if ComputeContext::is_active() {
            ComputeContext::track_dependency(self.inner.id);
        }

        if let Some(scope) = ReactiveContext::current() {
            scope.track(self.as_dependency());
        }
    }
}

impl<T> Clone for StateNotifier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for StateNotifier<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateNotifier")
            .field("id", &self.inner.id)
            .field("value", &self.current_untracked())
            .field("listener_count", &self.listener_count())
            .field("subscriber_count", &self.subscriber_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
