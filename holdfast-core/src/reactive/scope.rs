//! ReactiveScope Implementation
//!
//! A ReactiveScope is the bridge between notifiers and a render-on-demand UI
//! element owned by the host framework.
//!
//! # How Scopes Work
//!
//! 1. The host calls [`ReactiveScope::render`] whenever it builds the element.
//!    For the duration of the render callback the scope is the current scope
//!    of this thread.
//!
//! 2. Every notifier read during the pass, either explicitly through
//!    [`RenderContext::read`] or through a plain `current()` further down the
//!    call chain, subscribes the scope. Subscriptions accumulate and persist
//!    for the whole mount; a dependency that stops being read stays
//!    subscribed until teardown.
//!
//! 3. When any dependency changes, the scope asks its [`RenderHost`] for a
//!    re-render. The host decides when (and how often) to call `render` again.
//!
//! 4. On teardown the scope detaches from every dependency. Detaching the last
//!    scope from a scoped notifier disposes that notifier.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::context::ReactiveContext;
use super::dependency::{Dependency, Listener};
use super::{ListenerId, NotifierId, ScopeId, StateNotifier};
use crate::error::{HoldfastError, HoldfastResult};

/// The host side of a reactive element.
pub trait RenderHost: Send + Sync {
    /// Ask the host to render the element backing `scope` again.
    ///
    /// May be called any number of times per batch of changes; the host is
    /// free to coalesce.
    fn request_rerender(&self, scope: ScopeId);
}

impl<F> RenderHost for F
where
    F: Fn(ScopeId) + Send + Sync,
{
    fn request_rerender(&self, scope: ScopeId) {
        self(scope)
    }
}

struct Subscription {
    dependency: Arc<dyn Dependency>,
    listener: ListenerId,
}

/// State shared between a scope, the ambient context and the listeners it
/// registers on notifiers.
pub(crate) struct ScopeShared {
    id: ScopeId,
    host: Arc<dyn RenderHost>,
    mounted: AtomicBool,
    subscriptions: Mutex<IndexMap<NotifierId, Subscription>>,
}

impl ScopeShared {
    pub(crate) fn id(&self) -> ScopeId {
        self.id
    }

    /// Subscribe to `dependency` unless already subscribed.
    pub(crate) fn track(self: &Arc<Self>, dependency: Arc<dyn Dependency>) {
        let notifier = dependency.notifier_id();
        if !self.mounted.load(Ordering::SeqCst)
            || dependency.is_disposed()
            || self.subscriptions.lock().contains_key(&notifier)
        {
            return;
        }

        let weak: Weak<ScopeShared> = Arc::downgrade(self);
        let listener: Listener = Arc::new(move || {
            if let Some(scope) = weak.upgrade() {
                scope.on_notifier_changed();
            }
        });

        if let Some(listener) = dependency.attach_scope(self.id, listener) {
            self.subscriptions
                .lock()
                .insert(notifier, Subscription { dependency, listener });
        }
    }

    fn on_notifier_changed(&self) {
        if !self.mounted.load(Ordering::SeqCst) {
            return;
        }

        trace!(scope = ?self.id, "requesting re-render");
        self.host.request_rerender(self.id);
    }

    fn teardown(&self) {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return;
        }

        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        debug!(scope = ?self.id, dependencies = subscriptions.len(), "tearing down scope");

        for (_, subscription) in subscriptions {
            subscription
                .dependency
                .detach_scope(self.id, subscription.listener);
        }
    }
}

/// Handle passed to the render callback.
pub struct RenderContext<'a> {
    scope: &'a Arc<ScopeShared>,
}

impl RenderContext<'_> {
    /// Read `notifier` and subscribe this scope to it.
    pub fn read<T>(&self, notifier: &StateNotifier<T>) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        self.scope.track(notifier.as_dependency());
        notifier.current_untracked()
    }

    /// Get the ID of the scope being rendered.
    pub fn scope_id(&self) -> ScopeId {
        self.scope.id
    }

    /// Get the number of dependencies collected so far.
    pub fn dependency_count(&self) -> usize {
        self.scope.subscriptions.lock().len()
    }
}

type RenderFn<V> = Box<dyn FnMut(&RenderContext<'_>) -> V + Send>;

/// A render unit that subscribes to the notifiers it reads.
///
/// # Example
///
/// ```rust
/// use holdfast_core::{ReactiveScope, ScopeId, StateNotifier};
///
/// let count = StateNotifier::new(0);
///
/// let source = count.clone();
/// let mut scope = ReactiveScope::new(
///     |id: ScopeId| println!("re-render {id:?}"),
///     move |cx| format!("count = {}", cx.read(&source)),
/// );
///
/// assert_eq!(scope.render().unwrap(), "count = 0");
/// count.set(1).unwrap(); // prints "re-render ..."
/// scope.teardown();
/// ```
pub struct ReactiveScope<V> {
    shared: Arc<ScopeShared>,
    render: RenderFn<V>,
    render_count: usize,
}

impl<V> ReactiveScope<V> {
    /// Create a mounted scope. Nothing is rendered until [`render`](Self::render).
    pub fn new<H, F>(host: H, render: F) -> Self
    where
        H: RenderHost + 'static,
        F: FnMut(&RenderContext<'_>) -> V + Send + 'static,
    {
        Self::with_host(Arc::new(host), render)
    }

    /// Create a mounted scope sharing an existing host.
    pub fn with_host<F>(host: Arc<dyn RenderHost>, render: F) -> Self
    where
        F: FnMut(&RenderContext<'_>) -> V + Send + 'static,
    {
        let shared = Arc::new(ScopeShared {
            id: ScopeId::new(),
            host,
            mounted: AtomicBool::new(true),
            subscriptions: Mutex::new(IndexMap::new()),
        });
        debug!(scope = ?shared.id, "mounted scope");

        Self {
            shared,
            render: Box::new(render),
            render_count: 0,
        }
    }

    /// Run one render pass.
    ///
    /// This scope is the current scope until the callback returns or unwinds.
    pub fn render(&mut self) -> HoldfastResult<V> {
        if !self.is_mounted() {
            return Err(HoldfastError::Unmounted { id: self.shared.id });
        }

        let _ctx = ReactiveContext::enter(Arc::clone(&self.shared));
        let cx = RenderContext { scope: &self.shared };
        let view = (self.render)(&cx);

        self.render_count += 1;
        Ok(view)
    }

    /// Detach from every dependency. Idempotent; also runs on drop.
    pub fn teardown(&self) {
        self.shared.teardown();
    }

    pub fn id(&self) -> ScopeId {
        self.shared.id
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.mounted.load(Ordering::SeqCst)
    }

    /// Get the number of notifiers this scope is subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.shared.subscriptions.lock().len()
    }

    /// Get the number of completed render passes.
    pub fn render_count(&self) -> usize {
        self.render_count
    }
}

impl<V> Drop for ReactiveScope<V> {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl<V> Debug for ReactiveScope<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveScope")
            .field("id", &self.shared.id)
            .field("mounted", &self.is_mounted())
            .field("dependency_count", &self.dependency_count())
            .field("render_count", &self.render_count)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
