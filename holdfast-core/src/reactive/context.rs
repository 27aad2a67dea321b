//! Reactive Context
//!
//! The reactive context tracks which scope is currently rendering and which
//! notifier is currently computing. This enables automatic dependency
//! tracking: when a notifier is read, it can subscribe the rendering scope
//! without the caller threading the scope through every function.
//!
//! # Implementation
//!
//! Two independent thread-local stacks back the two contexts. Entering a
//! context pushes a frame and returns a guard; dropping the guard pops it.
//! Because the pop happens in `Drop`, the previous frame is restored on every
//! exit path, including a panic unwinding through the render or compute
//! closure.
//!
//! Both stacks support nesting (a scope rendered from inside another scope's
//! render pass, or `compute_with_tracking` called inside another one).

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use super::scope::ScopeShared;
use super::{NotifierId, ScopeId};

thread_local! {
    static SCOPE_STACK: RefCell<Vec<Arc<ScopeShared>>> = const { RefCell::new(Vec::new()) };
    static COMPUTE_STACK: RefCell<Vec<ComputeFrame>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the compute stack.
#[derive(Debug, Clone)]
struct ComputeFrame {
    /// The notifier whose computation is running.
    notifier: NotifierId,
    /// Notifiers read while this frame was on top, in first-read order.
    dependencies: Vec<NotifierId>,
}

/// Access to the "currently rendering scope" context.
pub struct ReactiveContext;

impl ReactiveContext {
    /// Make `scope` the current scope until the returned guard is dropped.
    pub(crate) fn enter(scope: Arc<ScopeShared>) -> ScopeGuard {
        let id = scope.id();
        SCOPE_STACK.with(|stack| stack.borrow_mut().push(scope));
        ScopeGuard {
            scope: id,
            _not_send: PhantomData,
        }
    }

    /// Check if a render pass is active on this thread.
    pub fn is_active() -> bool {
        SCOPE_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the ID of the scope currently rendering, if any.
    pub fn current_scope() -> Option<ScopeId> {
        SCOPE_STACK.with(|stack| stack.borrow().last().map(|scope| scope.id()))
    }

    /// The innermost rendering scope.
    ///
    /// The `Arc` is cloned out so that no borrow of the stack is held while
    /// the caller links dependencies.
    pub(crate) fn current() -> Option<Arc<ScopeShared>> {
        SCOPE_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Depth of the scope stack.
    pub fn depth() -> usize {
        SCOPE_STACK.with(|stack| stack.borrow().len())
    }
}

/// Guard that pops the scope context when dropped.
pub(crate) struct ScopeGuard {
    scope: ScopeId,
    // Frames live in a thread-local stack; the guard must be dropped on the
    // thread that pushed it.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(scope) = popped {
                debug_assert_eq!(
                    scope.id(),
                    self.scope,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.scope,
                    scope.id()
                );
            }
        });
    }
}

/// Access to the "currently computing notifier" context.
///
/// This slot is filled by
/// [`StateNotifier::compute_with_tracking`](super::StateNotifier::compute_with_tracking).
/// It records which notifiers a computation reads, for derived-state features
/// to build on. It is independent of the scope stack and does not create
/// scope subscriptions.
pub struct ComputeContext;

impl ComputeContext {
    /// Make `notifier` the computing notifier until the guard is dropped.
    pub(crate) fn enter(notifier: NotifierId) -> ComputeGuard {
        COMPUTE_STACK.with(|stack| {
            stack.borrow_mut().push(ComputeFrame {
                notifier,
                dependencies: Vec::new(),
            });
        });

        ComputeGuard {
            notifier,
            _not_send: PhantomData,
        }
    }

    /// Check if a computation is active on this thread.
    pub fn is_active() -> bool {
        COMPUTE_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The notifier whose computation is innermost, if any.
    pub fn current() -> Option<NotifierId> {
        COMPUTE_STACK.with(|stack| stack.borrow().last().map(|frame| frame.notifier))
    }

    /// Record a read of `notifier` in the innermost frame.
    ///
    /// Repeated reads are recorded once. A computation reading its own
    /// notifier is not a dependency.
    pub(crate) fn track_dependency(notifier: NotifierId) {
        COMPUTE_STACK.with(|stack| {
            if let Some(frame) = stack.borrow_mut().last_mut() {
                if frame.notifier != notifier && !frame.dependencies.contains(&notifier) {
                    frame.dependencies.push(notifier);
                }
            }
        });
    }

    /// The notifiers read so far in the innermost frame.
    pub fn dependencies() -> Vec<NotifierId> {
        COMPUTE_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|frame| frame.dependencies.clone())
                .unwrap_or_default()
        })
    }
}

/// Guard that pops the compute context when dropped.
pub(crate) struct ComputeGuard {
    notifier: NotifierId,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ComputeGuard {
    fn drop(&mut self) {
        COMPUTE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame.notifier, self.notifier,
                    "ComputeContext mismatch: expected {:?}, got {:?}",
                    self.notifier, frame.notifier
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_context_tracks_notifier() {
        let id = NotifierId::new();

        assert!(!ComputeContext::is_active());
        assert!(ComputeContext::current().is_none());

        {
            let _ctx = ComputeContext::enter(id);

            assert!(ComputeContext::is_active());
            assert_eq!(ComputeContext::current(), Some(id));
        }

        assert!(!ComputeContext::is_active());
        assert!(ComputeContext::current().is_none());
    }

    #[test]
    fn compute_context_dedups_dependencies() {
        let id = NotifierId::new();
        let a = NotifierId::new();
        let b = NotifierId::new();
        let _ctx = ComputeContext::enter(id);

        ComputeContext::track_dependency(a);
        ComputeContext::track_dependency(b);
        ComputeContext::track_dependency(a);
        ComputeContext::track_dependency(id);

        assert_eq!(ComputeContext::dependencies(), vec![a, b]);
    }

    #[test]
    fn nested_compute_contexts() {
        let id1 = NotifierId::new();
        let id2 = NotifierId::new();

        {
            let _ctx1 = ComputeContext::enter(id1);
            assert_eq!(ComputeContext::current(), Some(id1));

            {
                let _ctx2 = ComputeContext::enter(id2);
                assert_eq!(ComputeContext::current(), Some(id2));
            }

            assert_eq!(ComputeContext::current(), Some(id1));
        }

        assert!(ComputeContext::current().is_none());
    }

    #[test]
    fn compute_context_restored_after_panic() {
        let outer = NotifierId::new();
        let inner = NotifierId::new();
        let _ctx = ComputeContext::enter(outer);

        let result = std::panic::catch_unwind(|| {
            let _ctx = ComputeContext::enter(inner);
            panic!("computation failed");
        });

        assert!(result.is_err());
        assert_eq!(ComputeContext::current(), Some(outer));
    }

    #[test]
    fn tracking_outside_any_frame_is_ignored() {
        ComputeContext::track_dependency(NotifierId::new());
        assert!(ComputeContext::dependencies().is_empty());
    }

    #[test]
    fn scope_context_starts_empty() {
        assert!(!ReactiveContext::is_active());
        assert_eq!(ReactiveContext::depth(), 0);
        assert!(ReactiveContext::current_scope().is_none());
    }
}
