//! Reactive Primitives
//!
//! This module implements the reactive half of the state layer: notifiers,
//! scopes and the ambient context that links them.
//!
//! # Concepts
//!
//! ## Notifiers
//!
//! A [`StateNotifier`] holds one immutable value. Replacing the value calls
//! every registered listener synchronously.
//!
//! ## Scopes
//!
//! A [`ReactiveScope`] wraps a render callback owned by the host UI framework.
//! Any notifier read during a render pass subscribes the scope, and a change
//! to any of them makes the scope ask its [`RenderHost`] for a re-render.
//!
//! ## Lifecycles
//!
//! Notifiers realized from a scoped [`Locator`](crate::Locator) registration
//! are reference counted by their subscribing scopes and dispose themselves
//! when the count drops to zero. Everything else lives until disposed.
//!
//! # Implementation Notes
//!
//! The reactive system uses thread-local stacks to know which scope is
//! rendering and which notifier is computing. When a notifier is read, we
//! check if there is an active scope and, if so, link the two.
//!
//! The link itself is private to the crate. A subscriber can only be added
//! by a scope's render pass and only removed by its teardown, so every
//! scope a notifier counts also lists that notifier:
//!
//! ```compile_fail
//! use holdfast_core::reactive::Dependency;
//! ```
//!
//! ```compile_fail
//! let count = holdfast_core::StateNotifier::new(0);
//! let _ = count.as_dependency();
//! ```

mod context;
mod dependency;
mod notifier;
mod scope;
mod subscriber;

pub use context::{ComputeContext, ReactiveContext};
pub use notifier::StateNotifier;
pub use scope::{ReactiveScope, RenderContext, RenderHost};
pub use subscriber::{ListenerId, NotifierId, ScopeId};
