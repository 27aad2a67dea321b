//! Holdfast Core
//!
//! This crate provides the state layer underneath the Holdfast declarative UI
//! framework. It implements:
//!
//! - A typed, process-wide registry of long-lived state holders (`Locator`)
//! - Immutable-value notifiers with listener fan-out (`StateNotifier`)
//! - Render scopes that subscribe to whatever they read (`ReactiveScope`)
//!
//! Together these give fine-grained reactivity without declaring an explicit
//! observable graph: reading a notifier while a scope renders is what
//! subscribes the scope.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: notifiers, scopes and the ambient tracking context
//! - `locator`: keyed registration and the global/scoped lifecycles
//! - `outcome`: the success/failure vocabulary for application updates
//! - `error`: the error taxonomy shared by all of the above
//!
//! The UI element tree itself is owned by the host framework, which plugs in
//! through [`RenderHost`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! use holdfast_core::{Locator, ReactiveScope, ScopeId, StateKey, StateNotifier};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Counter {
//!     count: u32,
//! }
//!
//! const COUNTER: StateKey<Counter> = StateKey::new("counter");
//!
//! let locator = Locator::new();
//! locator
//!     .register_scoped(COUNTER, || StateNotifier::new(Counter { count: 0 }))
//!     .unwrap();
//!
//! let rerenders = Arc::new(AtomicUsize::new(0));
//! let rerenders_clone = rerenders.clone();
//! let lookup = locator.clone();
//! let mut scope = ReactiveScope::new(
//!     move |_: ScopeId| {
//!         rerenders_clone.fetch_add(1, Ordering::SeqCst);
//!     },
//!     move |_| lookup.get(COUNTER).map(|counter| counter.current().count),
//! );
//!
//! assert_eq!(scope.render().unwrap(), Ok(0));
//!
//! locator.get(COUNTER).unwrap().set(Counter { count: 1 }).unwrap();
//! assert_eq!(rerenders.load(Ordering::SeqCst), 1);
//!
//! // Unmounting the only subscriber disposes the scoped notifier.
//! scope.teardown();
//! assert_eq!(locator.get(COUNTER).unwrap().current(), Counter { count: 0 });
//! ```

pub mod error;
pub mod locator;
pub mod outcome;
pub mod reactive;

pub use error::{HoldfastError, HoldfastResult};
pub use locator::{Locator, StateKey};
pub use outcome::Outcome;
pub use reactive::{
    ListenerId, NotifierId, ReactiveScope, RenderContext, RenderHost, ScopeId, StateNotifier,
};
