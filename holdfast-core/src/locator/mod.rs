//! Locator
//!
//! The locator is the process-wide registry that creates notifiers by key and
//! decides how long they live.
//!
//! # Registrations
//!
//! - **Global**: an existing notifier, stored as-is and never removed.
//! - **Global lazy**: a factory run on the first lookup. The result is cached
//!   and the factory discarded.
//! - **Scoped**: a factory run on every lookup that finds no live instance.
//!   Each realized notifier is tagged with its key; when its last subscribing
//!   scope detaches it disposes itself and the locator forgets it, so the
//!   next lookup builds a fresh one from the retained factory.
//!
//! A key may only be registered once until it is unregistered or the locator
//! is reset.
//!
//! # Thread Safety
//!
//! The registry maps sit behind one `parking_lot` lock. Factories run with the
//! lock released, so a factory may look up other keys.

mod key;

pub use key::StateKey;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{HoldfastError, HoldfastResult};
use crate::reactive::{NotifierId, StateNotifier};

type ErasedNotifier = Box<dyn Any + Send + Sync>;
type Build = Arc<dyn Fn() -> ErasedNotifier + Send + Sync>;

/// A realized notifier with its value type erased.
struct Realized {
    id: NotifierId,
    notifier: ErasedNotifier,
}

impl Realized {
    fn new<T>(notifier: StateNotifier<T>) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self {
            id: notifier.id(),
            notifier: Box::new(notifier),
        }
    }

    fn typed<T>(&self, key: &'static str) -> HoldfastResult<StateNotifier<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        downcast(&*self.notifier, key)
    }
}

struct Factory {
    build: Build,
    value_type: TypeId,
}

fn downcast<T>(
    notifier: &(dyn Any + Send + Sync),
    key: &'static str,
) -> HoldfastResult<StateNotifier<T>>
where
    T: Clone + Send + Sync + 'static,
{
    notifier
        .downcast_ref::<StateNotifier<T>>()
        .cloned()
        .ok_or(HoldfastError::TypeMismatch {
            key,
            expected: std::any::type_name::<T>(),
        })
}

#[derive(Default)]
struct Registry {
    instances: IndexMap<&'static str, Realized>,
    factories: IndexMap<&'static str, Factory>,
    scoped: IndexSet<&'static str>,
}

impl Registry {
    fn contains(&self, key: &str) -> bool {
        self.instances.contains_key(key) || self.factories.contains_key(key)
    }

    fn ensure_vacant(&self, key: &'static str) -> HoldfastResult<()> {
        if self.contains(key) {
            Err(HoldfastError::DuplicateRegistration { key })
        } else {
            Ok(())
        }
    }
}

/// State shared by all handles to one locator. Scoped notifiers hold a weak
/// reference to it so they can remove themselves on dispose.
pub(crate) struct LocatorShared {
    registry: RwLock<Registry>,
}

impl LocatorShared {
    /// Forget the realized instance under `key`, if it is still `id`.
    ///
    /// Factories and the scoped flag are untouched, so the next lookup
    /// realizes a new instance.
    pub(crate) fn forget(&self, key: &'static str, id: NotifierId) {
        let mut registry = self.registry.write();
        if registry.instances.get(key).map(|realized| realized.id) == Some(id) {
            registry.instances.shift_remove(key);
            debug!(key, notifier = ?id, "forgot realized instance");
        }
    }
}

/// A registry of notifiers keyed by [`StateKey`].
///
/// Cloning a `Locator` creates a new handle to the **same** registry. Most
/// applications use the process-wide instance returned by
/// [`Locator::global`]; tests usually build their own with [`Locator::new`].
#[derive(Clone)]
pub struct Locator {
    shared: Arc<LocatorShared>,
}

static GLOBAL: OnceLock<Locator> = OnceLock::new();

impl Locator {
    /// Create an empty, independent locator.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(LocatorShared {
                registry: RwLock::new(Registry::default()),
            }),
        }
    }

    /// The process-wide locator.
    pub fn global() -> &'static Locator {
        GLOBAL.get_or_init(Locator::new)
    }

    /// Register an existing notifier. It is never removed automatically.
    pub fn register_global<T>(
        &self,
        key: StateKey<T>,
        notifier: StateNotifier<T>,
    ) -> HoldfastResult<()>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut registry = self.shared.registry.write();
        registry.ensure_vacant(key.name())?;
        registry.instances.insert(key.name(), Realized::new(notifier));

        debug!(key = key.name(), "registered global notifier");
        Ok(())
    }

    /// Register a factory that runs once, on the first lookup.
    pub fn register_global_lazy<T, F>(&self, key: StateKey<T>, factory: F) -> HoldfastResult<()>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StateNotifier<T> + Send + Sync + 'static,
    {
        self.insert_factory(key, factory, false)?;
        debug!(key = key.name(), "registered lazy global notifier");
        Ok(())
    }

    /// Register a factory whose notifiers live only while scopes subscribe
    /// to them.
    pub fn register_scoped<T, F>(&self, key: StateKey<T>, factory: F) -> HoldfastResult<()>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StateNotifier<T> + Send + Sync + 'static,
    {
        self.insert_factory(key, factory, true)?;
        debug!(key = key.name(), "registered scoped notifier");
        Ok(())
    }

    fn insert_factory<T, F>(&self, key: StateKey<T>, factory: F, scoped: bool) -> HoldfastResult<()>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StateNotifier<T> + Send + Sync + 'static,
    {
        let mut registry = self.shared.registry.write();
        registry.ensure_vacant(key.name())?;

        let build: Build = Arc::new(move || Box::new(factory()) as ErasedNotifier);
        registry.factories.insert(
            key.name(),
            Factory {
                build,
                value_type: TypeId::of::<StateNotifier<T>>(),
            },
        );
        if scoped {
            registry.scoped.insert(key.name());
        }
        Ok(())
    }

    /// Look up the notifier for `key`, realizing it from its factory if
    /// needed.
    pub fn get<T>(&self, key: StateKey<T>) -> HoldfastResult<StateNotifier<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let name = key.name();

        let (build, scoped) = {
            let registry = self.shared.registry.read();
            if let Some(realized) = registry.instances.get(name) {
                return realized.typed(name);
            }

            let factory = registry
                .factories
                .get(name)
                .ok_or(HoldfastError::NotRegistered { key: name })?;

            if factory.value_type != TypeId::of::<StateNotifier<T>>() {
                return Err(HoldfastError::TypeMismatch {
                    key: name,
                    expected: std::any::type_name::<T>(),
                });
            }

            (Arc::clone(&factory.build), registry.scoped.contains(name))
        };

        let built = build();
        let notifier = downcast::<T>(&*built, name)?;

        let mut registry = self.shared.registry.write();

        // The factory itself, or another thread, may have realized the key
        // while the lock was released.
        if let Some(realized) = registry.instances.get(name) {
            return realized.typed(name);
        }
        if !registry.factories.contains_key(name) {
            return Err(HoldfastError::NotRegistered { key: name });
        }

        if scoped {
            notifier.bind_scoped(name, Arc::downgrade(&self.shared));
        } else {
            registry.factories.shift_remove(name);
        }
        registry.instances.insert(name, Realized::new(notifier.clone()));

        debug!(key = name, notifier = ?notifier.id(), scoped, "realized notifier");
        Ok(notifier)
    }

    /// Whether `key` has a live instance or a factory.
    pub fn is_registered<T>(&self, key: StateKey<T>) -> bool {
        self.shared.registry.read().contains(key.name())
    }

    /// Whether `key` currently has a live instance.
    pub fn is_realized<T>(&self, key: StateKey<T>) -> bool {
        self.shared.registry.read().instances.contains_key(key.name())
    }

    /// Drop every trace of `key`. Returns whether anything was registered.
    ///
    /// A live instance is not disposed.
    pub fn unregister<T>(&self, key: StateKey<T>) -> bool {
        let mut registry = self.shared.registry.write();
        let instance = registry.instances.shift_remove(key.name()).is_some();
        let factory = registry.factories.shift_remove(key.name()).is_some();
        registry.scoped.shift_remove(key.name());

        debug!(key = key.name(), "unregistered key");
        instance || factory
    }

    /// Clear every registration.
    ///
    /// Live instances are not disposed; callers that need that must dispose
    /// them first. Intended for test isolation.
    pub fn reset(&self) {
        *self.shared.registry.write() = Registry::default();
        debug!("locator reset");
    }

    /// Get the number of registered keys.
    pub fn len(&self) -> usize {
        let registry = self.shared.registry.read();
        registry
            .instances
            .keys()
            .chain(registry.factories.keys())
            .collect::<IndexSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.shared.registry.read();
        f.debug_struct("Locator")
            .field("instances", &registry.instances.keys().collect::<Vec<_>>())
            .field("factories", &registry.factories.keys().collect::<Vec<_>>())
            .field("scoped", &registry.scoped)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    const COUNT: StateKey<i32> = StateKey::new("count");
    const NAME: StateKey<String> = StateKey::new("name");

    #[test]
    fn registered_instance_is_returned_as_is() {
        let locator = Locator::new();
        let notifier = StateNotifier::new(7);

        locator.register_global(COUNT, notifier.clone()).unwrap();

        assert!(locator.get(COUNT).unwrap().ptr_eq(&notifier));
    }

    #[test]
    fn duplicate_registration_fails_for_every_variant() {
        let locator = Locator::new();
        locator.register_global(COUNT, StateNotifier::new(0)).unwrap();

        let dup = HoldfastError::DuplicateRegistration { key: "count" };
        assert_eq!(locator.register_global(COUNT, StateNotifier::new(0)), Err(dup.clone()));
        assert_eq!(locator.register_global_lazy(COUNT, || StateNotifier::new(0)), Err(dup.clone()));
        assert_eq!(locator.register_scoped(COUNT, || StateNotifier::new(0)), Err(dup.clone()));

        locator.register_scoped(NAME, || StateNotifier::new(String::new())).unwrap();
        assert!(locator.register_global(NAME, StateNotifier::new(String::new())).is_err());
        assert!(locator.register_global_lazy(NAME, || StateNotifier::new(String::new())).is_err());
    }

    #[test]
    fn unknown_key_is_not_registered() {
        let locator = Locator::new();
        assert_eq!(
            locator.get(COUNT).unwrap_err(),
            HoldfastError::NotRegistered { key: "count" }
        );
    }

    #[test]
    fn lazy_global_runs_factory_once() {
        let locator = Locator::new();
        let built = Arc::new(AtomicI32::new(0));
        let built_clone = built.clone();

        locator
            .register_global_lazy(COUNT, move || {
                built_clone.fetch_add(1, Ordering::SeqCst);
                StateNotifier::new(3)
            })
            .unwrap();

        assert!(!locator.is_realized(COUNT));
        assert_eq!(built.load(Ordering::SeqCst), 0);

        let first = locator.get(COUNT).unwrap();
        let second = locator.get(COUNT).unwrap();

        assert!(first.ptr_eq(&second));
        assert!(!first.is_scoped());
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(locator.is_realized(COUNT));
    }

    #[test]
    fn scoped_instance_is_recreated_after_dispose() {
        let locator = Locator::new();
        locator.register_scoped(COUNT, || StateNotifier::new(0)).unwrap();

        let a = locator.get(COUNT).unwrap();
        assert!(a.is_scoped());
        assert_eq!(a.registry_key(), Some("count"));
        a.set(9).unwrap();

        a.dispose();
        assert!(!locator.is_realized(COUNT));
        assert!(locator.is_registered(COUNT));

        let b = locator.get(COUNT).unwrap();
        assert!(!b.ptr_eq(&a));
        assert_eq!(b.current(), 0);
    }

    #[test]
    fn stale_dispose_does_not_evict_the_replacement() {
        let locator = Locator::new();
        locator.register_scoped(COUNT, || StateNotifier::new(0)).unwrap();

        let a = locator.get(COUNT).unwrap();
        a.dispose();
        let b = locator.get(COUNT).unwrap();

        // A second dispose of the old instance is a no-op.
        a.dispose();
        assert!(locator.get(COUNT).unwrap().ptr_eq(&b));
    }

    #[test]
    fn mismatched_value_type_is_reported() {
        let locator = Locator::new();
        const AS_TEXT: StateKey<String> = StateKey::new("count");

        locator.register_global_lazy(COUNT, || StateNotifier::new(1)).unwrap();
        assert!(matches!(
            locator.get(AS_TEXT),
            Err(HoldfastError::TypeMismatch { key: "count", .. })
        ));

        locator.get(COUNT).unwrap();
        assert!(matches!(
            locator.get(AS_TEXT),
            Err(HoldfastError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn factories_may_look_up_other_keys() {
        let locator = Locator::new();
        locator.register_global(COUNT, StateNotifier::new(4)).unwrap();

        let inner = locator.clone();
        locator
            .register_global_lazy(NAME, move || {
                let count = inner.get(COUNT).map(|n| n.current()).unwrap_or_default();
                StateNotifier::new(format!("count is {count}"))
            })
            .unwrap();

        assert_eq!(locator.get(NAME).unwrap().current(), "count is 4");
    }

    #[test]
    fn reset_clears_everything_without_disposing() {
        let locator = Locator::new();
        let notifier = StateNotifier::new(1);
        locator.register_global(COUNT, notifier.clone()).unwrap();
        locator.register_scoped(NAME, || StateNotifier::new(String::new())).unwrap();
        assert_eq!(locator.len(), 2);

        locator.reset();

        assert!(locator.is_empty());
        assert!(!notifier.is_disposed());
        assert!(locator.get(COUNT).is_err());
        locator.register_global(COUNT, StateNotifier::new(2)).unwrap();
    }

    #[test]
    fn unregister_frees_the_key() {
        let locator = Locator::new();
        locator.register_scoped(COUNT, || StateNotifier::new(0)).unwrap();
        locator.get(COUNT).unwrap();

        assert!(locator.unregister(COUNT));
        assert!(!locator.unregister(COUNT));
        assert!(!locator.is_registered(COUNT));

        locator.register_global(COUNT, StateNotifier::new(1)).unwrap();
    }

    #[test]
    fn len_counts_realized_scoped_keys_once() {
        let locator = Locator::new();
        locator.register_scoped(COUNT, || StateNotifier::new(0)).unwrap();
        locator.get(COUNT).unwrap();
        assert_eq!(locator.len(), 1);
    }

    #[test]
    fn global_locator_is_a_singleton() {
        const ONLY_HERE: StateKey<u8> =
            StateKey::new("locator::tests::global_locator_is_a_singleton");

        Locator::global()
            .register_global(ONLY_HERE, StateNotifier::new(1))
            .unwrap();

        assert!(Locator::global().is_registered(ONLY_HERE));
        assert!(Locator::global().unregister(ONLY_HERE));
    }
}
