//! Typed registry keys.

use std::fmt;
use std::marker::PhantomData;

/// A string-tagged key naming one registry entry holding a
/// `StateNotifier<T>`.
///
/// Uniqueness is by name: two keys with the same name address the same entry
/// regardless of `T`. Declare keys once, as constants:
///
/// ```rust
/// use holdfast_core::StateKey;
///
/// #[derive(Clone)]
/// struct Session {
///     user: Option<String>,
/// }
///
/// const SESSION: StateKey<Session> = StateKey::new("session");
/// assert_eq!(SESSION.name(), "session");
/// ```
pub struct StateKey<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> StateKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for StateKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateKey<T> {}

impl<T> fmt::Debug for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateKey")
            .field(&self.name)
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T> fmt::Display for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
