//! Outcome
//!
//! A two-variant value used by application code to report the result of a
//! fallible (usually asynchronous) state update without unwinding across the
//! render boundary. The UI layer stores an `Outcome` in a notifier and renders
//! the failure branch like any other state.
//!
//! The core never inspects an `Outcome`; it only provides the vocabulary.

use serde::{Deserialize, Serialize};

/// Either a successful payload or a failure payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T, E> {
    Success(T),
    Failure(E),
}

impl<T, E> Outcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The success payload, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// The failure payload, if any.
    pub fn failure(self) -> Option<E> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    pub fn as_ref(&self) -> Outcome<&T, &E> {
        match self {
            Self::Success(value) => Outcome::Success(value),
            Self::Failure(error) => Outcome::Failure(error),
        }
    }

    pub fn map<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(error) => Outcome::Failure(error),
        }
    }

    pub fn map_failure<G, F>(self, f: F) -> Outcome<T, G>
    where
        F: FnOnce(E) -> G,
    {
        match self {
            Self::Success(value) => Outcome::Success(value),
            Self::Failure(error) => Outcome::Failure(f(error)),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        self.into()
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, E> {
    fn from(outcome: Outcome<T, E>) -> Self {
        match outcome {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_from_result() {
        let ok: Outcome<u32, String> = Ok::<_, String>(7).into();
        assert!(ok.is_success());
        assert_eq!(ok.success(), Some(7));

        let err: Outcome<u32, String> = Err("offline".to_string()).into();
        assert!(err.is_failure());
        assert_eq!(err.failure().as_deref(), Some("offline"));
    }

    #[test]
    fn map_only_touches_its_branch() {
        let ok: Outcome<u32, &str> = Outcome::Success(2);
        assert_eq!(ok.map(|v| v * 10), Outcome::Success(20));

        let err: Outcome<u32, &str> = Outcome::Failure("nope");
        assert_eq!(err.map(|v| v * 10), Outcome::Failure("nope"));
        assert_eq!(err.map_failure(str::len), Outcome::Failure(4));
    }

    #[test]
    fn as_ref_borrows_the_payload() {
        let outcome: Outcome<String, String> = Outcome::Success("saved".to_string());
        assert_eq!(outcome.as_ref().map(String::len), Outcome::Success(5));
        assert!(outcome.is_success());

        let failed: Outcome<String, String> = Outcome::Failure("offline".to_string());
        assert_eq!(failed.as_ref().failure(), Some(&"offline".to_string()));
    }

    #[test]
    fn into_result_round_trips() {
        let outcome: Outcome<&str, i32> = Outcome::Failure(-1);
        assert_eq!(outcome.into_result(), Err(-1));
    }
}
