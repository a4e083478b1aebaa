//! Guarded operations and the outcome of a gated call.

use std::sync::Arc;
use std::time::Duration;

use super::identity::OperationKey;
use super::limiter::RateLimiter;

/// Details of a call that was not admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Identity whose quota was exhausted
    pub identity: OperationKey,
    /// Calls inside the window at decision time, after pruning
    pub call_count: usize,
    /// Configured limit
    pub max_calls: u32,
    /// Configured window
    pub window: Duration,
    /// Wait after which a call is admitted again, if no attempts come in between
    pub retry_after: Duration,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "operation '{}' has exceeded the max number of calls ({}/{} within {:?}, retry after {:?})",
            self.identity, self.call_count, self.max_calls, self.window, self.retry_after
        )
    }
}

/// Result of invoking a guarded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a rejected call did not run the operation"]
pub enum Outcome<T> {
    /// The operation ran and returned this value
    Admitted(T),
    /// The operation was not run
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    /// Whether the operation ran.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Outcome::Admitted(_))
    }

    /// Whether the operation was turned away.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    /// The operation's result, or `None` when the call was rejected.
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Admitted(value) => Some(value),
            Outcome::Rejected(_) => None,
        }
    }

    /// The rejection details, if the call was rejected.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Admitted(_) => None,
            Outcome::Rejected(rejection) => Some(rejection),
        }
    }

    /// Map the admitted value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Admitted(value) => Outcome::Admitted(f(value)),
            Outcome::Rejected(rejection) => Outcome::Rejected(rejection),
        }
    }
}

impl<T, E> Outcome<Result<T, E>> {
    /// Lift the operation's own error out, leaving rejection in the `Ok` arm.
    pub fn transpose(self) -> Result<Outcome<T>, E> {
        match self {
            Outcome::Admitted(Ok(value)) => Ok(Outcome::Admitted(value)),
            Outcome::Admitted(Err(err)) => Err(err),
            Outcome::Rejected(rejection) => Ok(Outcome::Rejected(rejection)),
        }
    }
}

impl<T> From<Outcome<T>> for Option<T> {
    fn from(outcome: Outcome<T>) -> Self {
        outcome.into_option()
    }
}

/// An operation whose calls pass through a [`RateLimiter`].
///
/// Arguments are passed as a single value; use a tuple for several.
pub struct Guarded<F> {
    limiter: Arc<RateLimiter>,
    identity: OperationKey,
    operation: F,
}

impl<F> Guarded<F> {
    pub(crate) fn new(limiter: Arc<RateLimiter>, identity: OperationKey, operation: F) -> Self {
        Self {
            limiter,
            identity,
            operation,
        }
    }

    /// Identity this operation is counted under.
    pub fn identity(&self) -> &OperationKey {
        &self.identity
    }

    /// The limiter gating this operation.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Unwrap the original operation.
    pub fn into_inner(self) -> F {
        self.operation
    }

    /// Call an operation taking one argument.
    pub fn call<A, R>(&self, args: A) -> Outcome<R>
    where
        F: Fn(A) -> R,
    {
        match self.limiter.admit(&self.identity) {
            Ok(()) => Outcome::Admitted((self.operation)(args)),
            Err(rejection) => Outcome::Rejected(rejection),
        }
    }

    /// Call an operation taking no arguments.
    pub fn call0<R>(&self) -> Outcome<R>
    where
        F: Fn() -> R,
    {
        match self.limiter.admit(&self.identity) {
            Ok(()) => Outcome::Admitted((self.operation)()),
            Err(rejection) => Outcome::Rejected(rejection),
        }
    }

    /// Call a stateful operation taking one argument.
    pub fn call_mut<A, R>(&mut self, args: A) -> Outcome<R>
    where
        F: FnMut(A) -> R,
    {
        match self.limiter.admit(&self.identity) {
            Ok(()) => Outcome::Admitted((self.operation)(args)),
            Err(rejection) => Outcome::Rejected(rejection),
        }
    }

    /// Call a stateful operation taking no arguments.
    pub fn call0_mut<R>(&mut self) -> Outcome<R>
    where
        F: FnMut() -> R,
    {
        match self.limiter.admit(&self.identity) {
            Ok(()) => Outcome::Admitted((self.operation)()),
            Err(rejection) => Outcome::Rejected(rejection),
        }
    }
}

impl<F> std::fmt::Debug for Guarded<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guarded")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::MockClock;
    use crate::LimiterConfig;

    fn limiter(max_calls: u32) -> (Arc<RateLimiter>, MockClock) {
        let clock = MockClock::default();
        let config = LimiterConfig::new(max_calls, Duration::from_secs(5));
        let limiter = RateLimiter::with_clock(&config, Arc::new(clock.clone())).unwrap();
        (Arc::new(limiter), clock)
    }

    #[test]
    fn test_admitted_call_returns_operation_result() {
        let (limiter, _clock) = limiter(3);
        let guarded = limiter.wrap_named(|name: &str| name.to_uppercase(), "print_name");

        assert_eq!(guarded.call("worthy"), Outcome::Admitted("WORTHY".to_string()));
    }

    #[test]
    fn test_rejected_call_does_not_run_operation() {
        let (limiter, _clock) = limiter(1);
        let runs = std::cell::Cell::new(0);
        let guarded = limiter.wrap_named(|| runs.set(runs.get() + 1), "counter");

        assert!(guarded.call0().is_admitted());
        let outcome = guarded.call0();

        assert!(outcome.is_rejected());
        assert_eq!(runs.get(), 1);
        let rejection = outcome.rejection().unwrap();
        assert_eq!(rejection.identity.as_str(), "counter");
        assert_eq!(rejection.call_count, 1);
        assert_eq!(rejection.max_calls, 1);
    }

    #[test]
    fn test_tuple_arguments() {
        let (limiter, _clock) = limiter(3);
        let add = limiter.wrap_named(|(a, b): (i32, i32)| a + b, "add");

        assert_eq!(add.call((2, 3)).into_option(), Some(5));
    }

    #[test]
    fn test_call_mut_keeps_operation_state() {
        let (limiter, _clock) = limiter(2);
        let mut total = 0;
        let mut accumulate = limiter.wrap_named(
            |n: i32| {
                total += n;
                total
            },
            "accumulate",
        );

        assert_eq!(accumulate.call_mut(4), Outcome::Admitted(4));
        assert_eq!(accumulate.call_mut(6), Outcome::Admitted(10));
        assert!(accumulate.call_mut(1).is_rejected());
    }

    #[test]
    fn test_operation_error_passes_through() {
        let (limiter, _clock) = limiter(3);
        let parse = limiter.wrap_named(|s: &str| s.parse::<u32>(), "parse");

        assert!(parse.call("nope").transpose().is_err());
        assert_eq!(parse.call("12").transpose().unwrap(), Outcome::Admitted(12));
        assert!(parse.call("7").transpose().unwrap().is_admitted());
        assert!(parse.call("8").transpose().unwrap().is_rejected());
    }

    #[test]
    fn test_unit_result_is_distinct_from_rejection() {
        let (limiter, _clock) = limiter(1);
        let noop = limiter.wrap_named(|| (), "noop");

        assert_eq!(Option::from(noop.call0()), Some(()));
        assert_eq!(Option::<()>::from(noop.call0()), None);
    }

    #[test]
    fn test_map_keeps_rejection() {
        let (limiter, _clock) = limiter(1);
        let len = limiter.wrap_named(|s: &str| s.len(), "len");

        assert_eq!(len.call("abc").map(|n| n * 2), Outcome::Admitted(6));
        let rejected = len.call("abc").map(|n| n * 2);
        assert_eq!(rejected.rejection().map(|r| r.call_count), Some(1));
    }

    #[test]
    fn test_guarded_exposes_limiter_and_operation() {
        let (limiter, _clock) = limiter(1);
        let double = limiter.wrap_named(|n: i32| n * 2, "double");

        assert!(Arc::ptr_eq(double.limiter(), &limiter));
        assert!(double.call(1).is_admitted());
        assert_eq!(double.limiter().call_count(double.identity()), 1);

        let inner = double.into_inner();
        assert_eq!(inner(21), 42);
        assert_eq!(limiter.call_count(&OperationKey::from("double")), 1);
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection {
            identity: OperationKey::from("print_name"),
            call_count: 3,
            max_calls: 3,
            window: Duration::from_secs(5),
            retry_after: Duration::from_millis(2750),
        };

        let message = rejection.to_string();
        assert!(message.contains("'print_name'"));
        assert!(message.contains("3/3"));
    }
}
