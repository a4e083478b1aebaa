//! Core sliding-window rate limiter.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::guard::{Guarded, Outcome, Rejection};
use super::history::CallHistory;
use super::identity::OperationKey;
use crate::config::{LimiterConfig, RejectionPolicy};
use crate::error::{CallgateError, Result};

/// Admits at most `max_calls` calls per identity within any sliding window.
///
/// Each identity's history sits behind its own mutex, so callers of
/// different operations never wait on each other. The limiter is shared
/// across threads through `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    /// Call histories indexed by operation identity
    histories: DashMap<OperationKey, Arc<Mutex<CallHistory>>>,
    max_calls: u32,
    window: Duration,
    rejection_policy: RejectionPolicy,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_calls` per `window`.
    pub fn new(max_calls: u32, window: Duration) -> Result<Self> {
        Self::build(max_calls, window, RejectionPolicy::default(), Arc::new(SystemClock::new()))
    }

    /// Create a limiter from a loaded configuration.
    pub fn from_config(config: &LimiterConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a limiter reading time from `clock`.
    pub fn with_clock(config: &LimiterConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Self::build(config.max_calls, config.window(), config.rejection_policy, clock)
    }

    fn build(
        max_calls: u32,
        window: Duration,
        rejection_policy: RejectionPolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if max_calls == 0 {
            return Err(CallgateError::InvalidConfiguration(
                "max_calls must be greater than 0".into(),
            ));
        }
        if window.is_zero() {
            return Err(CallgateError::InvalidConfiguration(
                "window must be greater than 0".into(),
            ));
        }

        debug!(
            max_calls = max_calls,
            window = ?window,
            policy = ?rejection_policy,
            "Creating rate limiter"
        );

        Ok(Self {
            histories: DashMap::new(),
            max_calls,
            window,
            rejection_policy,
            clock,
        })
    }

    /// Wrap `operation`, counting its calls under its type name.
    pub fn wrap<F>(self: &Arc<Self>, operation: F) -> Guarded<F> {
        let identity = OperationKey::of(&operation);
        Guarded::new(Arc::clone(self), identity, operation)
    }

    /// Wrap `operation`, counting its calls under `identity`.
    pub fn wrap_named<F>(self: &Arc<Self>, operation: F, identity: impl Into<OperationKey>) -> Guarded<F> {
        Guarded::new(Arc::clone(self), identity.into(), operation)
    }

    /// Run `operation` once if `identity` has quota left.
    pub fn call<R>(&self, identity: &OperationKey, operation: impl FnOnce() -> R) -> Outcome<R> {
        match self.admit(identity) {
            Ok(()) => Outcome::Admitted(operation()),
            Err(rejection) => Outcome::Rejected(rejection),
        }
    }

    /// Decide whether one call for `identity` may run now, recording it if so.
    ///
    /// Pruning, the limit check and the append happen under the identity's
    /// lock, so concurrent callers of one identity never overshoot the limit.
    pub fn admit(&self, identity: &OperationKey) -> std::result::Result<(), Rejection> {
        let history = match self.history_for(identity) {
            Some(history) => history,
            None => return Ok(()),
        };

        let mut history = history.lock();
        // Read the clock under the lock so histories stay in order.
        let now = self.clock.now();
        history.prune(now, self.window);

        let call_count = history.len();
        if call_count >= self.max_calls as usize {
            if self.rejection_policy == RejectionPolicy::Penalize {
                history.record(now);
            }
            let retry_after = history.retry_after(now, self.window, self.max_calls as usize);

            debug!(
                identity = %identity,
                count = call_count,
                max_calls = self.max_calls,
                retry_after = ?retry_after,
                "Operation has exceeded the max number of calls"
            );

            return Err(Rejection {
                identity: identity.clone(),
                call_count,
                max_calls: self.max_calls,
                window: self.window,
                retry_after,
            });
        }

        history.record(now);
        trace!(
            identity = %identity,
            count = call_count + 1,
            max_calls = self.max_calls,
            "Call admitted"
        );
        Ok(())
    }

    /// Look up the history for `identity`, creating it on first use.
    ///
    /// Returns `None` when this call created the history, which already holds
    /// the call being admitted.
    fn history_for(&self, identity: &OperationKey) -> Option<Arc<Mutex<CallHistory>>> {
        if let Some(history) = self.histories.get(identity) {
            return Some(Arc::clone(history.value()));
        }

        match self.histories.entry(identity.clone()) {
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let now = self.clock.now();
                entry.insert(Arc::new(Mutex::new(CallHistory::starting_at(now))));
                debug!(identity = %identity, "Creating call history");
                None
            }
        }
    }

    /// Calls currently inside the window for `identity`.
    ///
    /// Read-only: stale timestamps are skipped, not removed.
    pub fn call_count(&self, identity: &OperationKey) -> usize {
        let history = match self.histories.get(identity) {
            Some(history) => Arc::clone(history.value()),
            None => return 0,
        };

        let history = history.lock();
        history.count_within(self.clock.now(), self.window)
    }

    /// Get the number of identities seen so far.
    pub fn identity_count(&self) -> usize {
        self.histories.len()
    }

    /// Forget all call histories.
    pub fn clear(&self) {
        self.histories.clear();
    }

    /// Configured call limit.
    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    /// Configured window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Configured rejection policy.
    pub fn rejection_policy(&self) -> RejectionPolicy {
        self.rejection_policy
    }
}
