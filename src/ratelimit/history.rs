//! Per-operation call history.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Timestamps of past admitted calls for one operation, oldest first.
#[derive(Debug, Clone, Default)]
pub struct CallHistory {
    timestamps: VecDeque<Instant>,
}

impl CallHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history holding a single call made at `now`.
    pub fn starting_at(now: Instant) -> Self {
        let mut history = Self::new();
        history.record(now);
        history
    }

    /// Drop every timestamp that is `window` old or older.
    ///
    /// A timestamp exactly `window` old is stale.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if is_live(now, oldest, window) {
                break;
            }
            self.timestamps.pop_front();
        }
    }

    /// Count the timestamps still inside the window without pruning.
    pub fn count_within(&self, now: Instant, window: Duration) -> usize {
        self.timestamps
            .iter()
            .filter(|&&t| is_live(now, t, window))
            .count()
    }

    /// Append a call made at `now`.
    pub fn record(&mut self, now: Instant) {
        debug_assert!(self.timestamps.back().map_or(true, |&last| last <= now));
        self.timestamps.push_back(now);
    }

    /// Time until enough calls age out for one more to fit under `max_calls`.
    ///
    /// Expects a pruned history. Zero when there is already room.
    pub fn retry_after(&self, now: Instant, window: Duration, max_calls: usize) -> Duration {
        if self.timestamps.len() < max_calls {
            return Duration::ZERO;
        }

        let blocking = self.timestamps.len() - max_calls;
        self.timestamps
            .get(blocking)
            .map(|&t| window.saturating_sub(now.saturating_duration_since(t)))
            .unwrap_or(Duration::ZERO)
    }

    /// Number of timestamps currently held.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether no timestamps are held.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The oldest timestamp held, if any.
    pub fn oldest(&self) -> Option<Instant> {
        self.timestamps.front().copied()
    }

    /// Iterate timestamps oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Instant> {
        self.timestamps.iter()
    }
}

fn is_live(now: Instant, timestamp: Instant, window: Duration) -> bool {
    now.saturating_duration_since(timestamp) < window
}
