//! Sliding-window admission control and its state.

mod clock;
mod guard;
mod history;
mod identity;
mod limiter;

pub use clock::{Clock, MockClock, SystemClock};
pub use guard::{Guarded, Outcome, Rejection};
pub use history::CallHistory;
pub use identity::OperationKey;
pub use limiter::RateLimiter;
