//! Callgate - sliding-window rate limiting for in-process operations
//!
//! This crate wraps arbitrary operations so that each one may run at most
//! `max_calls` times within any sliding `window`. Calls past the limit are
//! not run and come back as [`Outcome::Rejected`] instead of an error.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use callgate::{Outcome, RateLimiter};
//!
//! let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(5)).unwrap());
//! let greet = limiter.wrap_named(|name: &str| format!("Hello, {}", name), "greet");
//!
//! assert_eq!(greet.call("Ada"), Outcome::Admitted("Hello, Ada".to_string()));
//! assert!(greet.call("Bob").is_admitted());
//! assert!(greet.call("Eve").is_rejected());
//! ```

pub mod config;
pub mod error;
pub mod ratelimit;

pub use config::{LimiterConfig, RejectionPolicy};
pub use error::{CallgateError, Result};
pub use ratelimit::{Guarded, OperationKey, Outcome, RateLimiter, Rejection};
