//! # Reconnect backoff.
//!
//! [`BackoffPolicy`] computes how long a connection supervisor waits before its
//! next attempt:
//! - [`BackoffPolicy::first`] the delay after the first failure;
//! - [`BackoffPolicy::factor`] the multiplicative growth per further failure;
//! - [`BackoffPolicy::max`] the cap.
//!
//! The delay for failure `n` (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jittered. The default (`first = max = 1s`, `factor = 1.0`, no jitter) is a
//! constant one-second cadence.
//!
//! # Example
//! ```rust
//! # use std::time::Duration;
//! use actorvisor::BackoffPolicy;
//!
//! assert_eq!(BackoffPolicy::default().next(0), Duration::from_secs(1));
//! assert_eq!(BackoffPolicy::default().next(50), Duration::from_secs(1));
//!
//! let growing = BackoffPolicy {
//!     factor: 2.0,
//!     max: Duration::from_secs(2),
//!     ..BackoffPolicy::fixed(Duration::from_millis(250))
//! };
//! assert_eq!(growing.next(1), Duration::from_millis(500));
//! assert_eq!(growing.next(10), Duration::from_secs(2));
//! ```

use std::time::Duration;

use super::JitterPolicy;

/// Delay between connection attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub first: Duration,
    /// Maximum delay.
    pub max: Duration,
    /// Multiplicative growth factor (`1.0` = constant).
    pub factor: f64,
    /// Randomization applied to each delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// One second between attempts, forever.
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

impl BackoffPolicy {
    /// Constant `delay` between attempts.
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Delay that follows failure number `failures` (0-indexed).
    pub fn next(&self, failures: u32) -> Duration {
        let exp = i32::try_from(failures).unwrap_or(i32::MAX);
        let grown = self.first.as_secs_f64() * self.factor.powi(exp);
        let capped = if grown.is_finite() && grown >= 0.0 && grown <= self.max.as_secs_f64() {
            Duration::from_secs_f64(grown)
        } else {
            self.max
        };
        self.jitter.apply(capped)
    }
}
