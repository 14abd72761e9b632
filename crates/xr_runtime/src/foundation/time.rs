//! Timeout utilities for the image wait path

use std::time::{Duration, Instant};

/// Nanosecond duration value meaning "wait forever"
pub const INFINITE_DURATION_NANOS: i64 = i64::MAX;

/// Convert an API-style nanosecond duration into a [`Duration`]
///
/// Negative values clamp to zero (poll once). [`INFINITE_DURATION_NANOS`]
/// maps to [`Duration::MAX`], which [`Deadline`] treats as "no deadline".
pub fn timeout_from_nanos(nanos: i64) -> Duration {
    match nanos {
        INFINITE_DURATION_NANOS => Duration::MAX,
        n if n <= 0 => Duration::ZERO,
        n => Duration::from_nanos(n.unsigned_abs()),
    }
}

/// Point in time after which a blocking wait gives up
///
/// A timeout too large to add to [`Instant::now`] becomes an unbounded wait
/// instead of overflowing.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// Create a deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
        }
    }

    /// Whether this deadline never expires
    pub fn is_unbounded(&self) -> bool {
        self.at.is_none()
    }

    /// Time left until expiry, `None` for an unbounded deadline
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has passed
    pub fn expired(&self) -> bool {
        self.remaining().map_or(false, |left| left.is_zero())
    }
}
