//! # Emitter configuration.
//!
//! Provides [`Config`] centralized settings shared by [`Emitter`](crate::Emitter)
//! and [`QueuedEmitter`](crate::QueuedEmitter).
//!
//! ## Sentinel values
//! - `queue_capacity = 0` → unbounded dispatch queue
//! - `max_in_flight = 0` → unlimited concurrent invocations (no semaphore created)

use std::time::Duration;

/// Configuration for the emitters.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `queue_capacity`: Dispatch queue size for the queued emitter (`0` = unbounded)
/// - `max_in_flight`: Concurrent invocation cap for the queued emitter (`0` = unlimited)
/// - `grace`: How long `QueuedEmitter::shutdown` waits for in-flight invocations
/// - `capture_backtrace`: Capture a backtrace when a handler panic is recovered
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` messages observe
    /// `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Capacity of the dispatch queue consumed by the background loop.
    ///
    /// - `0` = unbounded; `send` never waits
    /// - `n > 0` = bounded; `send` waits for space when `n` messages are pending
    pub queue_capacity: usize,

    /// Maximum number of handler invocations running at once in queued mode.
    ///
    /// - `0` = unlimited (no semaphore)
    /// - `n > 0` = the loop waits for a free slot before spawning the next invocation
    pub max_in_flight: usize,

    /// Maximum time `shutdown()` waits for in-flight invocations.
    pub grace: Duration,

    /// Whether the invoker captures a backtrace for recovered panics.
    pub capture_backtrace: bool,
}

impl Config {
    /// Returns the dispatch queue bound as an `Option`.
    ///
    /// - `None` → unbounded channel
    /// - `Some(n)` → bounded channel of `n`
    #[inline]
    pub fn queue_bound(&self) -> Option<usize> {
        if self.queue_capacity == 0 {
            None
        } else {
            Some(self.queue_capacity)
        }
    }

    /// Returns the concurrency limit as an `Option`.
    ///
    /// - `None` → unlimited (no semaphore)
    /// - `Some(n)` → at most `n` concurrent invocations
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_in_flight == 0 {
            None
        } else {
            Some(self.max_in_flight)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `queue_capacity = 0` (unbounded)
    /// - `max_in_flight = 0` (unlimited)
    /// - `grace = 30s`
    /// - `capture_backtrace = true`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            queue_capacity: 0,
            max_in_flight: 0,
            grace: Duration::from_secs(30),
            capture_backtrace: true,
        }
    }
}
