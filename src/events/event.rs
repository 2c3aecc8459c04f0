//! # Runtime events emitted by the emitters and the dispatch loop.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Registry events**: handler registered / removed / consumed
//! - **Dispatch events**: invocation outcome, queued dispatch, rejected triggers
//! - **Runtime events**: subscriber faults and queued-emitter shutdown
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the event
//! key, reasons and argument counts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use hookbus::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::HandlerPanicked)
//!     .with_key("greet")
//!     .with_reason("boom")
//!     .with_args(0);
//!
//! assert_eq!(ev.kind, EventKind::HandlerPanicked);
//! assert_eq!(ev.key.as_deref(), Some("greet"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `key`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `key`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Registry events ===
    /// A handler was registered.
    ///
    /// Sets:
    /// - `key`: event key
    /// - `args`: arity
    /// - `once`: one-shot flag
    HandlerRegistered,

    /// A handler was removed explicitly.
    ///
    /// Sets:
    /// - `key`: event key
    HandlerRemoved,

    /// A once-handler won its claim and left the registry.
    ///
    /// Sets:
    /// - `key`: event key
    OnceConsumed,

    // === Dispatch events ===
    /// A trigger was rejected before invocation (not found, arity, lost once race, closed).
    ///
    /// Sets:
    /// - `key`: event key
    /// - `reason`: error label
    /// - `args`: supplied argument count
    TriggerRejected,

    /// A dispatch message was queued for the background loop.
    ///
    /// Sets:
    /// - `key`: event key
    /// - `args`: argument count
    DispatchQueued,

    /// The handler ran to completion.
    ///
    /// Sets:
    /// - `key`: event key
    HandlerInvoked,

    /// The handler returned an error or rejected an argument type.
    ///
    /// Sets:
    /// - `key`: event key
    /// - `reason`: error message
    HandlerFailed,

    /// The handler panicked; the panic was recovered.
    ///
    /// Sets:
    /// - `key`: event key
    /// - `reason`: panic info/message
    HandlerPanicked,

    // === Queued runtime events ===
    /// `close()` was requested on a queued emitter.
    CloseRequested,

    /// `shutdown()` started: new sends are refused, queued messages are drained.
    ShutdownRequested,

    /// All in-flight invocations finished within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some invocations were still running.
    ///
    /// Sets:
    /// - `reason`: number of abandoned invocations
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Event key (or subscriber name for subscriber events).
    pub key: Option<Arc<str>>,
    /// Human-readable reason (errors, panic info, overflow details).
    pub reason: Option<Arc<str>>,
    /// Argument count or arity.
    pub args: Option<u32>,
    /// One-shot flag of the handler.
    pub once: Option<bool>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            key: None,
            reason: None,
            args: None,
            once: None,
        }
    }

    /// Attaches an event key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an argument count (saturates at `u32::MAX`).
    #[inline]
    pub fn with_args(mut self, n: usize) -> Self {
        self.args = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Attaches the one-shot flag.
    #[inline]
    pub fn with_once(mut self, once: bool) -> Self {
        self.once = Some(once);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_key(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_key(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
