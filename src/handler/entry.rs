//! # Registry record for one event key.
//!
//! A [`HandlerEntry`] is created on every successful registration and never
//! reused: re-registering a key after removal builds a fresh entry with a
//! zeroed call counter.
//!
//! ## Rules
//! - `key`, `once` and `expected_args` are immutable after construction.
//! - `call_count` only moves through an atomic increment ([`HandlerEntry::claim`]).
//! - For `once` entries only the claim that observes `1` may run the callable.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::DispatchError;
use crate::handler::Callable;

/// Registered handler: metadata, callable and call counter.
#[derive(Debug)]
pub struct HandlerEntry {
    key: String,
    once: bool,
    expected_args: usize,
    call_count: AtomicU64,
    callable: Callable,
}

impl HandlerEntry {
    pub(crate) fn new(key: String, once: bool, callable: Callable) -> Self {
        Self {
            key,
            once,
            expected_args: callable.arity(),
            call_count: AtomicU64::new(0),
            callable,
        }
    }

    /// Event key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the entry is one-shot.
    pub fn once(&self) -> bool {
        self.once
    }

    /// Arity captured at registration.
    pub fn expected_args(&self) -> usize {
        self.expected_args
    }

    /// Number of claims made so far (including claims that lost a once race).
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Acquire)
    }

    /// Rejects an argument list of the wrong length without touching any state.
    pub(crate) fn check_arity(&self, got: usize) -> Result<(), DispatchError> {
        if got == self.expected_args {
            Ok(())
        } else {
            Err(DispatchError::ArgsNotMatch {
                key: self.key.clone(),
                expected: self.expected_args,
                got,
            })
        }
    }

    /// Bumps the call counter and reports whether this call may run the callable.
    ///
    /// Repeatable entries are always eligible. A `once` entry is eligible only for
    /// the first claim; every later (or concurrently losing) claim gets `false`.
    pub(crate) fn claim(&self) -> bool {
        let n = self.call_count.fetch_add(1, Ordering::AcqRel) + 1;
        !self.once || n == 1
    }

    pub(crate) fn callable(&self) -> &Callable {
        &self.callable
    }

    /// Returns a read-only snapshot.
    pub fn info(&self) -> HandlerInfo {
        HandlerInfo {
            key: self.key.clone(),
            once: self.once,
            expected_args: self.expected_args,
            call_count: self.call_count(),
        }
    }
}

/// Point-in-time view of a registered handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    /// Event key.
    pub key: String,
    /// Whether the handler is one-shot.
    pub once: bool,
    /// Arity captured at registration.
    pub expected_args: usize,
    /// Claims made so far.
    pub call_count: u64,
}
