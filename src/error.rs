//! Error types used by the hookbus facades and runtime.
//!
//! This module defines two error enums:
//!
//! - [`DispatchError`]: errors returned by registration and trigger operations.
//! - [`RuntimeError`]: errors raised by the queued runtime itself (shutdown).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors returned by registration and trigger operations.
///
/// Every variant is an ordinary return value. A handler panic is caught at the
/// invoker boundary and surfaces as [`DispatchError::RuntimePanicRecovered`];
/// it never unwinds into the caller of `send`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Triggered with the wrong number of arguments. No state was changed.
    #[error("the number of input args not match for {key:?}: expected {expected}, got {got}")]
    ArgsNotMatch {
        /// Event key.
        key: String,
        /// Arity captured at registration.
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },

    /// A handler is already registered under this key; the existing one is untouched.
    #[error("event {key:?} already exists")]
    AlreadyExists {
        /// Event key.
        key: String,
    },

    /// The registered value is not invocable.
    #[error("event {key:?} not callable")]
    NotCallable {
        /// Event key.
        key: String,
    },

    /// No live handler for this key (never registered, removed, or a consumed once-handler).
    #[error("event {key:?} not found")]
    NotFound {
        /// Event key.
        key: String,
    },

    /// The handler panicked; the panic was recovered at the invoker boundary.
    #[error("event {key:?} runtime recover a panic: {info}")]
    RuntimePanicRecovered {
        /// Event key.
        key: String,
        /// Panic payload rendered as text.
        info: String,
    },

    /// The handler ran and returned an error.
    #[error("event {key:?} handler failed: {error}")]
    HandlerFailed {
        /// Event key.
        key: String,
        /// The handler's error message.
        error: String,
    },

    /// An argument could not be converted to the handler's declared parameter type.
    #[error("event {key:?} arg #{index} is not of type {expected}")]
    ArgTypeMismatch {
        /// Event key.
        key: String,
        /// Zero-based argument position.
        index: usize,
        /// Declared parameter type name.
        expected: &'static str,
    },

    /// Registration with an empty key.
    #[error("event key must not be empty")]
    EmptyKey,

    /// The queued emitter was closed or its dispatch loop is gone.
    #[error("dispatcher closed")]
    Closed,
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use hookbus::DispatchError;
    ///
    /// let err = DispatchError::NotFound { key: "greet".into() };
    /// assert_eq!(err.as_label(), "not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::ArgsNotMatch { .. } => "args_not_match",
            DispatchError::AlreadyExists { .. } => "already_exists",
            DispatchError::NotCallable { .. } => "not_callable",
            DispatchError::NotFound { .. } => "not_found",
            DispatchError::RuntimePanicRecovered { .. } => "runtime_panic_recovered",
            DispatchError::HandlerFailed { .. } => "handler_failed",
            DispatchError::ArgTypeMismatch { .. } => "arg_type_mismatch",
            DispatchError::EmptyKey => "empty_key",
            DispatchError::Closed => "closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DispatchError::ArgsNotMatch { expected, got, .. } => {
                format!("args: expected {expected}, got {got}")
            }
            DispatchError::RuntimePanicRecovered { info, .. } => format!("panic: {info}"),
            DispatchError::HandlerFailed { error, .. } => format!("error: {error}"),
            DispatchError::ArgTypeMismatch { index, expected, .. } => {
                format!("arg #{index}: expected {expected}")
            }
            other => other.to_string(),
        }
    }

    /// Returns the event key this error refers to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            DispatchError::ArgsNotMatch { key, .. }
            | DispatchError::AlreadyExists { key }
            | DispatchError::NotCallable { key }
            | DispatchError::NotFound { key }
            | DispatchError::RuntimePanicRecovered { key, .. }
            | DispatchError::HandlerFailed { key, .. }
            | DispatchError::ArgTypeMismatch { key, .. } => Some(key),
            DispatchError::EmptyKey | DispatchError::Closed => None,
        }
    }

    /// Indicates whether the error came from running the handler itself
    /// (as opposed to lookup, arity or registration checks).
    ///
    /// # Example
    /// ```
    /// use hookbus::DispatchError;
    ///
    /// let panicked = DispatchError::RuntimePanicRecovered { key: "k".into(), info: "boom".into() };
    /// assert!(panicked.is_handler_fault());
    ///
    /// let missing = DispatchError::NotFound { key: "k".into() };
    /// assert!(!missing.is_handler_fault());
    /// ```
    pub fn is_handler_fault(&self) -> bool {
        matches!(
            self,
            DispatchError::RuntimePanicRecovered { .. }
                | DispatchError::HandlerFailed { .. }
                | DispatchError::ArgTypeMismatch { .. }
        )
    }
}

/// # Errors produced by the queued runtime.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// Grace period was exceeded; some invocations were still running and were abandoned.
    #[error("shutdown timeout {grace:?} exceeded; in flight: {in_flight}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of invocations still running when the grace expired.
        in_flight: usize,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use hookbus::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), in_flight: 2 };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, in_flight } => {
                format!("grace exceeded after {grace:?}; in flight={in_flight}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let cases = [
            (
                DispatchError::ArgsNotMatch { key: "k".into(), expected: 2, got: 1 },
                "args_not_match",
            ),
            (DispatchError::AlreadyExists { key: "k".into() }, "already_exists"),
            (DispatchError::NotCallable { key: "k".into() }, "not_callable"),
            (DispatchError::EmptyKey, "empty_key"),
            (DispatchError::Closed, "closed"),
        ];
        for (err, label) in cases {
            assert_eq!(err.as_label(), label);
        }
    }

    #[test]
    fn key_is_exposed_for_keyed_variants() {
        let err = DispatchError::ArgTypeMismatch { key: "add".into(), index: 1, expected: "i32" };
        assert_eq!(err.key(), Some("add"));
        assert_eq!(err.as_message(), "arg #1: expected i32");
        assert_eq!(DispatchError::Closed.key(), None);
    }

    #[test]
    fn display_mentions_counts() {
        let err = DispatchError::ArgsNotMatch { key: "add".into(), expected: 3, got: 2 };
        let text = err.to_string();
        assert!(text.contains("expected 3"));
        assert!(text.contains("got 2"));
    }
}
