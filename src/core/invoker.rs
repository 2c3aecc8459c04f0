//! # Failure-isolated invocation of one handler entry.
//!
//! Runs the callable of a [`HandlerEntry`] inside a `catch_unwind` region and
//! publishes the outcome to the [`Bus`].
//!
//! ## Flow
//! ```text
//! admit(entry, args.len())
//!   ├─ args.len() != expected_args ─► ArgsNotMatch   (no counter bump, no call)
//!   └─ entry.claim() == false ──────► NotFound       (once-handler already consumed)
//!
//! call(entry, args)
//!   ├─ Ok            ─► publish HandlerInvoked        → Ok
//!   ├─ Err(Failed)   ─► publish HandlerFailed         → HandlerFailed
//!   ├─ Err(ArgType)  ─► publish HandlerFailed         → ArgTypeMismatch
//!   └─ panic         ─► tracing::error! + backtrace
//!                       publish HandlerPanicked       → RuntimePanicRecovered
//! ```
//!
//! ## Rules
//! - A handler panic never unwinds past [`Invoker::call`].
//! - The backtrace is captured at the recovery site; the panic location itself is
//!   reported by the process panic hook.
//! - `AssertUnwindSafe` is used: state shared by the handler (e.g. `Arc<Mutex<T>>`)
//!   may be left poisoned or half-updated after a panic.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use crate::{
    error::DispatchError,
    events::{Bus, Event, EventKind},
    handler::{HandlerEntry, HandlerError, Value},
};

/// Invocation context shared by both dispatch modes.
#[derive(Clone, Debug)]
pub(crate) struct Invoker {
    bus: Bus,
    capture_backtrace: bool,
}

impl Invoker {
    pub(crate) fn new(bus: Bus, capture_backtrace: bool) -> Self {
        Self {
            bus,
            capture_backtrace,
        }
    }

    /// Pre-call checks: arity first, then the atomic claim.
    ///
    /// An arity mismatch changes nothing. A lost claim (consumed once-handler)
    /// reads as `NotFound`, the same thing a caller sees once the entry has left
    /// the registry.
    pub(crate) fn admit(&self, entry: &HandlerEntry, got: usize) -> Result<(), DispatchError> {
        entry.check_arity(got)?;
        if entry.claim() {
            Ok(())
        } else {
            Err(DispatchError::NotFound {
                key: entry.key().to_owned(),
            })
        }
    }

    /// Runs the callable inside a panic boundary.
    ///
    /// Callers must have passed [`Invoker::admit`] first.
    pub(crate) fn call(&self, entry: &HandlerEntry, args: Vec<Value>) -> Result<(), DispatchError> {
        let key = entry.key();
        let res = panic::catch_unwind(AssertUnwindSafe(|| entry.callable().call(args)));

        match res {
            Ok(Ok(())) => {
                self.bus
                    .publish(Event::new(EventKind::HandlerInvoked).with_key(key));
                Ok(())
            }
            Ok(Err(HandlerError::Failed(error))) => {
                tracing::warn!(key, %error, "handler returned an error");
                self.publish_failed(key, &error);
                Err(DispatchError::HandlerFailed {
                    key: key.to_owned(),
                    error,
                })
            }
            Ok(Err(HandlerError::ArgType { index, expected })) => {
                tracing::warn!(key, index, expected, "handler argument has unexpected type");
                self.publish_failed(key, &format!("arg #{index}: expected {expected}"));
                Err(DispatchError::ArgTypeMismatch {
                    key: key.to_owned(),
                    index,
                    expected,
                })
            }
            Err(payload) => {
                let info = panic_message(payload.as_ref());
                if self.capture_backtrace {
                    let trace = Backtrace::force_capture();
                    tracing::error!(key, panic = %info, backtrace = %trace, "[PANIC RECOVER] handler panicked");
                } else {
                    tracing::error!(key, panic = %info, "[PANIC RECOVER] handler panicked");
                }
                self.bus.publish(
                    Event::new(EventKind::HandlerPanicked)
                        .with_key(key)
                        .with_reason(info.as_str()),
                );
                Err(DispatchError::RuntimePanicRecovered {
                    key: key.to_owned(),
                    info,
                })
            }
        }
    }

    fn publish_failed(&self, key: &str, reason: &str) {
        self.bus.publish(
            Event::new(EventKind::HandlerFailed)
                .with_key(key)
                .with_reason(reason),
        );
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
