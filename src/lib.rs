//! # hookbus
//!
//! **Hookbus** is an in-process registry of named event handlers.
//!
//! Handlers are ordinary closures registered under a string key, either
//! repeatable ([`Emitter::on`]) or one-shot ([`Emitter::once`]). Triggering a key
//! with a list of type-erased arguments ([`args!`]) invokes its handler, inline on
//! the caller's thread ([`Emitter`]) or on a background dispatch loop
//! ([`QueuedEmitter`]). A panicking handler never takes the caller down: the panic
//! is recovered, logged with a backtrace and reported as an error or event.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   on / once / on_any ─────────┐              send(key, args)
//!                               ▼                     │
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Hub (shared by every emitter handle)                            │
//! │  - Registry   (key → HandlerEntry, insert-if-absent)             │
//! │  - Invoker    (arity check, once claim, catch_unwind)            │
//! │  - Bus        (broadcast of runtime events)                      │
//! └──────┬──────────────────────────────────────┬────────────────────┘
//!        ▼                                      ▼
//!  Emitter::send                         QueuedEmitter::send
//!  (calls inline, returns outcome)       (queues, returns immediately)
//!                                               │
//!                                               ▼
//!                                        DispatchLoop ─► spawn_blocking(call)
//!
//!        every step ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                              ┌────┴────┐
//!                                                              ▼         ▼
//!                                                          LogWriter   custom
//! ```
//!
//! ### Trigger lifecycle
//! ```text
//! send(key, args)
//!   ├─► lookup(key)                        missing         ─► NotFound
//!   ├─► args.len() == expected_args ?      no              ─► ArgsNotMatch
//!   ├─► claim()  (call_count += 1)         once, lost race ─► NotFound
//!   ├─► once: remove from registry         (before the call, key is free again)
//!   └─► call handler inside catch_unwind
//!         ├─ returns ()/Ok      ─► HandlerInvoked
//!         ├─ returns Err(e)     ─► HandlerFailed
//!         └─ panics             ─► HandlerPanicked, RuntimePanicRecovered
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Dispatch**      | Register and trigger handlers inline or through a queue.     | [`Emitter`], [`QueuedEmitter`]            |
//! | **Handlers**      | Typed closures with fixed arity, type-erased arguments.     | [`IntoCallable`], [`Callable`], [`args!`] |
//! | **Subscriber API**| Observe registrations, invocations and failures.            | [`Subscribe`], [`Event`], [`EventKind`]   |
//! | **Errors**        | Typed errors with stable labels.                             | [`DispatchError`], [`RuntimeError`]       |
//! | **Configuration** | Bus and queue capacities, concurrency cap, grace period.     | [`Config`], [`EmitterBuilder`]            |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber, which forwards
//!   events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use hookbus::{Config, DispatchError, Emitter, args};
//!
//! fn main() -> Result<(), DispatchError> {
//!     let emitter = Emitter::with_config(Config::default());
//!     let greeted = Arc::new(AtomicUsize::new(0));
//!
//!     let g = Arc::clone(&greeted);
//!     emitter.on("greet", move |name: String| {
//!         println!("hello, {name}");
//!         g.fetch_add(1, Ordering::SeqCst);
//!     })?;
//!
//!     emitter.send("greet", args![String::from("world")])?;
//!
//!     // Wrong arity is rejected before the handler runs.
//!     let err = emitter.send("greet", args![]).unwrap_err();
//!     assert_eq!(err.as_label(), "args_not_match");
//!
//!     // Panics are recovered.
//!     emitter.once("boom", || -> () { panic!("raise") })?;
//!     let err = emitter.send("boom", args![]).unwrap_err();
//!     assert_eq!(err.as_label(), "runtime_panic_recovered");
//!
//!     assert_eq!(greeted.load(Ordering::SeqCst), 1);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod handler;
mod subscribers;

// ---- Public re-exports ----

pub use core::{Config, Emitter, EmitterBuilder, QueuedEmitter};
pub use error::{DispatchError, RuntimeError};
pub use events::{Event, EventKind};
pub use handler::{Callable, HandlerError, HandlerInfo, IntoCallable, IntoOutcome, Value};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
