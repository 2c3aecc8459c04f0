//! Runtime core: registry, invocation and dispatch.
//!
//! The public API from this module is [`Emitter`], [`QueuedEmitter`],
//! [`EmitterBuilder`] and [`Config`].
//!
//! Internal modules:
//! - [`registry`]: key → handler entry map with atomic insert-if-absent;
//! - [`invoker`]: arity check, once claim and panic-isolated call;
//! - [`hub`]: state shared by both emitters and the admission protocol;
//! - [`dispatch_loop`]: background consumer for queued dispatch;
//! - [`emitter`] / [`queued`]: the two dispatch facades.

mod builder;
mod config;
mod dispatch_loop;
mod emitter;
mod hub;
mod invoker;
mod queued;
mod registry;

pub(crate) use invoker::panic_message;

pub use builder::EmitterBuilder;
pub use config::Config;
pub use emitter::Emitter;
pub use queued::QueuedEmitter;
