//! # Handler abstractions.
//!
//! This module provides the handler-side types:
//! - [`Value`] - a type-erased argument (`Box<dyn Any + Send>`), built with [`args!`](crate::args)
//! - [`Callable`] - a fixed-arity, type-erased handler closure
//! - [`IntoCallable`] - conversion from typed closures (`Fn(A, B, ..) -> R`) into [`Callable`]
//! - [`HandlerEntry`] - registry record: key, once flag, callable, arity and call counter
//! - [`HandlerInfo`] - read-only snapshot of an entry

mod callable;
mod entry;
mod value;

pub use callable::{Callable, HandlerError, IntoCallable, IntoOutcome};
pub use entry::{HandlerEntry, HandlerInfo};
pub use value::Value;
