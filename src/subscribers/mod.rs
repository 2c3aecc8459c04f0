//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and built-in implementations for runtime events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Emitter / QueuedEmitter ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//!                                                                     ┌─────────┬─────────┐
//!                                                                     ▼         ▼         ▼
//!                                                                 LogWriter  Metrics   Custom
//! ```
//!
//! Subscribers are attached with [`EmitterBuilder::with_subscribers`](crate::EmitterBuilder::with_subscribers).
//! For ad-hoc inspection, [`Emitter::subscribe`](crate::Emitter::subscribe)
//! hands out a raw broadcast receiver instead.

mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
mod embedded;

pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
