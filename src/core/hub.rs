//! # Shared state behind both emitters.
//!
//! [`Hub`] owns the [`Registry`], the event [`Bus`] and the [`Invoker`], and
//! implements the registration path and the trigger admission protocol used by
//! [`Emitter`](crate::Emitter) and [`QueuedEmitter`](crate::QueuedEmitter).
//!
//! ## Trigger admission
//! ```text
//! admit(key, n)
//!   ├─ registry.lookup(key) ─────────── missing ─► NotFound
//!   ├─ invoker.admit(entry, n)
//!   │     ├─ arity mismatch ─────────────────────► ArgsNotMatch (nothing changed)
//!   │     └─ claim lost (once) ─► remove_entry ──► NotFound
//!   ├─ once: remove_entry(key, entry) ─► publish OnceConsumed
//!   └─► Ok(entry)   (caller runs it inline or queues it)
//! ```
//!
//! ## Rules
//! - The claim is the at-most-once guard; registry removal is cleanup only.
//! - The winner removes the entry **before** the call, so the key is free for
//!   re-registration (including from inside the handler) while it runs.
//! - A once-handler that panics or fails still counts as consumed.
//! - With subscribers attached, a listener task forwards bus events to the
//!   [`SubscriberSet`]; it stops when the last emitter handle drops the hub.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    core::{config::Config, invoker::Invoker, registry::Registry},
    error::DispatchError,
    events::{Bus, Event, EventKind},
    handler::{Callable, HandlerEntry, HandlerInfo},
    subscribers::{Subscribe, SubscriberSet},
};

pub(crate) struct Hub {
    pub(crate) cfg: Config,
    pub(crate) registry: Registry,
    pub(crate) bus: Bus,
    pub(crate) invoker: Invoker,
    _listener: Option<DropGuard>,
}

impl Hub {
    pub(crate) fn new(cfg: Config) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let invoker = Invoker::new(bus.clone(), cfg.capture_backtrace);
        Self {
            cfg,
            registry: Registry::new(),
            bus,
            invoker,
            _listener: None,
        }
    }

    /// Like [`Hub::new`], plus a listener feeding `subscribers`.
    ///
    /// Spawns tasks, so it must run inside a Tokio runtime when `subscribers`
    /// is not empty.
    pub(crate) fn with_subscribers(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut hub = Self::new(cfg);
        if !subscribers.is_empty() {
            let token = CancellationToken::new();
            let set = SubscriberSet::new(subscribers, hub.bus.clone());
            subscriber_listener(hub.bus.subscribe(), set, token.clone());
            hub._listener = Some(token.drop_guard());
        }
        hub
    }

    /// Creates a fresh entry and inserts it if `key` is free.
    pub(crate) fn register(
        &self,
        key: String,
        once: bool,
        callable: Callable,
    ) -> Result<(), DispatchError> {
        if key.is_empty() {
            return Err(DispatchError::EmptyKey);
        }
        let entry = self
            .registry
            .register(HandlerEntry::new(key, once, callable))?;

        tracing::debug!(key = entry.key(), once, args = entry.expected_args(), "handler registered");
        self.bus.publish(
            Event::new(EventKind::HandlerRegistered)
                .with_key(entry.key())
                .with_args(entry.expected_args())
                .with_once(once),
        );
        Ok(())
    }

    /// Registers a late-bound value; only a [`Callable`] is accepted.
    pub(crate) fn register_any(
        &self,
        key: String,
        once: bool,
        value: Box<dyn Any + Send + Sync>,
    ) -> Result<(), DispatchError> {
        if key.is_empty() {
            return Err(DispatchError::EmptyKey);
        }
        match value.downcast::<Callable>() {
            Ok(callable) => self.register(key, once, *callable),
            Err(_) => Err(DispatchError::NotCallable { key }),
        }
    }

    pub(crate) fn remove(&self, key: &str) {
        if self.registry.remove(key) {
            tracing::debug!(key, "handler removed");
            self.bus
                .publish(Event::new(EventKind::HandlerRemoved).with_key(key));
        }
    }

    /// Removes every key present at call time, one `HandlerRemoved` each.
    pub(crate) fn clear(&self) {
        let mut n = 0;
        for key in self.registry.keys() {
            if self.registry.remove(&key) {
                n += 1;
                self.bus
                    .publish(Event::new(EventKind::HandlerRemoved).with_key(key));
            }
        }
        tracing::debug!(removed = n, "registry cleared");
    }

    /// Looks up `key` and admits one trigger with `got` arguments.
    pub(crate) fn admit(&self, key: &str, got: usize) -> Result<Arc<HandlerEntry>, DispatchError> {
        let entry = match self.registry.lookup(key) {
            Ok(entry) => entry,
            Err(err) => return Err(self.reject(err, got)),
        };

        if let Err(err) = self.invoker.admit(&entry, got) {
            if matches!(err, DispatchError::NotFound { .. }) {
                self.registry.remove_entry(key, &entry);
            }
            return Err(self.reject(err, got));
        }

        if entry.once() && self.registry.remove_entry(key, &entry) {
            self.bus
                .publish(Event::new(EventKind::OnceConsumed).with_key(key));
        }
        Ok(entry)
    }

    pub(crate) fn info(&self, key: &str) -> Option<HandlerInfo> {
        self.registry.lookup(key).ok().map(|e| e.info())
    }

    /// Publishes `TriggerRejected` and hands the error back.
    pub(crate) fn reject(&self, err: DispatchError, got: usize) -> DispatchError {
        let mut ev = Event::new(EventKind::TriggerRejected)
            .with_reason(err.as_label())
            .with_args(got);
        if let Some(key) = err.key() {
            ev = ev.with_key(key);
        }
        self.bus.publish(ev);
        err
    }
}

/// Forwards bus events to `set` until `token` is cancelled.
///
/// Events already buffered at cancellation are still forwarded, then the
/// subscriber workers are drained.
fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "subscriber listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        set.emit(&ev);
                    }
                    break;
                }
            }
        }
        set.shutdown().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> Hub {
        Hub::new(Config {
            capture_backtrace: false,
            ..Config::default()
        })
    }

    #[test]
    fn empty_key_is_rejected() {
        let hub = hub();
        assert_eq!(
            hub.register(String::new(), false, Callable::from_fn(|| {})),
            Err(DispatchError::EmptyKey)
        );
        assert!(hub.registry.is_empty());
    }

    #[test]
    fn non_callable_value_is_rejected() {
        let hub = hub();
        let err = hub
            .register_any("n".into(), false, Box::new(42_u32))
            .unwrap_err();
        assert_eq!(err, DispatchError::NotCallable { key: "n".into() });

        let ok = hub.register_any("f".into(), false, Box::new(Callable::from_fn(|| {})));
        assert!(ok.is_ok());
    }

    #[test]
    fn admit_once_removes_entry() {
        let hub = hub();
        let mut rx = hub.bus.subscribe();
        hub.register("g".into(), true, Callable::from_fn(|| {})).unwrap();

        let entry = hub.admit("g", 0).unwrap();
        assert!(entry.once());
        assert!(!hub.registry.contains("g"));

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![EventKind::HandlerRegistered, EventKind::OnceConsumed]);
    }

    #[test]
    fn arity_mismatch_keeps_once_entry() {
        let hub = hub();
        hub.register("g".into(), true, Callable::from_fn(|_: i32| {})).unwrap();

        let err = hub.admit("g", 0).unwrap_err();
        assert_eq!(err.as_label(), "args_not_match");
        assert!(hub.registry.contains("g"));
        assert_eq!(hub.info("g").map(|i| i.call_count), Some(0));
    }

    #[test]
    fn rejected_trigger_is_published() {
        let hub = hub();
        let mut rx = hub.bus.subscribe();
        let _ = hub.admit("missing", 2);

        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::TriggerRejected);
        assert_eq!(ev.key.as_deref(), Some("missing"));
        assert_eq!(ev.reason.as_deref(), Some("not_found"));
        assert_eq!(ev.args, Some(2));
    }

    #[test]
    fn clear_publishes_removal_per_key() {
        let hub = hub();
        hub.register("a".into(), false, Callable::from_fn(|| {})).unwrap();
        hub.register("b".into(), true, Callable::from_fn(|| {})).unwrap();
        let mut rx = hub.bus.subscribe();

        hub.clear();
        assert!(hub.registry.is_empty());

        let removed: Vec<(EventKind, Option<String>)> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| (e.kind, e.key.as_deref().map(str::to_owned)))
            .collect();
        assert_eq!(
            removed,
            vec![
                (EventKind::HandlerRemoved, Some("a".to_owned())),
                (EventKind::HandlerRemoved, Some("b".to_owned())),
            ]
        );

        hub.clear();
        assert!(rx.try_recv().is_err());
    }
}
