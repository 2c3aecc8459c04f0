//! # QueuedEmitter: asynchronous dispatch facade.
//!
//! [`QueuedEmitter`] shares registration semantics with [`Emitter`](crate::Emitter)
//! but hands admitted triggers to a background [`DispatchLoop`] instead of
//! running them inline.
//!
//! ## Architecture
//! ```text
//! QueuedEmitter::send(key, args)
//!   ├─► queue.reserve()          waits for space; Closed if the loop is going away
//!   ├─► Hub::admit(key, n)       NotFound / ArgsNotMatch reported here
//!   └─► permit.send(Dispatch)    returns as soon as the message is queued
//!                                   │
//!                                   ▼
//!                    DispatchLoop ─► spawn_blocking(Invoker::call)
//!                                       └─► outcome → Bus + tracing only
//!
//! close()     ─► stop.cancel()   (loop stops consuming; nothing is awaited)
//! shutdown()  ─► drain.cancel()  (new sends refused, queued messages still consumed)
//!               ─► join loop ─► wait in-flight        (both bounded by cfg.grace)
//!                     ├─ all done  → publish AllStoppedWithin, Ok
//!                     └─ timed out → stop.cancel(), publish GraceExceeded, Err(GraceExceeded)
//!               concurrent and later calls wait for and return the first call's result
//! ```
//!
//! ## Rules
//! - `send` cannot observe the handler outcome; only lookup, arity and
//!   once-claim failures are synchronous.
//! - A once-handler is claimed at `send` time, so among concurrent senders exactly
//!   one gets `Ok` and the rest get `NotFound`.
//! - Queue space is reserved before the handler is claimed: a `send` that fails
//!   with `Closed` leaves the registry untouched.
//! - After `close()`, queued-but-unconsumed messages and running invocations are
//!   not guaranteed to complete; a claimed once-handler whose message is
//!   abandoned never runs. Use `shutdown()` to drain the queue and wait for
//!   in-flight work.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OnceCell, broadcast};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::Config,
        dispatch_loop::{self, Dispatch, DispatchLoop, DispatchSender},
        hub::Hub,
    },
    error::{DispatchError, RuntimeError},
    events::{Event, EventKind},
    handler::{HandlerInfo, IntoCallable, Value},
};

/// Named handler registry with queued, background dispatch.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use hookbus::{Config, QueuedEmitter, args};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let emitter = QueuedEmitter::new(Config::default());
///     let total = Arc::new(AtomicI32::new(0));
///
///     let t = Arc::clone(&total);
///     emitter.on("add", move |a: i32, b: i32| {
///         t.fetch_add(a + b, Ordering::SeqCst);
///     })?;
///     emitter.send("add", args![1, 2]).await?;
///
///     emitter.shutdown().await?;
///     assert_eq!(total.load(Ordering::SeqCst), 3);
///     Ok(())
/// }
/// ```
pub struct QueuedEmitter {
    hub: Arc<Hub>,
    tx: DispatchSender,
    stop: CancellationToken,
    drain: CancellationToken,
    join: Mutex<Option<JoinHandle<JoinSet<()>>>>,
    outcome: OnceCell<Result<(), RuntimeError>>,
}

impl QueuedEmitter {
    /// Creates a queued emitter and spawns its dispatch loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(cfg: Config) -> Self {
        Self::from_hub(Arc::new(Hub::new(cfg)))
    }

    pub(crate) fn from_hub(hub: Arc<Hub>) -> Self {
        let (tx, rx) = dispatch_loop::queue(hub.cfg.queue_bound());
        let stop = CancellationToken::new();
        let drain = CancellationToken::new();
        let join = DispatchLoop::new(
            rx,
            hub.invoker.clone(),
            stop.clone(),
            drain.clone(),
            hub.cfg.concurrency_limit(),
        )
        .spawn();

        Self {
            hub,
            tx,
            stop,
            drain,
            join: Mutex::new(Some(join)),
            outcome: OnceCell::new(),
        }
    }

    /// Registers a repeatable handler under `key`.
    pub fn on<Args, F>(&self, key: impl Into<String>, f: F) -> Result<(), DispatchError>
    where
        F: IntoCallable<Args>,
    {
        self.hub.register(key.into(), false, f.into_callable())
    }

    /// Registers a one-shot handler under `key`.
    pub fn once<Args, F>(&self, key: impl Into<String>, f: F) -> Result<(), DispatchError>
    where
        F: IntoCallable<Args>,
    {
        self.hub.register(key.into(), true, f.into_callable())
    }

    /// Registers a late-bound repeatable handler; see [`Emitter::on_any`](crate::Emitter::on_any).
    pub fn on_any(
        &self,
        key: impl Into<String>,
        value: Box<dyn Any + Send + Sync>,
    ) -> Result<(), DispatchError> {
        self.hub.register_any(key.into(), false, value)
    }

    /// Registers a late-bound one-shot handler.
    pub fn once_any(
        &self,
        key: impl Into<String>,
        value: Box<dyn Any + Send + Sync>,
    ) -> Result<(), DispatchError> {
        self.hub.register_any(key.into(), true, value)
    }

    /// Admits a trigger and queues it for the dispatch loop.
    ///
    /// Returns once the message is queued (waiting for space if the queue is
    /// bounded and full). Fails with [`DispatchError::Closed`] after `close()`
    /// or `shutdown()`, including while waiting for space; the handler is not
    /// claimed in that case.
    pub async fn send(&self, key: &str, args: Vec<Value>) -> Result<(), DispatchError> {
        let n = args.len();
        if self.is_closed() {
            return Err(self.hub.reject(DispatchError::Closed, n));
        }

        let permit = tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            permit = self.tx.reserve() => permit.ok(),
        };
        let Some(permit) = permit.filter(|_| !self.is_closed()) else {
            return Err(self.hub.reject(DispatchError::Closed, n));
        };

        let entry = self.hub.admit(key, n)?;
        permit.send(Dispatch { entry, args });
        self.hub.bus.publish(
            Event::new(EventKind::DispatchQueued)
                .with_key(key)
                .with_args(n),
        );
        Ok(())
    }

    /// Removes `key`; a missing key is a no-op.
    pub fn remove(&self, key: &str) {
        self.hub.remove(key);
    }

    /// Removes every handler, publishing `HandlerRemoved` for each key.
    pub fn clear(&self) {
        self.hub.clear();
    }

    /// Signals the dispatch loop to stop consuming. Idempotent and non-blocking.
    ///
    /// Messages still queued are abandoned.
    pub fn close(&self) {
        if !self.stop.is_cancelled() {
            self.stop.cancel();
            tracing::debug!("queued emitter close requested");
            self.hub.bus.publish(Event::new(EventKind::CloseRequested));
        }
    }

    /// Returns true once `close()` or `shutdown()` was called, or the loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.stop.is_cancelled() || self.drain.is_cancelled() || self.tx.is_closed()
    }

    /// Refuses new sends, drains the queue and waits for in-flight invocations.
    ///
    /// The whole sequence gets up to [`Config::grace`]. On timeout the loop is
    /// stopped, queued messages are dropped, running invocations are detached and
    /// the count is reported through [`RuntimeError::GraceExceeded`].
    ///
    /// The sequence runs once. Concurrent callers wait for it, and every call
    /// returns the same result.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.outcome
            .get_or_init(|| self.run_shutdown())
            .await
            .clone()
    }

    async fn run_shutdown(&self) -> Result<(), RuntimeError> {
        if !self.drain.is_cancelled() {
            self.drain.cancel();
            tracing::debug!("queued emitter shutdown requested");
            self.hub.bus.publish(Event::new(EventKind::ShutdownRequested));
        }

        let join = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut join) = join else {
            return Ok(());
        };

        let grace = self.hub.cfg.grace;
        let deadline = Instant::now() + grace;
        let joined = match tokio::time::timeout_at(deadline, &mut join).await {
            Ok(joined) => joined,
            Err(_elapsed) => {
                self.stop.cancel();
                join.await
            }
        };
        let mut in_flight = match joined {
            Ok(set) => set,
            Err(err) => {
                tracing::warn!(error = %err, "dispatch loop did not finish cleanly");
                return Ok(());
            }
        };

        match tokio::time::timeout_at(deadline, drain(&mut in_flight)).await {
            Ok(()) => {
                self.hub.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let n = in_flight.len();
                self.hub.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(format!("in_flight={n}")),
                );
                in_flight.detach_all();
                Err(RuntimeError::GraceExceeded {
                    grace,
                    in_flight: n,
                })
            }
        }
    }

    /// Returns true if `key` has a live handler.
    pub fn contains(&self, key: &str) -> bool {
        self.hub.registry.contains(key)
    }

    /// Returns a snapshot of the handler registered under `key`.
    pub fn info(&self, key: &str) -> Option<HandlerInfo> {
        self.hub.info(key)
    }

    /// Returns sorted list of registered keys.
    pub fn keys(&self) -> Vec<String> {
        self.hub.registry.keys()
    }

    /// Number of live handlers.
    pub fn len(&self) -> usize {
        self.hub.registry.len()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.hub.registry.is_empty()
    }

    /// Creates a receiver of runtime [`Event`]s published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.hub.bus.subscribe()
    }

    /// Returns the configuration this emitter was built with.
    pub fn config(&self) -> &Config {
        &self.hub.cfg
    }
}

async fn drain(set: &mut JoinSet<()>) {
    while set.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn cfg() -> Config {
        Config {
            capture_backtrace: false,
            ..Config::default()
        }
    }

    async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Ok(ev) if ev.kind == kind => return ev,
                    Ok(_) => continue,
                    Err(err) => panic!("bus closed: {err}"),
                }
            }
        })
        .await
        .expect("event not observed in time")
    }

    async fn wait_started(started: &AtomicUsize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while started.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("handler did not start in time");
    }

    /// Handler that holds its pool thread until `gate` opens.
    fn gated(gate: &Arc<AtomicBool>, started: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
        let (g, s) = (Arc::clone(gate), Arc::clone(started));
        move || {
            s.fetch_add(1, Ordering::SeqCst);
            while !g.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    fn counter(hits: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
        let h = Arc::clone(hits);
        move || {
            h.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn send_runs_handler_in_background() {
        let em = QueuedEmitter::new(cfg());
        let mut rx = em.subscribe();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        em.on("add", move |a: usize, b: usize| {
            h.fetch_add(a + b, Ordering::SeqCst);
        })
        .unwrap();

        em.send("add", args![1_usize, 2_usize]).await.unwrap();
        wait_for(&mut rx, EventKind::HandlerInvoked).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn synchronous_errors_are_reported() {
        let em = QueuedEmitter::new(cfg());
        em.on("add", |_: i32, _: i32| {}).unwrap();

        assert_eq!(
            em.send("missing", args![]).await,
            Err(DispatchError::NotFound { key: "missing".into() })
        );
        assert_eq!(
            em.send("add", args![1]).await.unwrap_err().as_label(),
            "args_not_match"
        );
        assert_eq!(em.on("add", || {}).unwrap_err().as_label(), "already_exists");
    }

    #[tokio::test]
    async fn panic_is_not_visible_to_sender() {
        let em = QueuedEmitter::new(cfg());
        let mut rx = em.subscribe();
        em.once("boom", || -> () { panic!("raise") }).unwrap();

        assert_eq!(em.send("boom", args![]).await, Ok(()));
        let ev = wait_for(&mut rx, EventKind::HandlerPanicked).await;
        assert_eq!(ev.key.as_deref(), Some("boom"));
        assert!(matches!(
            em.send("boom", args![]).await,
            Err(DispatchError::NotFound { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_once_is_claimed_once() {
        const N: usize = 16;
        let em = Arc::new(QueuedEmitter::new(cfg()));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        em.once("only", move || {
            h.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let mut set = JoinSet::new();
        for _ in 0..N {
            let em = Arc::clone(&em);
            set.spawn(async move { em.send("only", args![]).await });
        }
        let mut ok = 0;
        while let Some(res) = set.join_next().await {
            match res.unwrap() {
                Ok(()) => ok += 1,
                Err(err) => assert_eq!(err.as_label(), "not_found"),
            }
        }

        em.shutdown().await.unwrap();
        assert_eq!(ok, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_after_close_is_closed() {
        let em = QueuedEmitter::new(cfg());
        em.on("k", || {}).unwrap();
        em.close();
        em.close();

        assert!(em.is_closed());
        assert_eq!(em.send("k", args![]).await, Err(DispatchError::Closed));
        assert!(em.shutdown().await.is_ok());
        assert!(em.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn shutdown_waits_for_in_flight() {
        let em = QueuedEmitter::new(cfg());
        let mut rx = em.subscribe();
        let started = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let (s, d) = (Arc::clone(&started), Arc::clone(&done));
        em.on("slow", move || {
            s.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            d.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        em.send("slow", args![]).await.unwrap();
        wait_started(&started).await;
        em.shutdown().await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 1);
        wait_for(&mut rx, EventKind::AllStoppedWithin).await;
    }

    #[tokio::test]
    async fn shutdown_drains_queued_messages() {
        let em = QueuedEmitter::new(Config {
            max_in_flight: 1,
            ..cfg()
        });
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        em.on("k", move || {
            h.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        for _ in 0..8 {
            em.send("k", args![]).await.unwrap();
        }
        em.shutdown().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 8);
        assert!(em.is_closed());
        assert_eq!(em.send("k", args![]).await, Err(DispatchError::Closed));
    }

    #[tokio::test]
    async fn shutdown_reports_grace_exceeded() {
        let em = QueuedEmitter::new(Config {
            grace: Duration::from_millis(10),
            ..cfg()
        });
        let started = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&started);
        em.on("stuck", move || {
            s.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
        })
        .unwrap();

        em.send("stuck", args![]).await.unwrap();
        wait_started(&started).await;
        match em.shutdown().await {
            Err(RuntimeError::GraceExceeded { in_flight, .. }) => assert_eq!(in_flight, 1),
            other => panic!("unexpected shutdown result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bounded_queue_accepts_sends() {
        let em = QueuedEmitter::new(Config {
            queue_capacity: 1,
            max_in_flight: 1,
            ..cfg()
        });
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        em.on("k", move || {
            h.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let mut rx = em.subscribe();
        for _ in 0..5 {
            em.send("k", args![]).await.unwrap();
        }
        for _ in 0..5 {
            wait_for(&mut rx, EventKind::HandlerInvoked).await;
        }
        em.shutdown().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn close_while_waiting_for_space_keeps_once_handler() {
        let em = Arc::new(QueuedEmitter::new(Config {
            queue_capacity: 1,
            max_in_flight: 1,
            ..cfg()
        }));
        let gate = Arc::new(AtomicBool::new(false));
        let started = Arc::new(AtomicUsize::new(0));
        let hits = Arc::new(AtomicUsize::new(0));
        em.on("slow", gated(&gate, &started)).unwrap();
        em.once("greet", counter(&hits)).unwrap();

        // One running, one waiting for a slot, one filling the queue.
        for _ in 0..3 {
            em.send("slow", args![]).await.unwrap();
        }
        let sender = Arc::clone(&em);
        let blocked = tokio::spawn(async move { sender.send("greet", args![]).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());

        em.close();
        let res = blocked.await.unwrap();
        gate.store(true, Ordering::SeqCst);

        assert_eq!(res, Err(DispatchError::Closed));
        assert!(em.contains("greet"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_shutdown_waits_for_the_first() {
        let em = QueuedEmitter::new(cfg());
        let gate = Arc::new(AtomicBool::new(false));
        let started = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let (g, s, d) = (Arc::clone(&gate), Arc::clone(&started), Arc::clone(&done));
        em.on("slow", move || {
            s.fetch_add(1, Ordering::SeqCst);
            while !g.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            d.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        em.send("slow", args![]).await.unwrap();
        wait_started(&started).await;

        let release = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            gate.store(true, Ordering::SeqCst);
        };
        let first = async {
            let res = em.shutdown().await;
            (res.is_ok(), done.load(Ordering::SeqCst))
        };
        let second = async {
            tokio::task::yield_now().await;
            let res = em.shutdown().await;
            (res.is_ok(), done.load(Ordering::SeqCst))
        };
        let ((), a, b) = tokio::join!(release, first, second);

        assert_eq!(a, (true, 1));
        assert_eq!(b, (true, 1));
    }

    #[tokio::test]
    async fn repeated_shutdown_returns_first_outcome() {
        let em = QueuedEmitter::new(Config {
            grace: Duration::from_millis(10),
            ..cfg()
        });
        let gate = Arc::new(AtomicBool::new(false));
        let started = Arc::new(AtomicUsize::new(0));
        em.on("stuck", gated(&gate, &started)).unwrap();

        em.send("stuck", args![]).await.unwrap();
        wait_started(&started).await;
        let first = em.shutdown().await;
        let second = em.shutdown().await;
        gate.store(true, Ordering::SeqCst);

        assert!(matches!(first, Err(RuntimeError::GraceExceeded { in_flight: 1, .. })));
        assert!(matches!(second, Err(RuntimeError::GraceExceeded { in_flight: 1, .. })));
    }

    #[tokio::test]
    async fn close_abandons_queued_messages() {
        let em = QueuedEmitter::new(Config {
            max_in_flight: 1,
            ..cfg()
        });
        let gate = Arc::new(AtomicBool::new(false));
        let started = Arc::new(AtomicUsize::new(0));
        let hits = Arc::new(AtomicUsize::new(0));
        em.on("slow", gated(&gate, &started)).unwrap();
        em.on("tick", counter(&hits)).unwrap();
        em.once("greet", counter(&hits)).unwrap();

        em.send("slow", args![]).await.unwrap();
        wait_started(&started).await;
        em.send("tick", args![]).await.unwrap();
        em.send("greet", args![]).await.unwrap();
        assert!(!em.contains("greet"));

        em.close();
        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.store(true, Ordering::SeqCst);
        em.shutdown().await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!em.contains("greet"));
        assert_eq!(em.send("tick", args![]).await, Err(DispatchError::Closed));
    }
}
