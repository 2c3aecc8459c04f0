//! # Background consumer for queued dispatch.
//!
//! [`DispatchLoop`] drains the dispatch queue and spawns one independent
//! invocation per message.
//!
//! ## Flow
//! ```text
//! loop {
//!   select (biased) {
//!     stop.cancelled()       ─► exit (queued messages are abandoned)
//!     drain.cancelled()      ─► rx.close(): refuse new messages, keep consuming buffered ones
//!     in_flight.join_next()  ─► reap a finished invocation
//!     rx.recv()
//!       ├─ Some(dispatch) ─► acquire permit (optional, cancellable)
//!       │                    └─► in_flight.spawn_blocking(invoker.call(entry, args))
//!       └─ None            ─► exit (queue closed, empty and no slot reserved, or all senders dropped)
//!   }
//! }
//! return in_flight   // QueuedEmitter::shutdown may drain it within grace
//! ```
//!
//! ## Rules
//! - Handlers are synchronous closures, so invocations run on the blocking pool.
//! - Invocation outcomes go to the bus and `tracing`; nobody awaits them.
//! - `max_in_flight` caps running invocations with a semaphore; the loop stops
//!   consuming while the cap is reached.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::invoker::Invoker;
use crate::handler::{HandlerEntry, Value};

/// One admitted trigger waiting for the loop.
pub(crate) struct Dispatch {
    pub(crate) entry: Arc<HandlerEntry>,
    pub(crate) args: Vec<Value>,
}

/// Sending half of the dispatch queue.
pub(crate) type DispatchSender = mpsc::Sender<Dispatch>;

/// Receiving half of the dispatch queue.
pub(crate) type DispatchReceiver = mpsc::Receiver<Dispatch>;

/// Creates the dispatch queue; `None` means unbounded.
///
/// Both shapes are a bounded channel so that senders can reserve a slot
/// before committing to a message. "Unbounded" is the largest capacity the
/// channel supports; blocks are allocated lazily.
pub(crate) fn queue(bound: Option<usize>) -> (DispatchSender, DispatchReceiver) {
    let cap = bound.map_or(Semaphore::MAX_PERMITS, |n| n.clamp(1, Semaphore::MAX_PERMITS));
    mpsc::channel(cap)
}

pub(crate) struct DispatchLoop {
    rx: DispatchReceiver,
    invoker: Invoker,
    stop: CancellationToken,
    drain: CancellationToken,
    semaphore: Option<Arc<Semaphore>>,
}

impl DispatchLoop {
    pub(crate) fn new(
        rx: DispatchReceiver,
        invoker: Invoker,
        stop: CancellationToken,
        drain: CancellationToken,
        limit: Option<usize>,
    ) -> Self {
        Self {
            rx,
            invoker,
            stop,
            drain,
            semaphore: limit.map(Semaphore::new).map(Arc::new),
        }
    }

    /// Spawns the loop on the current Tokio runtime.
    pub(crate) fn spawn(self) -> JoinHandle<JoinSet<()>> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> JoinSet<()> {
        let mut in_flight = JoinSet::new();
        let mut draining = false;

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                _ = self.drain.cancelled(), if !draining => {
                    draining = true;
                    self.rx.close();
                }
                Some(res) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(err) = res {
                        tracing::warn!(error = %err, "invocation task did not complete");
                    }
                }
                msg = self.rx.recv() => match msg {
                    Some(d) => {
                        let Some(permit) = self.acquire().await else { break };
                        let invoker = self.invoker.clone();
                        in_flight.spawn_blocking(move || {
                            let _permit = permit;
                            let _ = invoker.call(&d.entry, d.args);
                        });
                    }
                    None => break,
                },
            }
        }

        tracing::debug!(in_flight = in_flight.len(), "dispatch loop stopped");
        in_flight
    }

    /// Waits for a free invocation slot; `None` once cancelled.
    ///
    /// Without a limit the outer `Some(None)` means "go ahead, no permit".
    async fn acquire(&self) -> Option<Option<OwnedSemaphorePermit>> {
        let Some(sem) = &self.semaphore else {
            return Some(None);
        };
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            permit = Arc::clone(sem).acquire_owned() => permit.ok().map(Some),
        }
    }
}
