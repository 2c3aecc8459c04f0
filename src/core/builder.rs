use std::sync::Arc;

use crate::{
    core::{Config, Emitter, QueuedEmitter, hub::Hub},
    subscribers::Subscribe,
};

/// Builder for constructing an emitter with optional event subscribers.
pub struct EmitterBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl EmitterBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (registrations, invocations, failures)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds a synchronous [`Emitter`].
    ///
    /// Needs a Tokio runtime only when subscribers were set (their workers are
    /// spawned here).
    pub fn build(self) -> Emitter {
        Emitter::from_hub(Arc::new(Hub::with_subscribers(self.cfg, self.subscribers)))
    }

    /// Builds a [`QueuedEmitter`] and spawns its dispatch loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build_queued(self) -> QueuedEmitter {
        QueuedEmitter::from_hub(Arc::new(Hub::with_subscribers(self.cfg, self.subscribers)))
    }
}
