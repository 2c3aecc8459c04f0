//! # Emitter: synchronous dispatch facade.
//!
//! [`Emitter`] runs handlers inline: `send` looks the key up, admits the trigger
//! and calls the handler on the caller's thread, returning the real outcome.
//!
//! ## Architecture
//! ```text
//! Emitter::on/once ──► Hub::register ──► Registry (insert-if-absent)
//!
//! Emitter::send(key, args)
//!   └─► Hub::admit(key, n) ──► lookup ─► arity ─► claim ─► (once: remove)
//!         └─► Invoker::call(entry, args)   (catch_unwind, same thread)
//!               ├─ Ok                      → Ok(())
//!               └─ panic / error           → Err(RuntimePanicRecovered | HandlerFailed | ..)
//! ```
//!
//! ## Rules
//! - No background tasks are needed for dispatch; an emitter built without
//!   subscribers works outside any async runtime.
//! - All operations are safe from any number of threads; `Emitter` is a cheap `Clone`.
//! - Concurrent sends to the same repeatable key may run the handler concurrently.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    core::{builder::EmitterBuilder, config::Config, hub::Hub},
    error::DispatchError,
    events::Event,
    handler::{HandlerInfo, IntoCallable, Value},
};

/// In-process registry of named handlers with inline dispatch.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use hookbus::{DispatchError, Emitter, args};
///
/// let emitter = Emitter::new();
/// let total = Arc::new(AtomicI32::new(0));
///
/// let t = Arc::clone(&total);
/// emitter.on("add", move |a: i32, b: i32| {
///     t.fetch_add(a + b, Ordering::SeqCst);
/// })?;
/// emitter.send("add", args![1, 2])?;
/// emitter.send("add", args![1, 2])?;
/// assert_eq!(total.load(Ordering::SeqCst), 6);
///
/// emitter.once("greet", || println!("hello"))?;
/// emitter.send("greet", args![])?;
/// assert!(matches!(
///     emitter.send("greet", args![]),
///     Err(DispatchError::NotFound { .. })
/// ));
/// # Ok::<(), DispatchError>(())
/// ```
#[derive(Clone)]
pub struct Emitter {
    hub: Arc<Hub>,
}

impl Emitter {
    /// Creates an emitter with [`Config::default`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an emitter with the given configuration.
    pub fn with_config(cfg: Config) -> Self {
        Self::from_hub(Arc::new(Hub::new(cfg)))
    }

    /// Returns a builder for attaching subscribers or choosing queued dispatch.
    pub fn builder(cfg: Config) -> EmitterBuilder {
        EmitterBuilder::new(cfg)
    }

    pub(crate) fn from_hub(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    /// Registers a repeatable handler under `key`.
    ///
    /// Fails with [`DispatchError::AlreadyExists`] if `key` is taken and with
    /// [`DispatchError::EmptyKey`] for `""`.
    pub fn on<Args, F>(&self, key: impl Into<String>, f: F) -> Result<(), DispatchError>
    where
        F: IntoCallable<Args>,
    {
        self.hub.register(key.into(), false, f.into_callable())
    }

    /// Registers a one-shot handler under `key`; it runs at most once and then disappears.
    pub fn once<Args, F>(&self, key: impl Into<String>, f: F) -> Result<(), DispatchError>
    where
        F: IntoCallable<Args>,
    {
        self.hub.register(key.into(), true, f.into_callable())
    }

    /// Registers a late-bound repeatable handler.
    ///
    /// `value` must be a [`Callable`](crate::Callable); anything else fails with
    /// [`DispatchError::NotCallable`].
    pub fn on_any(
        &self,
        key: impl Into<String>,
        value: Box<dyn Any + Send + Sync>,
    ) -> Result<(), DispatchError> {
        self.hub.register_any(key.into(), false, value)
    }

    /// Registers a late-bound one-shot handler. See [`Emitter::on_any`].
    pub fn once_any(
        &self,
        key: impl Into<String>,
        value: Box<dyn Any + Send + Sync>,
    ) -> Result<(), DispatchError> {
        self.hub.register_any(key.into(), true, value)
    }

    /// Triggers `key` with `args` and runs the handler on the current thread.
    ///
    /// ### Outcomes
    /// - `Ok(())`: the handler ran to completion
    /// - `NotFound`: no live handler (including a consumed once-handler)
    /// - `ArgsNotMatch`: wrong argument count; nothing changed, handler not called
    /// - `RuntimePanicRecovered`: the handler panicked; the panic did not propagate
    /// - `HandlerFailed` / `ArgTypeMismatch`: the handler returned an error or
    ///   could not accept an argument's type
    pub fn send(&self, key: &str, args: Vec<Value>) -> Result<(), DispatchError> {
        let entry = self.hub.admit(key, args.len())?;
        self.hub.invoker.call(&entry, args)
    }

    /// Removes `key`; a missing key is a no-op.
    pub fn remove(&self, key: &str) {
        self.hub.remove(key);
    }

    /// Removes every handler, publishing `HandlerRemoved` for each key.
    pub fn clear(&self) {
        self.hub.clear();
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

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}
