//! # LogWriter: event logger
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing` records.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output
//! ```text
//! INFO  hookbus: [registered] key="greet" args=1 once=false
//! DEBUG hookbus: [invoked] key="greet"
//! WARN  hookbus: [rejected] key="greet" reason="args_not_match" args=2
//! ERROR hookbus: [handler-panicked] key="boom" info="raise"
//! INFO  hookbus: [shutdown-requested]
//! INFO  hookbus: [all-stopped-within-grace]
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

const TARGET: &str = "hookbus";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let key = e.key.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::HandlerRegistered => {
                tracing::info!(target: TARGET, key, args = e.args, once = e.once, "[registered]");
            }
            EventKind::HandlerRemoved => {
                tracing::info!(target: TARGET, key, "[removed]");
            }
            EventKind::OnceConsumed => {
                tracing::debug!(target: TARGET, key, "[once-consumed]");
            }
            EventKind::DispatchQueued => {
                tracing::trace!(target: TARGET, key, args = e.args, "[queued]");
            }
            EventKind::HandlerInvoked => {
                tracing::debug!(target: TARGET, key, "[invoked]");
            }
            EventKind::TriggerRejected => {
                tracing::warn!(target: TARGET, key, reason, args = e.args, "[rejected]");
            }
            EventKind::HandlerFailed => {
                tracing::warn!(target: TARGET, key, reason, "[handler-failed]");
            }
            EventKind::HandlerPanicked => {
                tracing::error!(target: TARGET, key, info = reason, "[handler-panicked]");
            }
            EventKind::CloseRequested => {
                tracing::info!(target: TARGET, "[close-requested]");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: TARGET, "[shutdown-requested]");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!(target: TARGET, "[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(target: TARGET, reason, "[grace-exceeded]");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: TARGET, subscriber = key, reason, "[subscriber-overflow]");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: TARGET, subscriber = key, info = reason, "[subscriber-panicked]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
