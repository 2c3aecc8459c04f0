//! # Example: queued
//!
//! Background dispatch with [`QueuedEmitter`], a custom subscriber and the
//! built-in [`LogWriter`].
//!
//! Demonstrates how to:
//! - Build a queued emitter with [`EmitterBuilder`] and subscribers.
//! - Implement the [`Subscribe`] trait to count outcomes.
//! - Shut down gracefully, draining queued messages within the grace period.
//!
//! ## Flow
//! ```text
//! EmitterBuilder::build_queued()
//!     ├─► QueuedEmitter::send() ──► Hub::admit ──► queue
//!     │                                               └─► DispatchLoop ──► handler
//!     ├─► Bus ──► listener ──► SubscriberSet ──► LogWriter / Tally
//!     └─► shutdown() ──► drain queue ──► wait in-flight ──► AllStoppedWithin
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example queued --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hookbus::{Config, EmitterBuilder, Event, EventKind, LogWriter, Subscribe, args};
use tracing_subscriber::EnvFilter;

/// Counts invocation outcomes.
#[derive(Default)]
struct Tally {
    ok: AtomicUsize,
    failed: AtomicUsize,
}

#[async_trait::async_trait]
impl Subscribe for Tally {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::HandlerInvoked => {
                self.ok.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::HandlerFailed | EventKind::HandlerPanicked => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "tally"
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1. Bounded queue, at most 4 handlers running at once.
    let cfg = Config {
        queue_capacity: 64,
        max_in_flight: 4,
        grace: Duration::from_secs(5),
        capture_backtrace: false,
        ..Config::default()
    };

    let tally = Arc::new(Tally::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![
        Arc::new(LogWriter::new()) as Arc<dyn Subscribe>,
        tally.clone(),
    ];
    let emitter = EmitterBuilder::new(cfg).with_subscribers(subs).build_queued();

    // 2. Handlers are plain closures; they run on the blocking pool.
    emitter.on("work", |id: u32, ms: u64| {
        std::thread::sleep(Duration::from_millis(ms));
        println!("[work] job {id} done after {ms}ms");
    })?;
    emitter.once("flaky", || -> () { panic!("flaky handler") })?;

    // 3. `send` returns once the message is queued.
    for id in 0..8_u32 {
        emitter.send("work", args![id, 20_u64 * u64::from(id % 3)]).await?;
    }
    emitter.send("flaky", args![]).await?;

    // Synchronous failures are still reported to the sender.
    if let Err(err) = emitter.send("missing", args![]).await {
        println!("[error] {}: {err}", err.as_label());
    }

    // 4. Drain the queue and wait for running handlers.
    emitter.shutdown().await?;
    drop(emitter);

    tokio::time::sleep(Duration::from_millis(50)).await;
    println!(
        "ok={} failed={}",
        tally.ok.load(Ordering::Relaxed),
        tally.failed.load(Ordering::Relaxed)
    );
    Ok(())
}
