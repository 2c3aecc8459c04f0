//! # Example: basic
//!
//! Synchronous dispatch with [`Emitter`]: no runtime, no subscribers.
//!
//! Demonstrates how to:
//! - Register repeatable and one-shot handlers with typed parameters.
//! - Trigger them with [`args!`] and inspect the typed errors.
//! - Recover from a panicking handler.
//!
//! ## Flow
//! ```text
//! Emitter::on("add") ──► send("add", [1, 2]) ──► handler runs inline ──► Ok
//! Emitter::once("hello") ──► send ──► Ok ──► send ──► NotFound
//! Emitter::on("boom") ──► send ──► panic recovered ──► RuntimePanicRecovered
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use hookbus::{Config, DispatchError, Emitter, args};

fn main() -> Result<(), DispatchError> {
    // 1. Keep the panic output short.
    let cfg = Config {
        capture_backtrace: false,
        ..Config::default()
    };
    let emitter = Emitter::with_config(cfg);

    // 2. Repeatable handler with two typed parameters.
    let total = Arc::new(AtomicI64::new(0));
    let t = Arc::clone(&total);
    emitter.on("add", move |a: i64, b: i64| {
        let sum = t.fetch_add(a + b, Ordering::SeqCst) + a + b;
        println!("[add] {a} + {b} (total {sum})");
    })?;

    emitter.send("add", args![1_i64, 2_i64])?;
    emitter.send("add", args![10_i64, 20_i64])?;

    // 3. Arity is checked before the handler runs.
    if let Err(err) = emitter.send("add", args![1_i64]) {
        println!("[error] {}: {err}", err.as_label());
    }

    // 4. One-shot handler: the second trigger finds nothing.
    emitter.once("hello", |name: String| println!("[hello] hi, {name}"))?;
    emitter.send("hello", args![String::from("hookbus")])?;
    if let Err(err) = emitter.send("hello", args![String::from("again")]) {
        println!("[error] {}: {err}", err.as_label());
    }

    // 5. Fallible handler.
    emitter.on("check", |n: i64| {
        if n < 0 { Err(format!("{n} is negative")) } else { Ok(()) }
    })?;
    if let Err(err) = emitter.send("check", args![-5_i64]) {
        println!("[error] {}: {err}", err.as_label());
    }

    // 6. Panics are recovered and reported.
    emitter.on("boom", || -> () { panic!("something broke") })?;
    if let Err(err) = emitter.send("boom", args![]) {
        println!("[error] {}: {err}", err.as_label());
    }

    println!("keys={:?} total={}", emitter.keys(), total.load(Ordering::SeqCst));
    Ok(())
}
