//! Example: Spying on a Closure
//!
//! Demonstrates: wrapping a closure with captured state, then inspecting
//! the recorded call
//!
//! Run with: `RUST_LOG=callspy=trace cargo run --example closure`

use callspy::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> SpyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Closure Spy Example ===\n");

    // Value captured by the closure
    let caught_value = 3;
    let describe = move |value: i32, message: &str| format!("{message} = {}", value + caught_value);

    let spy = Spy::with_config(describe, SpyConfig::from_env().with_name("describe"));

    println!("Output: '{}'\n", spy.call((55, "result")));

    println!("Called {} time", spy.call_count());
    println!("Was called? {}\n", spy.was_called());

    let last_call = spy.last_call()?;
    println!("Timestamp: {}", last_call.timestamp().to_rfc2822());
    println!("Arguments: {:?}", last_call.arguments());
    println!("Result:    {:?}", last_call.result());
    println!("Call site: {}", last_call.call_site());

    println!("\nHistory as JSON:\n{}", spy.to_json()?);

    Ok(())
}
