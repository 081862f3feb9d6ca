// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

//! Trips a circuit breaker against a dead dependency, shows the immediate
//! rejections, then lets the break window elapse so a trial execution can
//! close the circuit again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use airbag::{CallSite, Command, CommandOptions, operation};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = CommandOptions {
        enable_circuit_breaker: true,
        exceptions_allowed_before_breaking: 3,
        ms_of_break: 500,
        ..CommandOptions::default()
    };

    let healthy = Arc::new(AtomicBool::new(false));
    let healthy_in = Arc::clone(&healthy);

    let command = Command::builder(CallSite::new("inventory", "lookup"), options)
        .primary(operation(move |sku: String| {
            let ok = healthy_in.load(Ordering::SeqCst);
            async move {
                if ok {
                    Ok(format!("{sku}: 17 in stock"))
                } else {
                    Err("inventory service unreachable".to_string())
                }
            }
        }))
        .build()?;

    println!("-- dependency is down, failures accumulate --");
    for i in 1..=5 {
        match command.invoke("sku-1".to_string()).await {
            Ok(out) => println!("call {i}: {out}"),
            Err(err) => println!("call {i}: {err}"),
        }
    }

    println!("-- dependency recovers, break window elapses --");
    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(600)).await;

    // The first call after the window is the trial; its success closes the
    // circuit for everything that follows.
    for i in 6..=7 {
        match command.invoke("sku-1".to_string()).await {
            Ok(out) => println!("call {i}: {out}"),
            Err(err) => println!("call {i}: {err}"),
        }
    }

    Ok(())
}
