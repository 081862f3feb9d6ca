// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

//! Decorates a flaky greeting operation with retries, a fallback, and result
//! caching, then invokes it a few times to show each behavior engaging.

use airbag::{CallSite, Command, CommandOptions, CommandRegistry, operation};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let site = CallSite::new("greeter", "greet");
    let options = CommandOptions {
        fallback_operation: Some("greet_quietly".to_string()),
        max_retry_times: 2,
        retry_interval_ms: 50,
        cache_ms: 10_000,
        ..CommandOptions::default()
    };

    let command = CommandRegistry::global().resolve(site.clone(), || {
        Command::builder(site, options)
            .primary(operation(|name: String| async move {
                // Roughly half the calls fail on the first attempt.
                if fastrand::bool() {
                    Err("greeting service hiccuped".to_string())
                } else {
                    Ok(format!("hello {name}"))
                }
            }))
            .operation("greet_quietly", operation(|name: String| async move {
                Ok::<_, String>(format!("(quietly) hi {name}"))
            }))
            .cache_key()
            .build()
    })?;

    for name in ["alice", "bob", "alice"] {
        let greeting = command.invoke(name.to_string()).await?;
        println!("{name:>6} -> {greeting}");
    }
    println!("(the second greeting for alice came from the cache)");

    Ok(())
}
