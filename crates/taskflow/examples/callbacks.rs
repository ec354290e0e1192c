//! Callback-style example
//!
//! Starts runs with an `on_done` callback instead of awaiting them. The
//! callback fires exactly once per run, even when several tasks fail at the
//! same moment.

use std::time::Duration;

use taskflow::{spawn_parallel, spawn_partition, RetryPolicy, Retrying, TimeLimited};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Callback Example ===\n");

    let lookup = |host: &'static str| async move {
        tokio::time::sleep(Duration::from_millis(20 * host.len() as u64)).await;
        if host.ends_with(".invalid") {
            Err(format!("cannot resolve {}", host))
        } else {
            Ok(format!("{} -> 127.0.0.1", host))
        }
    };

    let hosts = vec!["localhost", "example.org"];
    let resolved = spawn_parallel(hosts, lookup, |outcome| match outcome {
        Ok(addresses) => println!("✅ resolved: {:?}", addresses),
        Err(err) => println!("❌ {}", err),
    });

    let broken = spawn_parallel(vec!["a.invalid", "b.invalid", "c.invalid"], lookup, |outcome| {
        match outcome {
            Ok(_) => println!("unexpected success"),
            Err(err) => println!("❌ reported once: {}", err),
        }
    });

    let policy = RetryPolicy::new(2, Duration::from_millis(10))?;
    let checked = Retrying::new(
        TimeLimited::new(
            |n: u32| async move { Ok::<_, String>(n % 2 == 0) },
            Duration::from_millis(100),
        ),
        policy,
    );
    let split = spawn_partition((1..=8u32).collect(), checked, |outcome| match outcome {
        Ok(split) => println!("✅ even: {:?}, odd: {:?}", split.kept, split.rejected),
        Err(err) => println!("❌ {}", err),
    });

    resolved.await?;
    broken.await?;
    split.await?;
    Ok(())
}
