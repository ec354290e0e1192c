//! Sequential control flow example
//!
//! A waterfall whose stages hand several values to each other, followed by a
//! series of database-style inserts that run strictly one after another.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use taskflow::{run_series, ConsoleReporter, Orchestrator, Waterfall};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Waterfall Example ===\n");

    let reporter = ConsoleReporter::with_context("waterfall");
    let orchestrator = Orchestrator::new().with_reporter(reporter);

    let pipeline = Waterfall::new(|| async { Ok::<_, String>((1, 2, 3)) })
        .then(|(a, b, c)| async move {
            println!("{}, {}, {}", a, b, c);
            Ok((4, 5))
        })
        .then(|(a, b)| async move {
            println!("{}, {}", a, b);
            Ok((6, 7))
        });

    let result = orchestrator.waterfall(pipeline).await?;
    println!("Finished result: {:?}\n", result);

    println!("=== Series Example ===\n");

    let database = Arc::new(Mutex::new(Vec::new()));
    let inserts = (1..=10u64).map(|record| {
        let database = database.clone();
        async move {
            // Uneven latencies; the series still finishes them in order.
            tokio::time::sleep(Duration::from_millis((record * 37) % 100)).await;
            database
                .lock()
                .map_err(|_| "database lock poisoned".to_string())?
                .push(record);
            println!("insert {} is finished", record);
            Ok::<_, String>(record)
        }
        .boxed()
    });

    let inserted = run_series(inserts).await?;
    println!("All are finished: {} records", inserted.len());

    Ok(())
}
