//! Bounded concurrency example
//!
//! Doubles six items with at most two jobs in flight at a time. Every job
//! reports through a callback one second after it was started, and a new job
//! is launched as soon as a slot frees up.

use std::time::Duration;

use taskflow::{callback_task, ConsoleReporter, Orchestrator, OrchestratorConfig, ResultSink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Bounded Concurrency Example ===\n");

    let config = OrchestratorConfig::new().with_concurrency_limit(2)?;
    let orchestrator = Orchestrator::with_config(config).with_reporter(ConsoleReporter::new());

    let double_later = callback_task(|item: u64, sink: ResultSink<u64, String>| {
        println!("do something with '{}', return 1 sec later", item);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            sink.succeed(item * 2);
        });
    });

    let results = orchestrator.map((1..=6u64).collect(), double_later).await?;

    println!("\nDone {:?}", results);
    Ok(())
}
