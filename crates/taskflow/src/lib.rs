//! Taskflow - Control flow for async tasks
//!
//! A small orchestration layer on top of tokio for running a collection of
//! asynchronous tasks in the common shapes: one after another, as a pipeline,
//! all at once, or all at once with a bound on how many are in flight.
//!
//! # Overview
//!
//! - [`run_series`] runs tasks strictly in order and stops at the first failure
//! - [`Waterfall`] and [`run_waterfall`] feed each stage's value into the next
//! - [`run_parallel`] starts everything at once and fails on the first failure
//! - [`run_limited`] keeps at most `limit` tasks in flight, topping the window
//!   up by one dispatch per completion
//! - [`partition`], [`filter`] and [`reject`] split inputs by an async predicate
//!
//! Results always come back in input order. Every run owns its bookkeeping, so
//! any number of runs can be active at once. Callback-style entry points live
//! in [`callback`], and [`Orchestrator`] bundles configuration and progress
//! reporting.
//!
//! # Example
//!
//! ```rust
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//! use taskflow::run_limited;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let insert = |record: u32| async move {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         Ok::<_, String>(format!("inserted {record}"))
//!     };
//!
//!     let limit = NonZeroUsize::new(2).unwrap();
//!     let receipts = run_limited((1..=6u32).collect(), insert, limit).await?;
//!
//!     println!("Receipts: {:?}", receipts);
//!     Ok(())
//! }
//! ```

pub mod callback;
pub mod error;
pub mod latch;
pub mod limited;
pub mod limits;
pub mod orchestrator;
pub mod parallel;
pub mod partition;
pub mod reporter;
pub mod series;
pub mod sink;
pub mod task;
pub mod types;

mod dispatch;
mod state;

pub use callback::{spawn_limited, spawn_parallel, spawn_partition, spawn_series, spawn_waterfall};
pub use error::{ConfigError, ConfigResult, RunError, RunResult};
pub use latch::CompletionLatch;
pub use limited::{run_limited, run_limited_settled, Settled};
pub use limits::Limit;
pub use orchestrator::Orchestrator;
pub use parallel::run_parallel;
pub use partition::{filter, partition, reject, Partition};
pub use reporter::{ConsoleReporter, MultiReporter, NoOpReporter, RunEvent, RunReporter};
pub use series::{run_series, run_waterfall, stage, Stage, Waterfall};
pub use sink::{callback_task, with_sink, CallbackTask, ResultSink, SinkError};
pub use task::{Retrying, RunId, Task, TimeLimited, TimeoutError};
pub use types::{FailurePolicy, OrchestratorConfig, RetryPolicy, RunKind, RunStats};

// Re-export async_trait for implementing `Task` by hand
pub use async_trait::async_trait;
