//! Callback entry points
//!
//! Each function spawns its run onto the current tokio runtime and hands the
//! terminal outcome to `on_done` through a [`CompletionLatch`], so `on_done`
//! is called exactly once per run. The returned handle can be awaited to know
//! that `on_done` has returned; dropping it detaches the run.

use std::fmt::Debug;
use std::future::Future;
use std::num::NonZeroUsize;

use tokio::task::JoinHandle;

use crate::error::RunResult;
use crate::latch::CompletionLatch;
use crate::limited::run_limited;
use crate::parallel::run_parallel;
use crate::partition::{partition, Partition};
use crate::series::{run_series, Waterfall};
use crate::task::Task;

fn deliver<T, R, F>(run: R, on_done: F) -> JoinHandle<()>
where
    T: Send + 'static,
    R: Future<Output = T> + Send + 'static,
    F: FnOnce(T) + Send + 'static,
{
    let latch = CompletionLatch::new(on_done);
    tokio::spawn(async move {
        latch.signal(run.await);
    })
}

/// Callback form of [`run_series`]
pub fn spawn_series<Fut, O, E, F>(tasks: Vec<Fut>, on_done: F) -> JoinHandle<()>
where
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    O: Send + 'static,
    E: Debug + Send + 'static,
    F: FnOnce(RunResult<Vec<O>, E>) + Send + 'static,
{
    deliver(run_series(tasks), on_done)
}

/// Callback form of [`Waterfall::run`]
pub fn spawn_waterfall<T, E, F>(waterfall: Waterfall<T, E>, on_done: F) -> JoinHandle<()>
where
    T: Send + 'static,
    E: Debug + Send + 'static,
    F: FnOnce(RunResult<T, E>) + Send + 'static,
{
    deliver(waterfall.run(), on_done)
}

/// Callback form of [`run_parallel`]
pub fn spawn_parallel<I, T, F>(inputs: Vec<I>, task: T, on_done: F) -> JoinHandle<()>
where
    I: Send + 'static,
    T: Task<I>,
    F: FnOnce(RunResult<Vec<T::Output>, T::Error>) + Send + 'static,
{
    deliver(run_parallel(inputs, task), on_done)
}

/// Callback form of [`run_limited`]
pub fn spawn_limited<I, T, F>(
    inputs: Vec<I>,
    task: T,
    limit: NonZeroUsize,
    on_done: F,
) -> JoinHandle<()>
where
    I: Send + 'static,
    T: Task<I>,
    F: FnOnce(RunResult<Vec<T::Output>, T::Error>) + Send + 'static,
{
    deliver(run_limited(inputs, task, limit), on_done)
}

/// Callback form of [`partition`]
pub fn spawn_partition<I, P, F>(inputs: Vec<I>, predicate: P, on_done: F) -> JoinHandle<()>
where
    I: Clone + Send + 'static,
    P: Task<I, Output = bool>,
    F: FnOnce(RunResult<Partition<I>, P::Error>) + Send + 'static,
{
    deliver(partition(inputs, predicate), on_done)
}
