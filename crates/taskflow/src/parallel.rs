//! Unbounded parallel runner
//!
//! Every input is dispatched immediately; results are collected in input
//! order. The first failure ends the run at once. Tasks that are still
//! running at that point are left alone: they finish on the runtime and
//! their outcomes are dropped, because the run's completion channel is gone.

use std::sync::Arc;

use crate::dispatch::{completion_channel, spawn_task};
use crate::error::RunResult;
use crate::state::{Finished, RunContext, RunState};
use crate::task::Task;
use crate::types::RunKind;

/// Run `task` for every input at once.
///
/// Must be called from within a tokio runtime.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let squares = taskflow::run_parallel(vec![1, 2, 3], |x: u64| async move {
///     Ok::<_, String>(x * x)
/// })
/// .await
/// .unwrap();
/// assert_eq!(squares, vec![1, 4, 9]);
/// # }
/// ```
pub async fn run_parallel<I, T>(inputs: Vec<I>, task: T) -> RunResult<Vec<T::Output>, T::Error>
where
    I: Send + 'static,
    T: Task<I>,
{
    drive(RunContext::detached(RunKind::Parallel), inputs, task)
        .await
        .into_result()
}

pub(crate) async fn drive<I, T>(
    ctx: RunContext,
    inputs: Vec<I>,
    task: T,
) -> Finished<T::Output, T::Error>
where
    I: Send + 'static,
    T: Task<I>,
{
    let mut state = RunState::new(ctx, inputs);
    if state.is_complete() {
        return state.finish();
    }

    let task = Arc::new(task);
    let run_id = state.ctx().run_id();
    let (completions, mut outcomes) = completion_channel();
    while let Some((index, input)) = state.next_dispatch() {
        spawn_task(run_id, &task, index, input, &completions);
    }
    drop(completions);

    loop {
        let Some(completion) = outcomes.recv().await else {
            state.interrupt();
            break;
        };
        state.record(completion);
        if state.has_failed() || state.is_complete() {
            break;
        }
    }

    state.finish()
}
