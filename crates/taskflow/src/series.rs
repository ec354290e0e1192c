//! Sequential runners: series and waterfall
//!
//! Both start a task only after the previous one succeeded and stop at the
//! first failure; later tasks are never started. Series collects every value
//! by position. Waterfall hands each stage's value to the next stage and
//! yields the last one.

use std::fmt::Debug;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::Instant;

use crate::dispatch::guarded;
use crate::error::{RunError, RunResult};
use crate::state::{Completion, Finished, RunContext, RunState};
use crate::task::Task;
use crate::types::RunKind;

/// Run futures one after another, collecting their values in order.
///
/// Futures are lazy, so an `async` block handed in here does nothing until
/// its turn comes. Work done eagerly while *building* a future (before the
/// first poll) is outside the runner's control.
///
/// ```rust
/// use futures::FutureExt;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let values = taskflow::run_series(vec![
///     async { Ok::<_, String>(1) }.boxed(),
///     async { Ok::<_, String>(2) }.boxed(),
/// ])
/// .await
/// .unwrap();
/// assert_eq!(values, vec![1, 2]);
/// # }
/// ```
pub async fn run_series<Fut, O, E>(tasks: impl IntoIterator<Item = Fut>) -> RunResult<Vec<O>, E>
where
    Fut: Future<Output = Result<O, E>>,
    E: Debug,
{
    drive(RunContext::detached(RunKind::Series), tasks.into_iter().collect())
        .await
        .into_result()
}

pub(crate) async fn drive<Fut, O, E>(ctx: RunContext, tasks: Vec<Fut>) -> Finished<O, E>
where
    Fut: Future<Output = Result<O, E>>,
    E: Debug,
{
    let mut state = RunState::new(ctx, tasks);
    while let Some((index, task)) = state.next_dispatch() {
        let started_at = Instant::now();
        let outcome = guarded(index, task).await;
        state.record(Completion {
            index,
            outcome,
            elapsed: started_at.elapsed(),
        });
        if state.has_failed() {
            break;
        }
    }
    state.finish()
}

/// Bookkeeping threaded through the stages of a waterfall
pub(crate) struct Stages<E> {
    state: RunState<(), (), E>,
}

impl<E: Debug> Stages<E> {
    fn new(ctx: RunContext, count: usize) -> Self {
        Self {
            state: RunState::new(ctx, vec![(); count]),
        }
    }

    /// Run the next stage; `None` means it failed and the failure is recorded
    async fn step<F, O>(&mut self, future: F) -> Option<O>
    where
        F: Future<Output = Result<O, E>>,
    {
        let (index, ()) = self.state.next_dispatch()?;
        let started_at = Instant::now();
        let (outcome, value) = match guarded(index, future).await {
            Ok(value) => (Ok(()), Some(value)),
            Err(err) => (Err(err), None),
        };
        self.state.record(Completion {
            index,
            outcome,
            elapsed: started_at.elapsed(),
        });
        value
    }

    fn conclude<T>(self, value: Option<T>) -> RunResult<T, E> {
        let outstanding = self.state.outstanding();
        let finished = self.state.finish();
        match (finished.failure, value) {
            (Some(failure), _) => Err(failure),
            (None, Some(value)) => Ok(value),
            (None, None) => Err(RunError::Interrupted { outstanding }),
        }
    }
}

type Chain<T, E> = Box<dyn FnOnce(Stages<E>) -> BoxFuture<'static, (Stages<E>, Option<T>)> + Send>;

/// A statically typed waterfall.
///
/// Each stage receives the previous stage's value. Several values travel as
/// a tuple:
///
/// ```rust
/// use taskflow::Waterfall;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let sum = Waterfall::new(|| async { Ok::<_, String>((1, 2, 3)) })
///     .then(|(a, b, c)| async move { Ok((a + b, c)) })
///     .then(|(ab, c)| async move { Ok(ab * c) })
///     .run()
///     .await
///     .unwrap();
/// assert_eq!(sum, 9);
/// # }
/// ```
pub struct Waterfall<T, E> {
    stages: usize,
    chain: Chain<T, E>,
}

impl<T, E> Waterfall<T, E>
where
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    /// Start a waterfall with a stage that takes no input
    pub fn new<F, Fut>(first: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            stages: 1,
            chain: Box::new(move |mut stages: Stages<E>| {
                async move {
                    let value = stages.step(first()).await;
                    (stages, value)
                }
                .boxed()
            }),
        }
    }

    /// Append a stage fed with the current last stage's value
    pub fn then<U, F, Fut>(self, stage: F) -> Waterfall<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
    {
        let previous = self.chain;
        Waterfall {
            stages: self.stages + 1,
            chain: Box::new(move |stages: Stages<E>| {
                async move {
                    let (mut stages, value) = previous(stages).await;
                    let Some(value) = value else {
                        return (stages, None);
                    };
                    let next = stages.step(stage(value)).await;
                    (stages, next)
                }
                .boxed()
            }),
        }
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages
    }

    /// Always false; a waterfall has at least its first stage
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Run the stages in order and return the last stage's value
    pub async fn run(self) -> RunResult<T, E> {
        self.drive(RunContext::detached(RunKind::Waterfall)).await
    }

    pub(crate) async fn drive(self, ctx: RunContext) -> RunResult<T, E> {
        let stages = Stages::new(ctx, self.stages);
        let (stages, value) = (self.chain)(stages).await;
        stages.conclude(value)
    }
}

/// A boxed waterfall stage for [`run_waterfall`]
pub type Stage<T, E> = Box<dyn Task<T, Output = T, Error = E>>;

/// Box a task as a waterfall stage
pub fn stage<T, E, S>(task: S) -> Stage<T, E>
where
    T: Send + 'static,
    S: Task<T, Output = T, Error = E>,
{
    Box::new(task)
}

/// Run a list of stages that all share one value type, starting from
/// `initial`. Use `Vec<V>` as the value type to pass "zero or more" values.
pub async fn run_waterfall<T, E>(initial: T, stages: Vec<Stage<T, E>>) -> RunResult<T, E>
where
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    drive_stages(RunContext::detached(RunKind::Waterfall), initial, stages).await
}

pub(crate) async fn drive_stages<T, E>(
    ctx: RunContext,
    initial: T,
    stages: Vec<Stage<T, E>>,
) -> RunResult<T, E>
where
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let mut run = Stages::new(ctx, stages.len());
    let mut value = Some(initial);
    for stage in stages {
        let Some(input) = value.take() else {
            break;
        };
        value = run.step(stage.run(input)).await;
    }
    run.conclude(value)
}
