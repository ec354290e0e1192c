//! Callback-style tasks
//!
//! Some work does not fit an `async fn`: it is started by a plain function
//! and reports later, from wherever it ends up running. Such work is handed a
//! [`ResultSink`] and calls it once when done. [`CallbackTask`] turns a
//! function of that shape into a [`Task`] every runner accepts.

use std::fmt;
use std::marker::PhantomData;

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use crate::task::Task;

/// Failure of a callback-style task
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError<E> {
    /// The task reported this failure through its sink
    #[error("{0}")]
    Failed(E),

    /// The sink was dropped without being called
    #[error("task dropped its result sink without reporting")]
    Dropped,
}

impl<E> SinkError<E> {
    /// Check if the task never reported
    pub fn is_dropped(&self) -> bool {
        matches!(self, SinkError::Dropped)
    }

    /// Take the failure the task reported, if it reported one
    pub fn into_inner(self) -> Option<E> {
        match self {
            SinkError::Failed(err) => Some(err),
            SinkError::Dropped => None,
        }
    }
}

/// One-shot receiver of a task's outcome.
///
/// Every method consumes the sink, so a task can report at most once. A sink
/// that is dropped unused resolves its task with [`SinkError::Dropped`]. A
/// sink that is kept alive forever (leaked, or parked in a structure nobody
/// drains) keeps its run waiting forever.
pub struct ResultSink<O, E> {
    tx: oneshot::Sender<Result<O, E>>,
}

impl<O, E> ResultSink<O, E> {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Result<O, E>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Report success
    pub fn succeed(self, value: O) {
        self.complete(Ok(value));
    }

    /// Report failure
    pub fn fail(self, err: E) {
        self.complete(Err(err));
    }

    /// Report an outcome
    pub fn complete(self, outcome: Result<O, E>) {
        if self.tx.send(outcome).is_err() {
            debug!("nobody is waiting on this sink anymore, dropping outcome");
        }
    }

    /// Check if the waiting side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<O, E> fmt::Debug for ResultSink<O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSink")
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn resolve<O, E>(rx: oneshot::Receiver<Result<O, E>>) -> Result<O, SinkError<E>> {
    match rx.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(SinkError::Failed(err)),
        Err(_) => Err(SinkError::Dropped),
    }
}

/// Run a callback-style job once and wait for it to report.
///
/// Nothing happens until the returned future is polled, which makes it a
/// good fit for [`run_series`](crate::run_series).
pub async fn with_sink<O, E, F>(start: F) -> Result<O, SinkError<E>>
where
    F: FnOnce(ResultSink<O, E>),
{
    let (sink, rx) = ResultSink::channel();
    start(sink);
    resolve(rx).await
}

/// A [`Task`] built from a function that reports through a [`ResultSink`]
pub struct CallbackTask<F, O, E> {
    start: F,
    _outcome: PhantomData<fn() -> Result<O, E>>,
}

/// Adapt `start` into a [`Task`].
///
/// ```rust
/// use std::num::NonZeroUsize;
/// use std::time::Duration;
/// use taskflow::{callback_task, run_limited, ResultSink};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let double_later = callback_task(|x: u64, sink: ResultSink<u64, String>| {
///     tokio::spawn(async move {
///         tokio::time::sleep(Duration::from_millis(5)).await;
///         sink.succeed(x * 2);
///     });
/// });
///
/// let limit = NonZeroUsize::new(2).unwrap();
/// let doubled = run_limited(vec![1, 2, 3], double_later, limit).await.unwrap();
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # }
/// ```
pub fn callback_task<I, F, O, E>(start: F) -> CallbackTask<F, O, E>
where
    F: Fn(I, ResultSink<O, E>),
{
    CallbackTask {
        start,
        _outcome: PhantomData,
    }
}

impl<F, O, E> fmt::Debug for CallbackTask<F, O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTask").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<I, F, O, E> Task<I> for CallbackTask<F, O, E>
where
    I: Send + 'static,
    F: Fn(I, ResultSink<O, E>) + Send + Sync + 'static,
    O: Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    type Output = O;
    type Error = SinkError<E>;

    async fn run(&self, input: I) -> Result<O, SinkError<E>> {
        let (sink, rx) = ResultSink::channel();
        (self.start)(input, sink);
        resolve(rx).await
    }

    fn name(&self) -> String {
        format!("callback {}", std::any::type_name::<F>())
    }
}
