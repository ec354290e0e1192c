//! Core task abstractions and decorators

use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::types::RetryPolicy;

/// Unique identifier for a single run, used to correlate log lines and
/// reporter events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new unique run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single unit of asynchronous work.
///
/// A task is handed one input and terminates with either a value or a
/// failure. Resolving the future returned by [`Task::run`] is the task's one
/// and only report; the runners never look at anything else. Tasks are shared
/// between the workers of a run, so `run` takes `&self`.
///
/// Any `Fn(I) -> impl Future<Output = Result<O, E>>` closure is a task:
///
/// ```rust
/// use taskflow::Task;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let double = |x: u32| async move { Ok::<_, String>(x * 2) };
/// assert_eq!(double.run(21).await, Ok(42));
/// # }
/// ```
///
/// A task whose future never resolves keeps its run open forever: the
/// orchestrator imposes no timeout of its own. Wrap it in [`TimeLimited`] if
/// that matters to the caller.
#[async_trait::async_trait]
pub trait Task<I: Send + 'static>: Send + Sync + 'static {
    /// The value produced on success
    type Output: Send + 'static;

    /// The failure produced by this task
    type Error: Debug + Send + 'static;

    /// Execute the task for one input
    async fn run(&self, input: I) -> Result<Self::Output, Self::Error>;

    /// Get a human-readable name for this task (used for logging)
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

#[async_trait::async_trait]
impl<I, F, Fut, O, E> Task<I> for F
where
    I: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    O: Send + 'static,
    E: Debug + Send + 'static,
{
    type Output = O;
    type Error = E;

    async fn run(&self, input: I) -> Result<O, E> {
        (self)(input).await
    }
}

/// Failure of a [`TimeLimited`] task
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeoutError<E> {
    #[error("task timed out after {0:?}")]
    Elapsed(Duration),
    #[error("{0}")]
    Inner(E),
}

impl<E> TimeoutError<E> {
    /// Check if this error indicates a timeout
    pub fn is_elapsed(&self) -> bool {
        matches!(self, TimeoutError::Elapsed(_))
    }
}

/// Caller-side timeout around another task
#[derive(Debug, Clone)]
pub struct TimeLimited<T> {
    inner: T,
    limit: Duration,
}

impl<T> TimeLimited<T> {
    pub fn new(inner: T, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait::async_trait]
impl<I, T> Task<I> for TimeLimited<T>
where
    I: Send + 'static,
    T: Task<I>,
{
    type Output = T::Output;
    type Error = TimeoutError<T::Error>;

    async fn run(&self, input: I) -> Result<Self::Output, Self::Error> {
        match tokio::time::timeout(self.limit, self.inner.run(input)).await {
            Ok(result) => result.map_err(TimeoutError::Inner),
            Err(_) => Err(TimeoutError::Elapsed(self.limit)),
        }
    }

    fn name(&self) -> String {
        format!("{} (limit {:?})", self.inner.name(), self.limit)
    }
}

/// Re-runs a failing task before its failure reaches the runner.
///
/// Retrying is the task's own business, so it lives here as a decorator and
/// not inside any runner. The input is cloned for every attempt and the last
/// failure is the one reported.
#[derive(Debug, Clone)]
pub struct Retrying<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> Retrying<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait::async_trait]
impl<I, T> Task<I> for Retrying<T>
where
    I: Clone + Send + 'static,
    T: Task<I>,
{
    type Output = T::Output;
    type Error = T::Error;

    async fn run(&self, input: I) -> Result<Self::Output, Self::Error> {
        let mut attempt = 0;
        loop {
            match self.inner.run(input.clone()).await {
                Ok(output) => return Ok(output),
                Err(err) if attempt < self.policy.max_retries => {
                    attempt += 1;
                    debug!(
                        task_name = %self.inner.name(),
                        attempt,
                        max_retries = self.policy.max_retries,
                        error = ?err,
                        "Task failed, retrying"
                    );
                    tokio::time::sleep(self.policy.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn name(&self) -> String {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Doubler;

    #[async_trait::async_trait]
    impl Task<i32> for Doubler {
        type Output = i32;
        type Error = String;

        async fn run(&self, input: i32) -> Result<i32, String> {
            if input < 0 {
                Err("Negative value not allowed".to_string())
            } else {
                Ok(input * 2)
            }
        }

        fn name(&self) -> String {
            "doubler".to_string()
        }
    }

    #[test]
    fn test_run_id_generation() {
        let id1 = RunId::new();
        let id2 = RunId::new();
        assert_ne!(id1, id2);
        assert_eq!(id1.to_string(), id1.0.to_string());
    }

    #[tokio::test]
    async fn test_struct_task() {
        assert_eq!(Doubler.run(21).await, Ok(42));
        assert!(Doubler.run(-1).await.is_err());
        assert_eq!(Doubler.name(), "doubler");
    }

    #[tokio::test]
    async fn test_closure_task() {
        let task = |x: u32| async move {
            if x == 0 {
                Err("zero")
            } else {
                Ok(x + 1)
            }
        };
        assert_eq!(task.run(1).await, Ok(2));
        assert_eq!(task.run(0).await, Err("zero"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_limited() {
        let slow = |ms: u64| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, String>(ms)
        };
        let limited = TimeLimited::new(slow, Duration::from_millis(100));

        assert_eq!(limited.run(10).await, Ok(10));
        let err = limited.run(500).await.unwrap_err();
        assert!(err.is_elapsed());
        assert_eq!(err, TimeoutError::Elapsed(Duration::from_millis(100)));

        let failing = TimeLimited::new(Doubler, Duration::from_secs(1));
        assert_eq!(
            failing.run(-1).await,
            Err(TimeoutError::Inner("Negative value not allowed".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_recovers() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let flaky = move |x: u32| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(format!("attempt failed for {x}"))
                } else {
                    Ok(x)
                }
            }
        };

        let policy = RetryPolicy::new(3, Duration::from_millis(10)).unwrap();
        let task = Retrying::new(flaky, policy);
        assert_eq!(task.run(7).await, Ok(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_gives_up() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let broken = move |x: u32| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move { Err::<u32, _>(format!("{x} failed on attempt {attempt}")) }
        };

        let policy = RetryPolicy::new(2, Duration::from_millis(10)).unwrap();
        let task = Retrying::new(broken, policy);
        assert_eq!(task.run(1).await, Err("1 failed on attempt 2".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
