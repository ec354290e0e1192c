//! Launching tasks and routing their outcomes back to the driver

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::error::RunError;
use crate::state::Completion;
use crate::task::{RunId, Task};

pub(crate) type CompletionSender<O, E> = mpsc::UnboundedSender<Completion<O, E>>;
pub(crate) type CompletionReceiver<O, E> = mpsc::UnboundedReceiver<Completion<O, E>>;

pub(crate) fn completion_channel<O, E>() -> (CompletionSender<O, E>, CompletionReceiver<O, E>) {
    mpsc::unbounded_channel()
}

/// Await a task future, turning its failure or panic into a [`RunError`]
pub(crate) async fn guarded<F, O, E>(index: usize, future: F) -> Result<O, RunError<E>>
where
    F: Future<Output = Result<O, E>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(RunError::failed(index, err)),
        Err(payload) => Err(RunError::panicked(index, payload)),
    }
}

/// Run `task` on its own tokio task and send exactly one [`Completion`].
///
/// The worker is detached: nothing aborts it once spawned. If the driver has
/// already finished, the send fails and the outcome is dropped.
pub(crate) fn spawn_task<I, T>(
    run_id: RunId,
    task: &Arc<T>,
    index: usize,
    input: I,
    completions: &CompletionSender<T::Output, T::Error>,
) where
    I: Send + 'static,
    T: Task<I>,
{
    let task = Arc::clone(task);
    let completions = completions.clone();

    tokio::spawn(async move {
        let started_at = Instant::now();
        let outcome = guarded(index, task.run(input)).await;
        let completion = Completion {
            index,
            outcome,
            elapsed: started_at.elapsed(),
        };

        if completions.send(completion).is_err() {
            debug!(run = %run_id, index, "run already finished, discarding late outcome");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guarded_outcomes() {
        let ok = guarded(0, async { Ok::<_, String>(1) }).await;
        assert_eq!(ok.unwrap(), 1);

        let failed = guarded(4, async { Err::<u32, _>("nope".to_string()) }).await;
        assert!(matches!(failed, Err(RunError::Failed { index: 4, ref cause }) if cause == "nope"));

        let panicked = guarded(2, async {
            if true {
                panic!("exploded");
            }
            Ok::<u32, String>(0)
        })
        .await;
        assert!(matches!(
            panicked,
            Err(RunError::Panicked { index: 2, ref message }) if message == "exploded"
        ));
    }

    #[tokio::test]
    async fn test_spawned_task_reports_once() {
        let task = Arc::new(|x: u32| async move { Ok::<_, String>(x + 1) });
        let (tx, mut rx) = completion_channel();

        spawn_task(RunId::new(), &task, 3, 41, &tx);
        drop(tx);

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.index, 3);
        assert_eq!(completion.outcome.unwrap(), 42);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_late_outcome_is_discarded() {
        let task = Arc::new(|x: u32| async move { Ok::<_, String>(x) });
        let (tx, rx) = completion_channel();
        drop(rx);

        // Must not panic even though nobody is listening.
        spawn_task(RunId::new(), &task, 0, 1, &tx);
        tokio::task::yield_now().await;
    }
}
