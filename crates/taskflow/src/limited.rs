//! Bounded concurrency scheduler
//!
//! Keeps at most `limit` tasks in flight. The window is filled once at the
//! start and then topped up by exactly one dispatch per completion while
//! inputs remain, so it stays as full as possible without ever growing past
//! the limit. The run is complete when every input was dispatched, every
//! dispatched task terminated, and nothing is in flight.

use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::dispatch::{completion_channel, spawn_task};
use crate::error::{RunError, RunResult};
use crate::state::{Finished, RunContext, RunState};
use crate::task::Task;
use crate::types::{FailurePolicy, RunKind, RunStats};

/// Outcome of a run that kept going after failures
#[derive(Debug)]
pub struct Settled<O, E> {
    /// One slot per input; `None` where the task failed
    pub results: Vec<Option<O>>,
    /// The first failure observed, if any
    pub failure: Option<RunError<E>>,
    /// Bookkeeping of the run, including how many tasks failed
    pub stats: RunStats,
}

impl<O, E> Settled<O, E> {
    /// Check if every task succeeded
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Number of tasks that failed
    pub fn failed_count(&self) -> usize {
        self.stats.failed_tasks
    }

    /// Collapse into the fail-fast shape, dropping partial results on failure
    pub fn into_result(self) -> RunResult<Vec<O>, E> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.results.into_iter().flatten().collect()),
        }
    }
}

impl<O, E> From<Finished<O, E>> for Settled<O, E> {
    fn from(finished: Finished<O, E>) -> Self {
        Settled {
            results: finished.results,
            failure: finished.failure,
            stats: finished.stats,
        }
    }
}

/// Run `task` for every input with at most `limit` tasks in flight.
///
/// On the first failure no further inputs are dispatched; tasks already in
/// flight are allowed to finish, and the failure is returned once they have.
/// Must be called from within a tokio runtime.
pub async fn run_limited<I, T>(
    inputs: Vec<I>,
    task: T,
    limit: NonZeroUsize,
) -> RunResult<Vec<T::Output>, T::Error>
where
    I: Send + 'static,
    T: Task<I>,
{
    let ctx = RunContext::detached(RunKind::Limited { limit: limit.get() });
    drive(ctx, inputs, task, limit, FailurePolicy::FailFast)
        .await
        .into_result()
}

/// Like [`run_limited`], but failures never stop dispatch.
///
/// Every input is run. The returned [`Settled`] holds the results of the
/// tasks that succeeded together with the first failure.
pub async fn run_limited_settled<I, T>(
    inputs: Vec<I>,
    task: T,
    limit: NonZeroUsize,
) -> Settled<T::Output, T::Error>
where
    I: Send + 'static,
    T: Task<I>,
{
    let ctx = RunContext::detached(RunKind::Limited { limit: limit.get() });
    drive(ctx, inputs, task, limit, FailurePolicy::Continue)
        .await
        .into()
}

pub(crate) async fn drive<I, T>(
    ctx: RunContext,
    inputs: Vec<I>,
    task: T,
    limit: NonZeroUsize,
    policy: FailurePolicy,
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

    while state.in_flight() < limit.get() {
        let Some((index, input)) = state.next_dispatch() else {
            break;
        };
        spawn_task(run_id, &task, index, input, &completions);
    }

    while state.in_flight() > 0 {
        let Some(completion) = outcomes.recv().await else {
            // Unreachable while `completions` is alive; kept for the case
            // where the runtime tears workers down.
            state.interrupt();
            break;
        };
        state.record(completion);

        let halted = policy == FailurePolicy::FailFast && state.has_failed();
        if !halted {
            if let Some((index, input)) = state.next_dispatch() {
                spawn_task(run_id, &task, index, input, &completions);
            }
        }

        if state.is_complete() {
            break;
        }
    }

    state.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::tests::RecordingReporter;
    use crate::reporter::RunEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    fn limit(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// Tracks how many tasks run at once and how often each input was seen
    #[derive(Default)]
    struct Probe {
        current: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<Vec<u64>>,
    }

    impl Probe {
        fn task(self: &Arc<Self>) -> impl Task<u64, Output = u64, Error = String> {
            let probe = self.clone();
            move |ms: u64| {
                let probe = probe.clone();
                async move {
                    let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
                    probe.peak.fetch_max(now, Ordering::SeqCst);
                    probe.seen.lock().unwrap().push(ms);
                    sleep(Duration::from_millis(ms)).await;
                    probe.current.fetch_sub(1, Ordering::SeqCst);
                    if ms == 0 {
                        Err("zero delay rejected".to_string())
                    } else {
                        Ok(ms * 10)
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_empty_inputs() {
        let probe = Arc::new(Probe::default());
        let result = run_limited(Vec::<u64>::new(), probe.task(), limit(3)).await;
        assert_eq!(result.unwrap(), Vec::<u64>::new());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_never_exceeds_limit() {
        for k in [1, 2, 3, 7, 10, 25] {
            let probe = Arc::new(Probe::default());
            let inputs: Vec<u64> = (1..=10).map(|i| (i * 37 % 11) + 1).collect();

            let result = run_limited(inputs.clone(), probe.task(), limit(k)).await;

            let expected: Vec<u64> = inputs.iter().map(|ms| ms * 10).collect();
            assert_eq!(result.unwrap(), expected, "limit {k}");
            assert!(probe.peak.load(Ordering::SeqCst) <= k, "limit {k}");
            assert_eq!(probe.peak.load(Ordering::SeqCst), k.min(inputs.len()), "limit {k}");

            let mut seen = probe.seen.lock().unwrap().clone();
            let mut all = inputs.clone();
            seen.sort_unstable();
            all.sort_unstable();
            assert_eq!(seen, all, "every input dispatched exactly once");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_one_is_sequential() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let log = order.clone();
        let result = run_limited(
            vec![30u64, 10, 20],
            move |ms: u64| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("start {ms}"));
                    sleep(Duration::from_millis(ms)).await;
                    log.lock().unwrap().push(format!("end {ms}"));
                    Ok::<_, String>(ms)
                }
            },
            limit(1),
        )
        .await;

        assert_eq!(result.unwrap(), vec![30, 10, 20]);
        assert_eq!(
            *order.lock().unwrap(),
            vec!["start 30", "end 30", "start 10", "end 10", "start 20", "end 20"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_dispatch_per_completion() {
        let reporter = RecordingReporter::default();
        let ctx = RunContext::new(
            RunKind::Limited { limit: 2 },
            Some(Arc::new(reporter.clone())),
        );
        let probe = Arc::new(Probe::default());
        let inputs: Vec<u64> = vec![5, 3, 8, 1, 9, 2, 7, 4, 6, 10];

        let finished = drive(ctx, inputs, probe.task(), limit(2), FailurePolicy::FailFast).await;
        assert_eq!(finished.stats.dispatched_tasks, 10);
        assert_eq!(finished.stats.peak_in_flight, 2);
        assert!(finished.failure.is_none());

        let events = reporter.events();
        let task_events: Vec<&RunEvent> = events
            .iter()
            .filter(|e| !matches!(e, RunEvent::RunStarted { .. } | RunEvent::RunFinished { .. }))
            .collect();

        // Initial fill of two, then every completion is followed by exactly
        // one dispatch until the inputs run out.
        assert!(matches!(task_events[0], RunEvent::TaskDispatched { index: 0, .. }));
        assert!(matches!(task_events[1], RunEvent::TaskDispatched { index: 1, .. }));
        let mut dispatched = 2;
        let mut i = 2;
        while i < task_events.len() {
            assert!(matches!(task_events[i], RunEvent::TaskSucceeded { .. }));
            if dispatched < 10 {
                assert!(matches!(
                    task_events[i + 1],
                    RunEvent::TaskDispatched { index, .. } if *index == dispatched
                ));
                dispatched += 1;
                i += 2;
            } else {
                i += 1;
            }
        }
        assert_eq!(dispatched, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_stops_dispatch_and_drains() {
        let probe = Arc::new(Probe::default());
        // The second input fails quickly while the first is still running.
        let inputs: Vec<u64> = vec![100, 0, 5, 5, 5, 5];

        let result = run_limited(inputs, probe.task(), limit(2)).await;

        let failure = result.unwrap_err();
        assert_eq!(failure.index(), Some(1));
        // The failing slot was not refilled; only the first two ever started.
        assert_eq!(probe.seen.lock().unwrap().len(), 2);
        // The in-flight sibling drained before the failure was reported.
        assert_eq!(probe.current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_keeps_first_failure_while_draining() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();
        let task = move |(id, ms, fail): (usize, u64, bool)| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(ms)).await;
                if fail {
                    Err(format!("task {id} failed"))
                } else {
                    Ok(id)
                }
            }
        };
        // Task 1 fails first; task 0 fails later, while the run drains.
        let inputs = vec![(0, 50, true), (1, 10, true), (2, 5, false), (3, 5, false)];
        let ctx = RunContext::detached(RunKind::Limited { limit: 2 });

        let finished = drive(ctx, inputs, task, limit(2), FailurePolicy::FailFast).await;

        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(finished.stats.dispatched_tasks, 2);
        assert_eq!(finished.stats.failed_tasks, 2);
        let failure = finished.into_result().unwrap_err();
        assert_eq!(failure.index(), Some(1));
        assert_eq!(failure.into_cause(), Some("task 1 failed".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_duration_follows_paused_clock() {
        let probe = Arc::new(Probe::default());
        let ctx = RunContext::detached(RunKind::Limited { limit: 2 });

        let finished = drive(
            ctx,
            vec![100, 100, 100, 100],
            probe.task(),
            limit(2),
            FailurePolicy::FailFast,
        )
        .await;

        assert!(finished.failure.is_none());
        assert!(finished.stats.total_duration >= Duration::from_millis(200));
        assert!(finished.stats.total_duration < Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_runs_everything() {
        let probe = Arc::new(Probe::default());
        let inputs: Vec<u64> = vec![10, 0, 20, 0, 30];

        let settled = run_limited_settled(inputs, probe.task(), limit(2)).await;

        assert!(!settled.is_success());
        assert_eq!(settled.failed_count(), 2);
        assert_eq!(settled.failure.as_ref().and_then(RunError::index), Some(1));
        assert_eq!(settled.results, vec![Some(100), None, Some(200), None, Some(300)]);
        assert_eq!(probe.seen.lock().unwrap().len(), 5);
        assert!(settled.into_result().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_without_failures() {
        let probe = Arc::new(Probe::default());
        let settled = run_limited_settled(vec![3, 1, 2], probe.task(), limit(2)).await;
        assert!(settled.is_success());
        assert_eq!(settled.into_result().unwrap(), vec![30, 10, 20]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_multi_thread_window() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (c, p) = (current.clone(), peak.clone());

        let result = run_limited(
            (0..200u32).collect(),
            move |x: u32| {
                let (c, p) = (c.clone(), p.clone());
                async move {
                    let now = c.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    c.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(x)
                }
            },
            limit(4),
        )
        .await;

        assert_eq!(result.unwrap(), (0..200).collect::<Vec<u32>>());
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }
}
