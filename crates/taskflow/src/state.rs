//! Per-run bookkeeping
//!
//! Every invocation of a runner creates one [`RunState`] and one
//! [`RunContext`]. The state is owned by the run's driver and is the only
//! place the counters of the run live; workers never touch it, they send a
//! [`Completion`] back instead. Finishing consumes the state, so a run cannot
//! be driven twice.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{RunError, RunResult};
use crate::reporter::{RunEvent, RunReporter};
use crate::task::RunId;
use crate::types::{RunKind, RunStats};

/// Outcome of one task, as reported back to the driver
#[derive(Debug)]
pub(crate) struct Completion<O, E> {
    pub index: usize,
    pub outcome: Result<O, RunError<E>>,
    pub elapsed: Duration,
}

/// Identity and reporting sink of a run
#[derive(Clone)]
pub(crate) struct RunContext {
    run_id: RunId,
    kind: RunKind,
    reporter: Option<Arc<dyn RunReporter>>,
}

impl RunContext {
    pub(crate) fn new(kind: RunKind, reporter: Option<Arc<dyn RunReporter>>) -> Self {
        Self {
            run_id: RunId::new(),
            kind,
            reporter,
        }
    }

    /// A run nobody listens to apart from `tracing`
    pub(crate) fn detached(kind: RunKind) -> Self {
        Self::new(kind, None)
    }

    pub(crate) fn run_id(&self) -> RunId {
        self.run_id
    }

    fn report(&self, event: RunEvent) {
        if let Some(reporter) = &self.reporter {
            reporter.report_event(event);
        }
    }

    pub(crate) fn dispatched(&self, index: usize, in_flight: usize) {
        debug!(run = %self.run_id, kind = %self.kind, index, in_flight, "dispatching task");
        self.report(RunEvent::TaskDispatched {
            run_id: self.run_id,
            index,
        });
    }
}

/// Terminal bookkeeping of a run
#[derive(Debug)]
pub(crate) struct Finished<O, E> {
    pub results: Vec<Option<O>>,
    pub failure: Option<RunError<E>>,
    pub stats: RunStats,
}

impl<O, E> Finished<O, E> {
    /// Fail-fast view: the failure, or every result in input order
    pub(crate) fn into_result(self) -> RunResult<Vec<O>, E> {
        match self.failure {
            Some(failure) => Err(failure),
            None => {
                debug_assert!(self.results.iter().all(Option::is_some));
                Ok(self.results.into_iter().flatten().collect())
            }
        }
    }
}

/// The mutable state of one run
pub(crate) struct RunState<I, O, E> {
    ctx: RunContext,
    pending: VecDeque<(usize, I)>,
    in_flight: usize,
    completed: usize,
    results: Vec<Option<O>>,
    failure: Option<RunError<E>>,
    stats: RunStats,
    first_dispatch_at: Option<Instant>,
}

impl<I, O, E: Debug> RunState<I, O, E> {
    pub(crate) fn new(ctx: RunContext, inputs: Vec<I>) -> Self {
        let total = inputs.len();
        info!(run = %ctx.run_id, kind = %ctx.kind, total, "starting run");
        ctx.report(RunEvent::RunStarted {
            run_id: ctx.run_id,
            kind: ctx.kind,
            total_tasks: total,
        });

        Self {
            ctx,
            pending: inputs.into_iter().enumerate().collect(),
            in_flight: 0,
            completed: 0,
            results: std::iter::repeat_with(|| None).take(total).collect(),
            failure: None,
            stats: RunStats::new(total),
            first_dispatch_at: None,
        }
    }

    pub(crate) fn ctx(&self) -> &RunContext {
        &self.ctx
    }

    pub(crate) fn total(&self) -> usize {
        self.results.len()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub(crate) fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Tasks owed a report: in flight or never dispatched
    pub(crate) fn outstanding(&self) -> usize {
        self.in_flight + self.pending.len()
    }

    /// Take the next pending input and count it as in flight
    pub(crate) fn next_dispatch(&mut self) -> Option<(usize, I)> {
        let (index, input) = self.pending.pop_front()?;
        self.first_dispatch_at.get_or_insert_with(Instant::now);
        self.in_flight += 1;
        self.stats.dispatched_tasks += 1;
        self.stats.peak_in_flight = self.stats.peak_in_flight.max(self.in_flight);
        self.ctx.dispatched(index, self.in_flight);
        Some((index, input))
    }

    /// Apply a task's outcome. Only the first failure of a run is kept.
    pub(crate) fn record(&mut self, completion: Completion<O, E>) {
        let Completion {
            index,
            outcome,
            elapsed,
        } = completion;

        debug_assert!(self.in_flight > 0, "completion without a dispatched task");
        self.in_flight -= 1;
        self.completed += 1;

        match outcome {
            Ok(value) => {
                debug!(
                    run = %self.ctx.run_id,
                    index,
                    in_flight = self.in_flight,
                    completed = self.completed,
                    "task succeeded"
                );
                self.stats.successful_tasks += 1;
                self.results[index] = Some(value);
                self.ctx.report(RunEvent::TaskSucceeded {
                    run_id: self.ctx.run_id,
                    index,
                    duration: elapsed,
                });
            }
            Err(err) => {
                warn!(
                    run = %self.ctx.run_id,
                    index,
                    in_flight = self.in_flight,
                    error = ?err,
                    "task failed"
                );
                self.stats.failed_tasks += 1;
                self.ctx.report(RunEvent::TaskFailed {
                    run_id: self.ctx.run_id,
                    index,
                    error: format!("{:?}", err),
                    duration: elapsed,
                });
                if self.failure.is_none() {
                    self.failure = Some(err);
                }
            }
        }
    }

    /// Everything was dispatched and everything dispatched has terminated
    pub(crate) fn is_complete(&self) -> bool {
        self.completed == self.total() && self.pending.is_empty() && self.in_flight == 0
    }

    /// The completion channel closed while tasks were still owed
    pub(crate) fn interrupt(&mut self) {
        let outstanding = self.outstanding();
        warn!(run = %self.ctx.run_id, outstanding, "run interrupted before every task reported");
        self.in_flight = 0;
        if self.failure.is_none() {
            self.failure = Some(RunError::Interrupted { outstanding });
        }
    }

    /// Produce the terminal bookkeeping; the state is gone afterwards
    pub(crate) fn finish(self) -> Finished<O, E> {
        let Self {
            ctx,
            results,
            failure,
            mut stats,
            first_dispatch_at,
            ..
        } = self;

        stats.total_duration = first_dispatch_at.map(|at| at.elapsed()).unwrap_or_default();
        let successful = failure.is_none();
        if successful {
            info!(run = %ctx.run_id, kind = %ctx.kind, tasks = stats.total_tasks, "run finished");
        } else {
            warn!(
                run = %ctx.run_id,
                kind = %ctx.kind,
                failed = stats.failed_tasks,
                dispatched = stats.dispatched_tasks,
                "run finished with failure"
            );
        }
        ctx.report(RunEvent::RunFinished {
            run_id: ctx.run_id,
            kind: ctx.kind,
            successful,
            stats: stats.clone(),
        });

        Finished {
            results,
            failure,
            stats,
        }
    }
}
