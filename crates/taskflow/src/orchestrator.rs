//! Configured entry point for running tasks

use std::fmt;
use std::fmt::Debug;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::error::RunResult;
use crate::limited::{self, Settled};
use crate::parallel;
use crate::partition::{partition_with, Partition};
use crate::reporter::{NoOpReporter, RunReporter};
use crate::series::{self, Stage, Waterfall};
use crate::state::RunContext;
use crate::task::Task;
use crate::types::{FailurePolicy, OrchestratorConfig, RunKind};

/// Runs tasks with a shared configuration and reporter.
///
/// Every call is an independent run with its own state and [`RunId`](crate::RunId);
/// the orchestrator only contributes configuration and the reporter. Runs
/// may overlap freely.
pub struct Orchestrator {
    config: OrchestratorConfig,
    reporter: Arc<dyn RunReporter>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create an orchestrator with default configuration and no reporter
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    /// Create an orchestrator with custom configuration
    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self {
            config,
            reporter: Arc::new(NoOpReporter),
        }
    }

    /// Send run events to `reporter`
    pub fn with_reporter<R: RunReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Get the current configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn context(&self, kind: RunKind) -> RunContext {
        let reporter = self.config.report_progress.then(|| Arc::clone(&self.reporter));
        RunContext::new(kind, reporter)
    }

    /// See [`run_series`](crate::run_series)
    pub async fn series<Fut, O, E>(&self, tasks: Vec<Fut>) -> RunResult<Vec<O>, E>
    where
        Fut: Future<Output = Result<O, E>>,
        E: Debug,
    {
        series::drive(self.context(RunKind::Series), tasks)
            .await
            .into_result()
    }

    /// See [`Waterfall::run`]
    pub async fn waterfall<T, E>(&self, waterfall: Waterfall<T, E>) -> RunResult<T, E>
    where
        T: Send + 'static,
        E: Debug + Send + 'static,
    {
        waterfall.drive(self.context(RunKind::Waterfall)).await
    }

    /// See [`run_waterfall`](crate::run_waterfall)
    pub async fn stages<T, E>(&self, initial: T, stages: Vec<Stage<T, E>>) -> RunResult<T, E>
    where
        T: Send + 'static,
        E: Debug + Send + 'static,
    {
        series::drive_stages(self.context(RunKind::Waterfall), initial, stages).await
    }

    /// See [`run_parallel`](crate::run_parallel)
    pub async fn parallel<I, T>(
        &self,
        inputs: Vec<I>,
        task: T,
    ) -> RunResult<Vec<T::Output>, T::Error>
    where
        I: Send + 'static,
        T: Task<I>,
    {
        parallel::drive(self.context(RunKind::Parallel), inputs, task)
            .await
            .into_result()
    }

    /// See [`run_limited`](crate::run_limited)
    pub async fn limited<I, T>(
        &self,
        inputs: Vec<I>,
        task: T,
        limit: NonZeroUsize,
    ) -> RunResult<Vec<T::Output>, T::Error>
    where
        I: Send + 'static,
        T: Task<I>,
    {
        let ctx = self.context(RunKind::Limited { limit: limit.get() });
        limited::drive(ctx, inputs, task, limit, FailurePolicy::FailFast)
            .await
            .into_result()
    }

    /// Run `task` for every input using the configured concurrency.
    ///
    /// An unlimited configuration dispatches everything at once; otherwise at
    /// most that many tasks are in flight. Fails fast.
    pub async fn map<I, T>(&self, inputs: Vec<I>, task: T) -> RunResult<Vec<T::Output>, T::Error>
    where
        I: Send + 'static,
        T: Task<I>,
    {
        match self.config.concurrency.resolve() {
            Some(limit) => self.limited(inputs, task, limit).await,
            None => self.parallel(inputs, task).await,
        }
    }

    /// Like [`Orchestrator::map`], but every input runs regardless of failures
    pub async fn map_settled<I, T>(&self, inputs: Vec<I>, task: T) -> Settled<T::Output, T::Error>
    where
        I: Send + 'static,
        T: Task<I>,
    {
        let (kind, limit) = match self.config.concurrency.resolve() {
            Some(limit) => (RunKind::Limited { limit: limit.get() }, limit),
            None => (
                RunKind::Parallel,
                NonZeroUsize::new(inputs.len()).unwrap_or(NonZeroUsize::MIN),
            ),
        };
        limited::drive(self.context(kind), inputs, task, limit, FailurePolicy::Continue)
            .await
            .into()
    }

    /// See [`partition`](crate::partition())
    pub async fn partition<I, P>(
        &self,
        inputs: Vec<I>,
        predicate: P,
    ) -> RunResult<Partition<I>, P::Error>
    where
        I: Clone + Send + 'static,
        P: Task<I, Output = bool>,
    {
        partition_with(self.context(RunKind::Partition), inputs, predicate).await
    }

    /// See [`filter`](crate::filter)
    pub async fn filter<I, P>(&self, inputs: Vec<I>, predicate: P) -> RunResult<Vec<I>, P::Error>
    where
        I: Clone + Send + 'static,
        P: Task<I, Output = bool>,
    {
        Ok(self.partition(inputs, predicate).await?.kept)
    }

    /// See [`reject`](crate::reject)
    pub async fn reject<I, P>(&self, inputs: Vec<I>, predicate: P) -> RunResult<Vec<I>, P::Error>
    where
        I: Clone + Send + 'static,
        P: Task<I, Output = bool>,
    {
        Ok(self.partition(inputs, predicate).await?.rejected)
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
