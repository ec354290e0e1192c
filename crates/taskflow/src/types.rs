//! Common types and configuration for taskflow runs

use std::fmt::Display;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::limits::Limit;

/// Configuration for an [`Orchestrator`](crate::Orchestrator)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Concurrency used by `map` and `map_settled`
    pub concurrency: Limit,

    /// Forward run events to the configured reporter
    pub report_progress: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency: Limit::Default,
            report_progress: true,
        }
    }
}

impl OrchestratorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of tasks `map` keeps in flight
    pub fn with_concurrency_limit(mut self, limit: usize) -> ConfigResult<Self> {
        let limit = NonZeroUsize::new(limit)
            .ok_or_else(|| ConfigError::invalid_concurrency_limit(limit))?;
        self.concurrency = Limit::Max(limit);
        Ok(self)
    }

    /// Let `map` dispatch every input at once
    pub fn unbounded(mut self) -> Self {
        self.concurrency = Limit::None;
        self
    }

    /// Enable or disable progress reporting
    pub fn with_progress_reporting(mut self, enabled: bool) -> Self {
        self.report_progress = enabled;
        self
    }

    /// Create a configuration for tests: one task at a time, no reporting
    pub fn for_testing() -> Self {
        Self {
            concurrency: Limit::Max(NonZeroUsize::MIN),
            report_progress: false,
        }
    }

    /// Create a configuration that runs `map` inputs strictly one after another
    pub fn sequential() -> Self {
        Self {
            concurrency: Limit::Max(NonZeroUsize::MIN),
            report_progress: true,
        }
    }
}

/// Re-run configuration for [`Retrying`](crate::Retrying)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub max_retries: u32,

    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> ConfigResult<Self> {
        if max_retries > 0 && delay.is_zero() {
            return Err(ConfigError::invalid_retry_config(max_retries, delay));
        }
        Ok(Self { max_retries, delay })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(100),
        }
    }
}

/// What a bounded run does after its first failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop dispatching, let in-flight tasks drain, report the failure
    #[default]
    FailFast,
    /// Dispatch every input, report the first failure with partial results
    Continue,
}

/// The combinator a run was started with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunKind {
    Series,
    Waterfall,
    Parallel,
    Limited { limit: usize },
    Partition,
}

impl Display for RunKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunKind::Series => write!(f, "series"),
            RunKind::Waterfall => write!(f, "waterfall"),
            RunKind::Parallel => write!(f, "parallel"),
            RunKind::Limited { limit } => write!(f, "limited({limit})"),
            RunKind::Partition => write!(f, "partition"),
        }
    }
}

/// Statistics of one finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of inputs (or stages) the run was given
    pub total_tasks: usize,

    /// Number of tasks that were started
    pub dispatched_tasks: usize,

    /// Number of tasks that succeeded
    pub successful_tasks: usize,

    /// Number of tasks that failed or panicked
    pub failed_tasks: usize,

    /// Highest number of tasks in flight at the same time
    pub peak_in_flight: usize,

    /// Time from the first dispatch to the terminal outcome, zero when
    /// nothing was dispatched. Follows tokio's clock, so paused tests see
    /// the virtual time.
    pub total_duration: Duration,
}

impl RunStats {
    pub fn new(total_tasks: usize) -> Self {
        Self {
            total_tasks,
            dispatched_tasks: 0,
            successful_tasks: 0,
            failed_tasks: 0,
            peak_in_flight: 0,
            total_duration: Duration::ZERO,
        }
    }

    /// Check if every task ran and succeeded
    pub fn is_successful(&self) -> bool {
        self.failed_tasks == 0 && self.successful_tasks == self.total_tasks
    }
}
