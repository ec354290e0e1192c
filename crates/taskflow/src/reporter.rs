//! Progress reporting for taskflow runs
//!
//! Runners describe what they do as a stream of [`RunEvent`]s. A
//! [`RunReporter`] receives them synchronously from the run's driver, in the
//! order the driver processed them, which makes the stream a faithful record
//! of dispatch and completion order.

use std::time::Duration;

use crate::task::RunId;
use crate::types::{RunKind, RunStats};

/// Event types that can be reported during a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// A run started
    RunStarted {
        run_id: RunId,
        kind: RunKind,
        total_tasks: usize,
    },
    /// A task was handed its input
    TaskDispatched { run_id: RunId, index: usize },
    /// A task reported success
    TaskSucceeded {
        run_id: RunId,
        index: usize,
        duration: Duration,
    },
    /// A task reported failure or panicked
    TaskFailed {
        run_id: RunId,
        index: usize,
        error: String,
        duration: Duration,
    },
    /// A run produced its terminal outcome
    RunFinished {
        run_id: RunId,
        kind: RunKind,
        successful: bool,
        stats: RunStats,
    },
}

impl RunEvent {
    /// The run this event belongs to
    pub fn run_id(&self) -> RunId {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::TaskDispatched { run_id, .. }
            | RunEvent::TaskSucceeded { run_id, .. }
            | RunEvent::TaskFailed { run_id, .. }
            | RunEvent::RunFinished { run_id, .. } => *run_id,
        }
    }
}

/// Trait for receiving run events
///
/// Reporters are shared between concurrent runs of one orchestrator, so they
/// take `&self` and use interior mutability if they keep state.
pub trait RunReporter: Send + Sync {
    /// Report a run event
    fn report_event(&self, event: RunEvent);
}

/// A no-op reporter that discards all events
#[derive(Debug, Default)]
pub struct NoOpReporter;

impl RunReporter for NoOpReporter {
    fn report_event(&self, _event: RunEvent) {}
}

/// A simple console reporter for demos and debugging
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    context: Option<String>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self { context: None }
    }

    /// Prefix every line with `context`
    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
        }
    }

    fn format_duration(duration: Duration) -> String {
        if duration.as_secs() > 0 {
            format!("{:.1}s", duration.as_secs_f32())
        } else {
            format!("{}ms", duration.as_millis())
        }
    }
}

impl RunReporter for ConsoleReporter {
    fn report_event(&self, event: RunEvent) {
        let prefix = self
            .context
            .as_ref()
            .map(|c| format!("[{}] ", c))
            .unwrap_or_default();

        match event {
            RunEvent::RunStarted {
                kind, total_tasks, ..
            } => {
                println!("🎯 {}Starting {} run of {} tasks", prefix, kind, total_tasks);
            }
            RunEvent::TaskDispatched { index, .. } => {
                println!("🚀 {}Dispatched task #{}", prefix, index);
            }
            RunEvent::TaskSucceeded {
                index, duration, ..
            } => {
                println!(
                    "✅ {}Task #{} succeeded in {}",
                    prefix,
                    index,
                    Self::format_duration(duration)
                );
            }
            RunEvent::TaskFailed {
                index,
                error,
                duration,
                ..
            } => {
                println!(
                    "❌ {}Task #{} failed after {} - {}",
                    prefix,
                    index,
                    Self::format_duration(duration),
                    error
                );
            }
            RunEvent::RunFinished {
                kind,
                successful,
                stats,
                ..
            } => {
                let mark = if successful { "🏁" } else { "💥" };
                println!(
                    "{} {}{} run finished: {}/{} successful, {} failed, peak {} in flight, {}",
                    mark,
                    prefix,
                    kind,
                    stats.successful_tasks,
                    stats.total_tasks,
                    stats.failed_tasks,
                    stats.peak_in_flight,
                    Self::format_duration(stats.total_duration)
                );
            }
        }
    }
}

/// A multi-reporter that broadcasts events to multiple reporters
#[derive(Default)]
pub struct MultiReporter {
    reporters: Vec<Box<dyn RunReporter>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn add_reporter<R: RunReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl RunReporter for MultiReporter {
    fn report_event(&self, event: RunEvent) {
        for reporter in &self.reporters {
            reporter.report_event(event.clone());
        }
    }
}
