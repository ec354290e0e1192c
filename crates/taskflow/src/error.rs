//! Error types for taskflow runs

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

/// The single failure category a run reports.
///
/// The cause is whatever the task produced; the orchestrator never inspects
/// it. `index` is the position of the failing task in the input sequence (or
/// the stage number for waterfalls).
#[derive(Error, Debug)]
pub enum RunError<E> {
    #[error("task #{index} failed: {cause}")]
    Failed { index: usize, cause: E },

    #[error("task #{index} panicked: {message}")]
    Panicked { index: usize, message: String },

    #[error("run interrupted with {outstanding} task(s) still outstanding")]
    Interrupted { outstanding: usize },
}

/// Errors related to configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid concurrency limit: {value} (must be > 0)")]
    InvalidConcurrencyLimit { value: usize },

    #[error("Invalid retry configuration: max_retries={max_retries}, delay={delay:?}")]
    InvalidRetryConfig { max_retries: u32, delay: Duration },
}

/// Result type alias for runs
pub type RunResult<T, E> = Result<T, RunError<E>>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl<E> RunError<E> {
    /// Create a failure for the task at `index`
    pub fn failed(index: usize, cause: E) -> Self {
        RunError::Failed { index, cause }
    }

    /// Create a panic failure from a `catch_unwind` payload
    pub fn panicked(index: usize, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        RunError::Panicked { index, message }
    }

    /// Position of the task that caused this failure, if there is one
    pub fn index(&self) -> Option<usize> {
        match self {
            RunError::Failed { index, .. } | RunError::Panicked { index, .. } => Some(*index),
            RunError::Interrupted { .. } => None,
        }
    }

    /// Check if this error is a caught panic
    pub fn is_panic(&self) -> bool {
        matches!(self, RunError::Panicked { .. })
    }

    /// Borrow the task's own failure, if the task reported one
    pub fn cause(&self) -> Option<&E> {
        match self {
            RunError::Failed { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Take the task's own failure, if the task reported one
    pub fn into_cause(self) -> Option<E> {
        match self {
            RunError::Failed { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Transform the cause, keeping the index
    pub fn map_cause<F, U>(self, f: F) -> RunError<U>
    where
        F: FnOnce(E) -> U,
    {
        match self {
            RunError::Failed { index, cause } => RunError::Failed {
                index,
                cause: f(cause),
            },
            RunError::Panicked { index, message } => RunError::Panicked { index, message },
            RunError::Interrupted { outstanding } => RunError::Interrupted { outstanding },
        }
    }
}

impl ConfigError {
    /// Create an invalid concurrency limit error
    pub fn invalid_concurrency_limit(value: usize) -> Self {
        ConfigError::InvalidConcurrencyLimit { value }
    }

    /// Create an invalid retry config error
    pub fn invalid_retry_config(max_retries: u32, delay: Duration) -> Self {
        ConfigError::InvalidRetryConfig { max_retries, delay }
    }
}
