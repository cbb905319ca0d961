use std::collections::TryReserveError;

/// Errors that abort a print-shop run.
///
/// None of them is retried: a job is produced and consumed at most once.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The run configuration was rejected before any worker started.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A worker context was not fully set up before launch.
    #[error("invalid context: {0}")]
    InvalidContext(String),

    /// A worker thread couldn't be spawned.
    #[error(transparent)]
    ThreadStart(#[from] std::io::Error),

    /// A results buffer couldn't grow.
    #[error("out of memory while buffering results")]
    ResourceExhausted(#[from] TryReserveError),

    /// A worker observed a job or a state that breaks the queue protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A worker stopped on a fatal error, which aborted the run.
    #[error("{worker} failed: {reason}")]
    WorkerFailed {
        /// The failed worker, e.g. `consumer 2`.
        worker: String,
        /// The error it failed with.
        reason: String,
    },

    /// Some worker threads panicked.
    #[error("{0} worker thread(s) panicked")]
    Panicked(usize),

    /// The run was asked to stop while the caller was blocked or about to block.
    #[error("run cancelled")]
    Cancelled,
}

impl Error {
    #[inline]
    pub(crate) fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    #[inline]
    pub(crate) fn context<T: ToString>(msg: T) -> Self {
        Self::InvalidContext(msg.to_string())
    }

    #[inline]
    pub(crate) fn protocol<T: ToString>(msg: T) -> Self {
        Self::Protocol(msg.to_string())
    }

    /// Returns whether this error only reports a cooperative cancellation.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
