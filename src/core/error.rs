//! Error types for pool operations.

use thiserror::Error;

/// Errors produced by the worker pool and its dispatch queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The dispatch queue stayed full for the whole wait.
    #[error("dispatch queue is full")]
    QueueFull,
    /// The wait expired before the job completed.
    #[error("wait timed out")]
    Timeout,
    /// The job is neither queued nor running on any worker.
    #[error("unknown job")]
    UnknownJob,
    /// The queue has been disabled; the pool is stopped or stopping.
    #[error("pool has been shut down")]
    Shutdown,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
