//! Worker pool configuration.

use serde::{Deserialize, Serialize};

/// Default worker count: one per CPU, capped at the pool maximum.
fn default_worker_count() -> usize {
    num_cpus::get().clamp(1, 255)
}

/// Default stack size: 0, meaning the platform default.
fn default_thread_stack_size() -> usize {
    0
}

/// Default queue capacity.
fn default_queue_capacity() -> usize {
    64
}

/// Construction-time configuration of a [`WorkerPool`].
///
/// # Example
///
/// ```
/// use minion_pool::PoolConfig;
///
/// let config = PoolConfig::new()
///     .with_worker_count(4)
///     .with_queue_capacity(128);
/// assert!(config.validate().is_ok());
/// ```
///
/// [`WorkerPool`]: crate::WorkerPool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads, 1 through 255.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Stack size per worker thread in bytes; 0 keeps the platform default.
    #[serde(default = "default_thread_stack_size")]
    pub thread_stack_size: usize,

    /// Maximum number of handles the dispatch queue holds before
    /// submissions block (and eventually fail with `QueueFull`).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            thread_stack_size: default_thread_stack_size(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl PoolConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Sets the per-worker stack size in bytes (0 for the platform default).
    #[must_use]
    pub fn with_thread_stack_size(mut self, size: usize) -> Self {
        self.thread_stack_size = size;
        self
    }

    /// Sets the dispatch queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 || self.worker_count > 255 {
            return Err("worker_count must be between 1 and 255".into());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".into());
        }
        if self.thread_stack_size != 0 && self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be 0 (platform default) or at least 64KB".into());
        }
        Ok(())
    }

    /// Parses a configuration from a JSON string and validates it.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let config: PoolConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn worker_count_bounds() {
        assert!(PoolConfig::new().with_worker_count(0).validate().is_err());
        assert!(PoolConfig::new().with_worker_count(255).validate().is_ok());
        assert!(PoolConfig::new().with_worker_count(256).validate().is_err());
    }

    #[test]
    fn queue_capacity_must_be_positive() {
        assert!(PoolConfig::new().with_queue_capacity(0).validate().is_err());
        assert!(PoolConfig::new().with_queue_capacity(1).validate().is_ok());
    }

    #[test]
    fn stack_size_zero_means_default() {
        assert!(PoolConfig::new().with_thread_stack_size(0).validate().is_ok());
        assert!(PoolConfig::new().with_thread_stack_size(1024).validate().is_err());
        assert!(PoolConfig::new().with_thread_stack_size(64 * 1024).validate().is_ok());
    }

    #[test]
    fn json_round_trip_applies_defaults() {
        let config = PoolConfig::from_json_str(r#"{"worker_count": 2}"#).unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.queue_capacity, default_queue_capacity());
        assert!(PoolConfig::from_json_str(r#"{"worker_count": 0}"#).is_err());
    }
}
