//! # minion-pool
//!
//! A worker-thread pool for reusable, self-rescheduling jobs.
//!
//! Work is modeled as long-lived [`JobSlot`]s rather than one-shot closures:
//! the same job object is dispatched many times, and concurrent submit,
//! reschedule, and revoke requests on it are reconciled by a lock-free
//! lifecycle state machine. The slot yields at most one [`JobHandle`] at a
//! time, so a job can never be queued twice, and revocation
//! (cancel-and-wait) is safe while the job may be running.
//!
//! ## Modules
//!
//! - [`core`] - the job state machine, dispatch queue, workers, and pool
//! - [`config`] - construction-time pool configuration
//! - [`builders`] - builder assembling pools from configuration
//! - [`util`] - completion event and telemetry bootstrap
//!
//! ## Example
//!
//! ```
//! use minion_pool::{Job, JobSlot, PoolBuilder, PoolConfig};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! struct Ping(AtomicUsize);
//!
//! impl Job for Ping {
//!     fn dispatch(&self) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//!
//! let pool = PoolBuilder::new(PoolConfig::new().with_worker_count(2))
//!     .build()
//!     .unwrap();
//! pool.run();
//!
//! let slot = JobSlot::new(Ping(AtomicUsize::new(0)));
//! let handle = slot.submit().expect("idle slot yields a handle");
//! pool.submit(handle, Duration::from_secs(1)).unwrap();
//!
//! while !slot.is_idle() {
//!     std::thread::yield_now();
//! }
//! assert_eq!(slot.0.load(Ordering::Relaxed), 1);
//! pool.stop();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builders;
pub mod config;
pub mod core;
pub mod util;

pub use crate::builders::PoolBuilder;
pub use crate::config::PoolConfig;
pub use crate::core::{
    DirectDispatcher, Dispatchable, DispatchQueue, Dispatcher, Job, JobHandle, JobSlot,
    PoolError, PrivilegedProducer, Reusable, Scheduler, TimedDispatcher, WorkerPool,
};
pub use crate::util::init_tracing;
