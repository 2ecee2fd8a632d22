//! Core pool machinery: jobs, the dispatch queue, workers, and the pool.

pub mod dispatch;
pub mod error;
pub mod job;
pub mod pool;
pub mod queue;
pub(crate) mod worker;

pub use dispatch::{DirectDispatcher, Dispatcher, PrivilegedProducer, Scheduler, TimedDispatcher};
pub use error::PoolError;
pub use job::{Dispatchable, Job, JobHandle, JobSlot, Reusable};
pub use pool::WorkerPool;
pub use queue::{DispatchQueue, QueueGuard};
