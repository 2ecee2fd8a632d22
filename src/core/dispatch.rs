//! Injected collaborator interfaces: dispatcher, scheduler, and the
//! privileged producer identity.

use std::thread::ThreadId;
use std::time::{Duration, Instant, SystemTime};

use tracing::warn;

use crate::core::job::{Dispatchable, JobHandle};

/// Execution indirection shared by all workers of a pool.
///
/// `initialize` and `deinitialize` run exactly once on every worker thread,
/// at startup and teardown. `dispatch` is the hook through which every job
/// runs; it must be re-entrant across workers, each call receiving a
/// distinct job. Implementations normally delegate to
/// [`Dispatchable::dispatch`] and may wrap it with instrumentation.
pub trait Dispatcher: Send + Sync + 'static {
    /// Per-worker-thread startup.
    fn initialize(&self) {}

    /// Per-worker-thread teardown.
    fn deinitialize(&self) {}

    /// Run one job.
    fn dispatch(&self, job: &dyn Dispatchable);
}

/// The plain pass-through dispatcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDispatcher;

impl Dispatcher for DirectDispatcher {
    fn dispatch(&self, job: &dyn Dispatchable) {
        job.dispatch();
    }
}

/// A dispatcher that warns when a job body overstays its welcome.
///
/// Long-running bodies starve the queue; this variant makes them visible
/// without changing behavior.
#[derive(Debug, Clone, Copy)]
pub struct TimedDispatcher {
    threshold: Duration,
}

impl TimedDispatcher {
    /// Warn for dispatches running longer than `threshold`.
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }
}

impl Dispatcher for TimedDispatcher {
    fn dispatch(&self, job: &dyn Dispatchable) {
        let started = Instant::now();
        job.dispatch();
        let elapsed = started.elapsed();
        if elapsed > self.threshold {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = self.threshold.as_millis() as u64,
                "job dispatch exceeded its duration budget"
            );
        }
    }
}

/// External delayed-delivery collaborator.
///
/// The pool hands over a handle whose next run lies in the future; the
/// scheduler is expected to [`submit`](crate::WorkerPool::submit) it back at
/// or after `deadline`. The pool holds the scheduler weakly and falls back
/// to immediate re-enqueue once it is gone.
pub trait Scheduler: Send + Sync + 'static {
    /// Accept `job` for delivery at `deadline`.
    fn schedule(&self, deadline: SystemTime, job: JobHandle);
}

/// Identifies the one producer thread whose submissions take the
/// head-of-line post path instead of the bounded insert.
pub trait PrivilegedProducer: Send + Sync + 'static {
    /// Thread id of the privileged producer.
    fn thread_id(&self) -> ThreadId;
}
