//! The worker pool: lifecycle, submission, revocation, and the
//! post-dispatch closure.

use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::core::dispatch::{Dispatcher, PrivilegedProducer, Scheduler};
use crate::core::error::PoolError;
use crate::core::job::{JobHandle, Reusable};
use crate::core::queue::DispatchQueue;
use crate::core::worker::{Executor, MinionState};

/// Everything the worker threads need; shared behind an `Arc` so the pool
/// facade and its minions do not own each other.
pub(crate) struct PoolCore {
    queue: DispatchQueue,
    dispatcher: Arc<dyn Dispatcher>,
    scheduler: Option<Weak<dyn Scheduler>>,
    privileged: Option<Arc<dyn PrivilegedProducer>>,
}

impl PoolCore {
    pub(crate) fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    fn privileged_thread(&self) -> Option<ThreadId> {
        self.privileged.as_ref().map(|producer| producer.thread_id())
    }

    pub(crate) fn dispatcher(&self) -> &dyn Dispatcher {
        self.dispatcher.as_ref()
    }

    /// Post-dispatch closure: decide between re-enqueue, scheduler handoff,
    /// and quiescence.
    ///
    /// The resubmit decision runs under the queue guard so no competing
    /// submit or reschedule can slip a second handle in; the scheduler
    /// itself is only called after the guard drops (user code never runs
    /// under the queue lock, `resubmit` excepted).
    pub(crate) fn closure(&self, job: &dyn Reusable) {
        let scheduler = self.scheduler.as_ref().and_then(Weak::upgrade);
        let deferred = {
            let mut queue = self.queue.lock();
            let mut deadline = None;
            match job.resubmit(&mut deadline) {
                None => None,
                Some(handle) => match deadline {
                    Some(at) if scheduler.is_some() && at > SystemTime::now() => {
                        Some((at, handle))
                    }
                    _ => {
                        queue.post(handle);
                        None
                    }
                },
            }
        };
        if let Some((at, handle)) = deferred {
            if let Some(scheduler) = scheduler {
                debug!("deferring job to the external scheduler");
                scheduler.schedule(at, handle);
            }
        }
    }
}

/// A fixed set of worker threads fed from a bounded FIFO queue.
///
/// The pool is constructed stopped: [`run`](Self::run) enables the queue and
/// starts the workers, [`stop`](Self::stop) disables it and joins them.
/// Handles come from [`JobSlot`](crate::JobSlot) operations; the slot state
/// machine guarantees at most one handle per job is ever in the queue or in
/// flight.
pub struct WorkerPool {
    core: Arc<PoolCore>,
    units: Mutex<Vec<Executor>>,
    config: PoolConfig,
}

impl WorkerPool {
    /// Builds a stopped pool.
    ///
    /// `scheduler` receives handles whose next run lies in the future; with
    /// `None` (or once the scheduler is dropped) such handles are re-queued
    /// immediately. `privileged` identifies the producer thread whose
    /// submissions bypass the capacity wait.
    pub fn new(
        config: PoolConfig,
        dispatcher: Arc<dyn Dispatcher>,
        scheduler: Option<Weak<dyn Scheduler>>,
        privileged: Option<Arc<dyn PrivilegedProducer>>,
    ) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;
        let core = Arc::new(PoolCore {
            queue: DispatchQueue::new(config.queue_capacity),
            dispatcher,
            scheduler,
            privileged,
        });
        Ok(Self { core, units: Mutex::new(Vec::new()), config })
    }

    /// Enables the queue and starts the workers. No-op while running.
    pub fn run(&self) {
        let mut units = self.units.lock();
        if units.iter().any(Executor::is_running) {
            return;
        }
        units.clear();
        self.core.queue.enable();
        for index in 0..self.config.worker_count {
            units.push(Executor::start(
                Arc::clone(&self.core),
                index,
                self.config.thread_stack_size,
            ));
        }
        info!(
            worker_count = self.config.worker_count,
            queue_capacity = self.config.queue_capacity,
            "worker pool running"
        );
    }

    /// Disables the queue and joins the workers.
    ///
    /// Workers drain the backlog before exiting; blocked producers fail with
    /// [`PoolError::Shutdown`]. The per-worker run counters stay readable
    /// until the next [`run`](Self::run). Idempotent.
    pub fn stop(&self) {
        self.core.queue.disable();

        // Join outside the units lock: a draining job may still call
        // `revoke`, which needs a snapshot of the same lock.
        let mut taken = {
            let mut units = self.units.lock();
            if !units.iter().any(Executor::is_running) {
                return;
            }
            std::mem::take(&mut *units)
        };
        for unit in &mut taken {
            unit.stop();
        }
        let mut units = self.units.lock();
        if units.is_empty() {
            // Keep the joined executors so their run counters stay readable.
            *units = taken;
        }
        info!("worker pool stopped");
    }

    /// Enqueues `job`, blocking up to `wait` while the queue is full.
    ///
    /// A submission from the privileged producer thread takes the
    /// head-of-line post path and never blocks. Submitting a handle that is
    /// already queued is a programmer error.
    pub fn submit(&self, job: JobHandle, wait: Duration) -> Result<(), PoolError> {
        debug_assert!(!self.core.queue.has_entry(&job), "job is already enqueued");

        if self.caller_is_privileged() {
            self.core.queue.post(job);
            Ok(())
        } else {
            self.core.queue.insert(job, wait)
        }
    }

    /// Cancels a pending run of `job`, or waits up to `wait` for an
    /// in-flight one to finish.
    ///
    /// Removal from the queue succeeds immediately. A revocation issued
    /// from inside the running job itself returns `Ok` without waiting (the
    /// alternative is a deadlock). `Err(Timeout)` means the job was still
    /// running when the wait expired; `Err(UnknownJob)` means no worker was
    /// running it. A `wait` of zero is a non-blocking poll.
    pub fn revoke(&self, job: &JobHandle, wait: Duration) -> Result<(), PoolError> {
        if self.core.queue.remove(job) {
            return Ok(());
        }

        let caller = thread::current().id();
        let units: Vec<(Option<ThreadId>, Arc<MinionState>)> = self
            .units
            .lock()
            .iter()
            .map(|unit| (unit.thread_id(), unit.minion()))
            .collect();

        for (thread_id, minion) in units {
            if thread_id == Some(caller) {
                // The caller is a worker: it cannot wait for itself.
                return Ok(());
            }
            match minion.completed(job, wait) {
                Ok(()) => return Ok(()),
                Err(PoolError::Timeout) => return Err(PoolError::Timeout),
                Err(_) => {}
            }
        }

        Err(PoolError::UnknownJob)
    }

    /// Configured number of workers.
    pub fn count(&self) -> usize {
        self.config.worker_count
    }

    /// Number of handles waiting in the queue.
    pub fn pending(&self) -> usize {
        self.core.queue.len()
    }

    /// Number of workers currently dispatching a job.
    pub fn active(&self) -> usize {
        self.units.lock().iter().filter(|unit| unit.is_active()).count()
    }

    /// Per-worker dispatch counters, in worker order.
    pub fn runs(&self) -> Vec<u32> {
        self.units.lock().iter().map(Executor::runs).collect()
    }

    /// OS thread id of worker `index`, while running.
    pub fn thread_id(&self, index: usize) -> Option<ThreadId> {
        self.units.lock().get(index).and_then(Executor::thread_id)
    }

    fn caller_is_privileged(&self) -> bool {
        self.core.privileged_thread() == Some(thread::current().id())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.config.worker_count)
            .field("pending", &self.pending())
            .finish()
    }
}

