//! Worker internals: the minion loop and its thread binding.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::core::error::PoolError;
use crate::core::job::{same_job, JobHandle};
use crate::core::pool::PoolCore;
use crate::util::event::ManualResetEvent;

/// Worker state shared between the worker thread and revokers.
pub(crate) struct MinionState {
    /// Handle currently being dispatched, if any. Guards the completion
    /// handshake below.
    current: Mutex<Option<JobHandle>>,
    /// Broadcast that the current job just finished.
    signal: ManualResetEvent,
    /// Number of revokers waiting on `signal` for the current job.
    interest: AtomicU32,
    runs: AtomicU32,
}

impl MinionState {
    fn new() -> Self {
        Self {
            current: Mutex::new(None),
            signal: ManualResetEvent::new(),
            interest: AtomicU32::new(0),
            runs: AtomicU32::new(0),
        }
    }

    pub(crate) fn runs(&self) -> u32 {
        self.runs.load(Ordering::Relaxed)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Waits until the worker finishes `job`, up to `wait`.
    ///
    /// `Err(UnknownJob)` when the worker is not currently running `job`;
    /// `Err(Timeout)` when it is but did not finish in time.
    pub(crate) fn completed(&self, job: &JobHandle, wait: Duration) -> Result<(), PoolError> {
        let current = self.current.lock();
        match current.as_ref() {
            Some(active) if same_job(active, job) => {
                self.interest.fetch_add(1, Ordering::SeqCst);
                drop(current);
                let signaled = self.signal.wait_for(wait);
                self.interest.fetch_sub(1, Ordering::SeqCst);
                if signaled {
                    Ok(())
                } else {
                    Err(PoolError::Timeout)
                }
            }
            _ => Err(PoolError::UnknownJob),
        }
    }
}

/// The worker body: pulls handles, dispatches them, runs the pool closure,
/// and releases any revokers observing the run.
pub(crate) struct Minion {
    core: Arc<PoolCore>,
    state: Arc<MinionState>,
}

impl Minion {
    fn process(&self) {
        self.core.dispatcher().initialize();

        while let Some(handle) = self.core.queue().extract(Duration::MAX) {
            *self.state.current.lock() = Some(handle.clone());
            self.state.runs.fetch_add(1, Ordering::Relaxed);

            self.core.dispatcher().dispatch(handle.as_ref());

            if let Some(job) = handle.as_reusable() {
                self.core.closure(job);
            }
            drop(handle);

            // Release every revoker that registered interest in this run
            // before the next iteration overwrites `current`.
            let mut current = self.state.current.lock();
            *current = None;
            if self.state.interest.load(Ordering::SeqCst) > 0 {
                self.state.signal.set();
                while self.state.interest.load(Ordering::SeqCst) > 0 {
                    thread::yield_now();
                }
                self.state.signal.reset();
            }
            drop(current);
        }

        self.core.dispatcher().deinitialize();
    }
}

/// Binds a minion to an OS thread.
pub(crate) struct Executor {
    state: Arc<MinionState>,
    handle: Option<JoinHandle<()>>,
}

impl Executor {
    /// Spawns the worker thread. A `stack_size` of zero keeps the platform
    /// default.
    pub(crate) fn start(core: Arc<PoolCore>, index: usize, stack_size: usize) -> Self {
        let state = Arc::new(MinionState::new());
        let minion = Minion { core, state: Arc::clone(&state) };

        let mut builder = thread::Builder::new().name(format!("pool-worker-{index}"));
        if stack_size > 0 {
            builder = builder.stack_size(stack_size);
        }
        let handle = builder
            .spawn(move || {
                debug!("worker thread started");
                minion.process();
                debug!("worker thread exiting");
            })
            .expect("failed to spawn worker thread");

        Self { state, handle: Some(handle) }
    }

    /// Joins the worker thread; callers disable the queue first. Idempotent.
    pub(crate) fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// True until [`stop`](Self::stop) has joined the thread.
    pub(crate) fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn thread_id(&self) -> Option<ThreadId> {
        self.handle.as_ref().map(|handle| handle.thread().id())
    }

    pub(crate) fn minion(&self) -> Arc<MinionState> {
        Arc::clone(&self.state)
    }

    pub(crate) fn runs(&self) -> u32 {
        self.state.runs()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state.is_active()
    }
}
