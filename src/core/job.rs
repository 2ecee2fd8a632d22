//! Reusable jobs and the per-job lifecycle state machine.
//!
//! A [`JobSlot`] is the long-lived control block for one reusable job. User
//! operations (`submit`, `reschedule`, `revoke`) and worker callbacks
//! (dispatch, the post-dispatch closure) all reconcile on a single atomic
//! state word through one-shot compare-and-swap transitions. Losing a CAS is
//! always a legal outcome: it means a racing operation already advanced the
//! lifecycle, so the caller simply yields no handle.
//!
//! The state machine guarantees that at most one [`JobHandle`] per slot is
//! ever queued, in flight with a worker, or parked at the external scheduler.

use std::ops::Deref;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::error;

/// The user-supplied work body of a reusable job.
///
/// The same object may be dispatched many times; interior mutability is the
/// implementor's concern. `dispatch` must not block the pool for extended
/// periods.
pub trait Job: Send + Sync + 'static {
    /// Perform one unit of work.
    fn dispatch(&self);
}

/// A unit of work as seen by the queue and the workers.
pub trait Dispatchable: Send + Sync + 'static {
    /// Execute the unit. For slot-backed handles this performs the
    /// SUBMITTED to EXECUTING transition before running the body; in any
    /// other state the body is skipped (the job was revoked or rescheduled
    /// between enqueue and pickup).
    fn dispatch(&self);

    /// The post-dispatch closure capability, if this unit is reusable.
    fn as_reusable(&self) -> Option<&dyn Reusable> {
        None
    }
}

/// Post-dispatch decision hook of a reusable job.
pub trait Reusable {
    /// Called by the pool right after `dispatch` returns, under the queue
    /// guard. Returns `None` to quiesce, or the handle to run again;
    /// `deadline` is filled in when the next run is deferred. Must be
    /// non-blocking and free of side effects beyond the returned handle.
    fn resubmit(&self, deadline: &mut Option<SystemTime>) -> Option<JobHandle>;
}

/// A counted capability sufficient to dispatch one job.
///
/// Handles do not own the slot; the slot outlives every outstanding handle.
pub type JobHandle = Arc<dyn Dispatchable>;

/// Handle identity: same heap allocation, metadata ignored.
pub(crate) fn same_job(a: &JobHandle, b: &JobHandle) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle = 0,
    Submitted,
    Executing,
    Resubmit,
    Schedule,
    Revoking,
}

/// Shared inner of a [`JobSlot`]; this is the allocation the handles count.
struct Slot<J: Job> {
    implementation: J,
    state: AtomicU8,
    /// Deferred-run deadline. Meaningful only in the Schedule state. The
    /// mutex also serializes every CAS into or out of Schedule against the
    /// closure's read, so a handle never travels with a half-written time.
    deadline: Mutex<Option<SystemTime>>,
    weak: Weak<Slot<J>>,
}

impl<J: Job> Slot<J> {
    fn cas(&self, from: State, to: State) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn is(&self, state: State) -> bool {
        self.state.load(Ordering::Acquire) == state as u8
    }

    fn handle(&self) -> Option<JobHandle> {
        // Callers reach this through a live Arc, so the upgrade holds.
        self.weak.upgrade().map(|slot| slot as JobHandle)
    }

    fn revoke_required(&self) -> bool {
        if self.is(State::Revoking) {
            return true;
        }
        self.cas(State::Submitted, State::Revoking)
            || self.cas(State::Executing, State::Revoking)
            || self.cas(State::Resubmit, State::Revoking)
            || self.cas(State::Schedule, State::Revoking)
    }
}

impl<J: Job> Dispatchable for Slot<J> {
    fn dispatch(&self) {
        if self.cas(State::Submitted, State::Executing) {
            if catch_unwind(AssertUnwindSafe(|| self.implementation.dispatch())).is_err() {
                // The slot stays in Executing; the closure that follows
                // returns it to Idle (or honors a pending resubmit).
                error!("job dispatch panicked");
            }
        }
    }

    fn as_reusable(&self) -> Option<&dyn Reusable> {
        Some(self)
    }
}

impl<J: Job> Reusable for Slot<J> {
    fn resubmit(&self, deadline: &mut Option<SystemTime>) -> Option<JobHandle> {
        if self.cas(State::Executing, State::Idle) {
            return None;
        }
        if self.cas(State::Resubmit, State::Submitted) {
            return self.handle();
        }
        let mut stored = self.deadline.lock();
        if self.cas(State::Schedule, State::Submitted) {
            *deadline = stored.take();
            return self.handle();
        }
        None
    }
}

/// Per-job control block carrying the lifecycle state machine.
///
/// The slot owns the job implementation and is reusable across many dispatch
/// cycles. [`Deref`] exposes the implementation.
///
/// # Example
///
/// ```
/// use minion_pool::JobSlot;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Tick(AtomicUsize);
///
/// impl minion_pool::Job for Tick {
///     fn dispatch(&self) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let slot = JobSlot::new(Tick(AtomicUsize::new(0)));
/// let handle = slot.submit().expect("idle slot yields a handle");
/// assert!(slot.submit().is_none(), "one pending run at a time");
/// handle.dispatch();
/// assert_eq!(slot.0.load(Ordering::Relaxed), 1);
/// # let mut at = None;
/// # assert!(handle.as_reusable().unwrap().resubmit(&mut at).is_none());
/// ```
pub struct JobSlot<J: Job> {
    inner: Arc<Slot<J>>,
}

impl<J: Job> JobSlot<J> {
    /// Creates an idle slot around `implementation`.
    pub fn new(implementation: J) -> Self {
        let inner = Arc::new_cyclic(|weak| Slot {
            implementation,
            state: AtomicU8::new(State::Idle as u8),
            deadline: Mutex::new(None),
            weak: weak.clone(),
        });
        Self { inner }
    }

    /// True when no run is pending, executing, or being revoked.
    pub fn is_idle(&self) -> bool {
        self.inner.is(State::Idle)
    }

    /// Requests one run as soon as possible.
    ///
    /// Returns the handle to enqueue when the slot was idle. While a run is
    /// executing the request is folded into a rerun after the current cycle;
    /// a pending deferred run is upgraded to an immediate one. In every
    /// other state the call is an idempotent no-op.
    pub fn submit(&self) -> Option<JobHandle> {
        let slot = &self.inner;
        if slot.cas(State::Executing, State::Resubmit) {
            return None;
        }
        {
            let mut deadline = slot.deadline.lock();
            if slot.cas(State::Schedule, State::Resubmit) {
                *deadline = None;
                return None;
            }
        }
        if slot.cas(State::Idle, State::Submitted) {
            return Some(self.handle());
        }
        None
    }

    /// Requests one run at `at`.
    ///
    /// When a handle is returned the caller routes it to the external
    /// scheduler (or the pool) itself; with no handle the pool's closure
    /// step performs the handoff once the current run finishes. A slot
    /// already holding a deferred run keeps its original deadline, and a
    /// revocation in progress wins over the request.
    pub fn reschedule(&self, at: SystemTime) -> Option<JobHandle> {
        let slot = &self.inner;
        let mut deadline = slot.deadline.lock();
        if slot.cas(State::Executing, State::Schedule) || slot.cas(State::Resubmit, State::Schedule)
        {
            *deadline = Some(at);
            return None;
        }
        if slot.cas(State::Submitted, State::Schedule) || slot.cas(State::Idle, State::Schedule) {
            *deadline = Some(at);
            return Some(self.handle());
        }
        None
    }

    /// Starts (or re-enters) revocation.
    ///
    /// Returns the handle to pass to [`WorkerPool::revoke`] when there is
    /// anything to cancel or wait for; `None` means the slot is idle.
    /// Complete the protocol with [`revoked`](Self::revoked) once the pool
    /// confirms the job is no longer in flight.
    ///
    /// [`WorkerPool::revoke`]: crate::WorkerPool::revoke
    pub fn revoke(&self) -> Option<JobHandle> {
        if self.inner.revoke_required() {
            Some(self.handle())
        } else {
            None
        }
    }

    /// Finishes revocation, returning the slot to idle.
    ///
    /// Calling this outside an active revocation is a programmer error.
    pub fn revoked(&self) {
        let reverted = self.inner.cas(State::Revoking, State::Idle);
        debug_assert!(reverted, "revoked() called on a slot that is not revoking");
    }

    fn handle(&self) -> JobHandle {
        Arc::clone(&self.inner) as JobHandle
    }
}

impl<J: Job> Deref for JobSlot<J> {
    type Target = J;

    fn deref(&self) -> &J {
        &self.inner.implementation
    }
}

impl<J: Job> Drop for JobSlot<J> {
    fn drop(&mut self) {
        debug_assert!(
            self.is_idle(),
            "job slot dropped while a run is pending, executing, or revoking"
        );
    }
}
