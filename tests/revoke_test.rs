//! Integration tests for the revocation protocol.
//!
//! - Removing a queued job
//! - Waiting for an in-flight job, with and without a timeout budget
//! - Self-revocation from inside the running job
//! - Revoking a job the pool has never seen

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use minion_pool::{Job, JobHandle, JobSlot, PoolBuilder, PoolConfig, PoolError, WorkerPool};

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// HELPERS
// ============================================================================

fn quick_pool(workers: usize, capacity: usize) -> WorkerPool {
    PoolBuilder::new(
        PoolConfig::new().with_worker_count(workers).with_queue_capacity(capacity),
    )
    .build()
    .unwrap()
}

fn wait_idle<J: Job>(slot: &JobSlot<J>) {
    let deadline = Instant::now() + WAIT;
    while !slot.is_idle() {
        assert!(Instant::now() < deadline, "slot did not quiesce in time");
        thread::yield_now();
    }
}

struct Notifying {
    tag: usize,
    tx: Sender<usize>,
}

impl Job for Notifying {
    fn dispatch(&self) {
        self.tx.send(self.tag).unwrap();
    }
}

struct Gated {
    runs: AtomicUsize,
    started: Sender<()>,
    release: Receiver<()>,
}

impl Job for Gated {
    fn dispatch(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.started.send(()).unwrap();
        self.release.recv().unwrap();
    }
}

fn gated() -> (JobSlot<Gated>, Receiver<()>, Sender<()>) {
    let (started_tx, started_rx) = unbounded();
    let (release_tx, release_rx) = unbounded();
    let slot = JobSlot::new(Gated {
        runs: AtomicUsize::new(0),
        started: started_tx,
        release: release_rx,
    });
    (slot, started_rx, release_tx)
}

// ============================================================================
// QUEUED AND IN-FLIGHT REVOCATION
// ============================================================================

#[test]
fn revoking_a_queued_job_removes_it() {
    let pool = quick_pool(1, 8);
    pool.run();

    let (busy, started, release) = gated();
    pool.submit(busy.submit().unwrap(), WAIT).unwrap();
    started.recv_timeout(WAIT).unwrap();

    let (tx, rx) = unbounded();
    let victim = JobSlot::new(Notifying { tag: 1, tx });
    pool.submit(victim.submit().unwrap(), WAIT).unwrap();
    assert_eq!(pool.pending(), 1);

    let revocation = victim.revoke().expect("pending run yields a handle");
    assert_eq!(pool.revoke(&revocation, Duration::ZERO), Ok(()));
    victim.revoked();
    assert!(victim.is_idle());
    assert_eq!(pool.pending(), 0);

    release.send(()).unwrap();
    wait_idle(&busy);
    thread::sleep(Duration::from_millis(50));
    assert!(rx.try_recv().is_err(), "a revoked job must not dispatch");
    pool.stop();
}

#[test]
fn revoke_waits_for_the_running_job() {
    let pool = quick_pool(1, 8);
    pool.run();

    let (slot, started, release) = gated();
    pool.submit(slot.submit().unwrap(), WAIT).unwrap();
    started.recv_timeout(WAIT).unwrap();

    let revocation = slot.revoke().expect("executing run yields a handle");

    // A zero wait is a poll: the job is still running.
    assert_eq!(pool.revoke(&revocation, Duration::ZERO), Err(PoolError::Timeout));

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(80));
        release.send(()).unwrap();
    });

    let begun = Instant::now();
    assert_eq!(pool.revoke(&revocation, WAIT), Ok(()));
    assert!(begun.elapsed() >= Duration::from_millis(40), "revoke waited for completion");

    slot.revoked();
    assert!(slot.is_idle());
    assert_eq!(slot.runs.load(Ordering::SeqCst), 1);

    releaser.join().unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(slot.runs.load(Ordering::SeqCst), 1, "no dispatch after revocation");
    pool.stop();
}

#[test]
fn revoked_slot_accepts_new_work_afterwards() {
    let pool = quick_pool(1, 8);
    pool.run();

    let (slot, started, release) = gated();
    pool.submit(slot.submit().unwrap(), WAIT).unwrap();
    started.recv_timeout(WAIT).unwrap();

    let revocation = slot.revoke().unwrap();
    let release_for_thread = release.clone();
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        release_for_thread.send(()).unwrap();
    });
    assert_eq!(pool.revoke(&revocation, WAIT), Ok(()));
    slot.revoked();
    releaser.join().unwrap();

    // The slot is reusable after revocation.
    pool.submit(slot.submit().expect("idle again"), WAIT).unwrap();
    started.recv_timeout(WAIT).unwrap();
    release.send(()).unwrap();
    wait_idle(&slot);
    assert_eq!(slot.runs.load(Ordering::SeqCst), 2);
    pool.stop();
}

// ============================================================================
// SELF-REVOCATION AND UNKNOWN JOBS
// ============================================================================

/// Revokes itself from inside its own dispatch.
struct SelfRevoking {
    pool: Mutex<Option<Arc<WorkerPool>>>,
    me: Mutex<Option<JobHandle>>,
    outcome: Mutex<Option<Result<(), PoolError>>>,
    done: Sender<()>,
}

impl Job for SelfRevoking {
    fn dispatch(&self) {
        let pool = self.pool.lock().clone().unwrap();
        let me = self.me.lock().clone().unwrap();
        *self.outcome.lock() = Some(pool.revoke(&me, WAIT));
        self.done.send(()).unwrap();
    }
}

#[test]
fn self_revocation_returns_ok_without_waiting() {
    let pool = Arc::new(quick_pool(1, 8));
    pool.run();

    let (done_tx, done_rx) = unbounded();
    let slot = JobSlot::new(SelfRevoking {
        pool: Mutex::new(None),
        me: Mutex::new(None),
        outcome: Mutex::new(None),
        done: done_tx,
    });

    let handle = slot.submit().unwrap();
    *slot.pool.lock() = Some(Arc::clone(&pool));
    *slot.me.lock() = Some(handle.clone());

    let begun = Instant::now();
    pool.submit(handle, WAIT).unwrap();
    done_rx.recv_timeout(WAIT).unwrap();
    assert!(begun.elapsed() < Duration::from_secs(4), "no self-deadlock wait");
    assert_eq!(*slot.outcome.lock(), Some(Ok(())));

    wait_idle(&slot);
    // Drop the pool reference the job captured before the pool itself.
    *slot.pool.lock() = None;
    *slot.me.lock() = None;
    pool.stop();
}

#[test]
fn revoking_an_unseen_job_reports_unknown() {
    let pool = quick_pool(1, 8);
    pool.run();

    let (tx, _rx) = unbounded();
    let slot = JobSlot::new(Notifying { tag: 1, tx });
    assert!(slot.revoke().is_none(), "an idle slot has nothing to revoke");

    let handle = slot.submit().unwrap();
    // Never submitted to the pool: not queued, not running anywhere.
    assert_eq!(pool.revoke(&handle, Duration::ZERO), Err(PoolError::UnknownJob));

    let revocation = slot.revoke().unwrap();
    assert_eq!(pool.revoke(&revocation, Duration::ZERO), Err(PoolError::UnknownJob));
    slot.revoked();
    pool.stop();
}
